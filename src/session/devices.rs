use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::media::{CameraBackend, MediaDeviceInfo, MediaDeviceKind};

/// A video input the user can pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    /// Empty when the environment withholds labels
    pub label: String,
}

/// A device as presented in a picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOption {
    pub id: String,
    pub label: String,
}

/// Tracks available video inputs and the user's selection
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    selected: Option<String>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listed devices with a fresh enumeration result
    pub fn update(&mut self, devices: Vec<Device>) {
        if let Some(id) = &self.selected {
            if !devices.iter().any(|d| &d.id == id) {
                warn!("Selected device {} is no longer listed", id);
            }
        }

        self.devices = devices;
    }

    /// Store the selected device id. Unknown ids are accepted.
    pub fn select_device(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.contains(&id) {
            debug!("Selecting unlisted device {}", id);
        }
        self.selected = Some(id);
    }

    /// Go back to resolving the camera by facing mode
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selection, only if it is currently listed
    pub fn resolved_selection(&self) -> Option<&str> {
        self.selected.as_deref().filter(|id| self.contains(id))
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.id == id)
    }

    /// Picker entries, falling back to `Camera N` for unlabeled devices
    pub fn options(&self) -> Vec<DeviceOption> {
        self.devices
            .iter()
            .enumerate()
            .map(|(index, device)| DeviceOption {
                id: device.id.clone(),
                label: display_label(device, index),
            })
            .collect()
    }
}

/// Query the backend for video inputs, in enumeration order.
///
/// Enumeration failures yield an empty list; capture by facing mode still works.
pub async fn list_devices(backend: &dyn CameraBackend) -> Vec<Device> {
    let devices = match backend.enumerate_devices().await {
        Ok(inventory) => video_inputs(inventory),
        Err(e) => {
            let e = CaptureError::DeviceEnumeration(e.to_string());
            warn!("{} on {}", e, backend.name());
            Vec::new()
        }
    };

    info!("Found {} video input(s)", devices.len());
    devices
}

/// Label shown for the device at `index` (0-based) in the list
pub fn display_label(device: &Device, index: usize) -> String {
    if device.label.is_empty() {
        format!("Camera {}", index + 1)
    } else {
        device.label.clone()
    }
}

fn video_inputs(inventory: Vec<MediaDeviceInfo>) -> Vec<Device> {
    inventory
        .into_iter()
        .filter(|d| d.kind == MediaDeviceKind::VideoInput)
        .map(|d| Device {
            id: d.device_id,
            label: d.label,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, label: &str) -> Device {
        Device {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn unlabeled_devices_get_ordinal_names() {
        let registry = DeviceRegistry {
            devices: vec![device("a", "Front"), device("b", "")],
            selected: None,
        };

        let labels: Vec<String> = registry.options().into_iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["Front", "Camera 2"]);
    }

    #[test]
    fn unknown_selection_is_accepted_but_not_resolved() {
        let mut registry = DeviceRegistry {
            devices: vec![device("a", "Front")],
            selected: None,
        };

        registry.select_device("missing");
        assert_eq!(registry.selected(), Some("missing"));
        assert_eq!(registry.resolved_selection(), None);

        registry.select_device("a");
        assert_eq!(registry.resolved_selection(), Some("a"));
    }

    #[test]
    fn update_keeps_stale_selection() {
        let mut registry = DeviceRegistry::new();
        registry.update(vec![device("a", "Front"), device("b", "Back")]);
        registry.select_device("b");

        registry.update(vec![device("a", "Front")]);
        assert_eq!(registry.selected(), Some("b"));
        assert_eq!(registry.resolved_selection(), None);
        assert_eq!(registry.devices().len(), 1);
    }

    #[test]
    fn only_video_inputs_are_kept() {
        let inventory = vec![
            MediaDeviceInfo {
                device_id: "mic".to_string(),
                label: "Mic".to_string(),
                kind: MediaDeviceKind::AudioInput,
            },
            MediaDeviceInfo {
                device_id: "cam".to_string(),
                label: String::new(),
                kind: MediaDeviceKind::VideoInput,
            },
            MediaDeviceInfo {
                device_id: "spk".to_string(),
                label: "Speaker".to_string(),
                kind: MediaDeviceKind::AudioOutput,
            },
        ];

        assert_eq!(video_inputs(inventory), vec![device("cam", "")]);
    }
}
