use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::binder::{LiveStream, StreamBinder};
use super::config::SessionConfig;
use super::devices::{self, DeviceOption, DeviceRegistry};
use super::export::VideoBlob;
use super::recording::{RecordingSession, RecordingState, RecordingSummary};
use super::snapshot::{Snapshot, SnapshotExtractor};
use super::stats::SessionStatus;
use crate::error::{CaptureError, CaptureResult};
use crate::media::{CameraBackend, EncoderFactory, FacingMode};

/// A capture session: device selection, live preview, snapshots and recording
///
/// All state is owned here; several sessions can coexist over different
/// backends.
pub struct CaptureSession {
    config: SessionConfig,
    backend: Arc<dyn CameraBackend>,
    encoders: Arc<dyn EncoderFactory>,
    started_at: DateTime<Utc>,
    facing_mode: Mutex<FacingMode>,
    registry: Mutex<DeviceRegistry>,
    binder: StreamBinder,
    snapshots: Mutex<SnapshotExtractor>,
    recording: RecordingSession,
    device_watch: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureSession {
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn CameraBackend>,
        encoders: Arc<dyn EncoderFactory>,
    ) -> Self {
        info!("Creating capture session: {}", config.session_id);

        let binder = StreamBinder::new(
            Arc::clone(&backend),
            config.ideal_width,
            config.ideal_height,
        );

        Self {
            facing_mode: Mutex::new(config.default_facing_mode),
            recording: RecordingSession::new(config.reset_buffer_on_start),
            config,
            backend,
            encoders,
            started_at: Utc::now(),
            registry: Mutex::new(DeviceRegistry::new()),
            binder,
            snapshots: Mutex::new(SnapshotExtractor::new()),
            device_watch: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Enumerate devices and bind the initial stream.
    ///
    /// An empty device list is not an error; the stream is then resolved by
    /// facing mode alone.
    pub async fn open(&self) -> CaptureResult<LiveStream> {
        self.refresh_devices().await;
        self.rebind().await
    }

    /// Re-query devices whenever the backend reports a change.
    /// The task ends when the session is dropped.
    pub fn watch_devices(self: &Arc<Self>) {
        let Some(mut changes) = self.backend.device_changes() else {
            debug!("{} does not report device changes", self.backend.name());
            return;
        };

        let session: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                // Hold the session only for the duration of one refresh
                let Some(session) = session.upgrade() else {
                    break;
                };
                info!("Device change reported, re-querying");
                session.refresh_devices().await;
            }
            debug!("Device watcher stopped");
        });

        if let Some(previous) = lock(&self.device_watch).replace(task) {
            previous.abort();
        }
    }

    /// Re-enumerate video inputs
    pub async fn refresh_devices(&self) -> Vec<DeviceOption> {
        let devices = devices::list_devices(self.backend.as_ref()).await;
        let mut registry = lock(&self.registry);
        registry.update(devices);
        registry.options()
    }

    /// Picker entries for the listed devices
    pub fn devices(&self) -> Vec<DeviceOption> {
        lock(&self.registry).options()
    }

    pub fn selected_device(&self) -> Option<String> {
        lock(&self.registry).selected().map(str::to_string)
    }

    pub fn facing_mode(&self) -> FacingMode {
        *lock(&self.facing_mode)
    }

    /// Flip between user and environment facing, then rebind.
    /// Rejected while recording.
    pub async fn toggle_facing_mode(&self) -> CaptureResult<LiveStream> {
        self.ensure_not_recording()?;

        let facing_mode = {
            let mut facing_mode = lock(&self.facing_mode);
            *facing_mode = facing_mode.toggled();
            *facing_mode
        };
        info!("Facing mode changed to {}", facing_mode);

        self.rebind().await
    }

    /// Select a device by id, then rebind. Unlisted ids are accepted.
    /// Rejected while recording.
    pub async fn select_device(&self, id: impl Into<String>) -> CaptureResult<LiveStream> {
        self.ensure_not_recording()?;

        let id = id.into();
        info!("Device selected: {}", id);
        lock(&self.registry).select_device(id);

        self.rebind().await
    }

    /// Bind a stream for the current facing mode and selection
    pub async fn rebind(&self) -> CaptureResult<LiveStream> {
        // The active encoder reads from the current feed
        self.ensure_not_recording()?;

        let facing_mode = self.facing_mode();
        let device_id = {
            let registry = lock(&self.registry);
            match (registry.selected(), registry.resolved_selection()) {
                // Stale selection stays stored; this bind goes by facing mode
                (Some(selected), None) => {
                    warn!(
                        "Selected device {} is not listed, falling back to facing mode {}",
                        selected, facing_mode
                    );
                    None
                }
                (_, resolved) => resolved.map(str::to_string),
            }
        };

        self.binder.bind(facing_mode, device_id).await
    }

    /// The active stream, if any
    pub fn stream(&self) -> Option<LiveStream> {
        self.binder.current()
    }

    /// Capture a still frame, replacing the previous one
    pub fn capture_photo(&self) -> CaptureResult<Snapshot> {
        // Clone the stream out so the binder lock is not held while encoding
        let stream = self.binder.ready();
        let mut snapshots = lock(&self.snapshots);
        snapshots.capture(stream.as_ref()).cloned()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        lock(&self.snapshots).latest().cloned()
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording.state()
    }

    pub async fn start_recording(&self) -> CaptureResult<()> {
        let stream = self.binder.ready();
        let encoder = self.encoders.create();
        self.recording.start(stream.as_ref(), encoder).await
    }

    pub async fn stop_recording(&self) -> CaptureResult<RecordingSummary> {
        self.recording.stop().await
    }

    /// Concatenated recording, or `None` if nothing is buffered
    pub async fn export(&self) -> Option<VideoBlob> {
        self.recording.export(&self.config.file_stem).await
    }

    pub async fn clear(&self) {
        self.recording.clear().await
    }

    pub fn recording(&self) -> &RecordingSession {
        &self.recording
    }

    pub async fn status(&self) -> SessionStatus {
        let (selected_device, devices) = {
            let registry = lock(&self.registry);
            (registry.selected().map(str::to_string), registry.options())
        };
        let stream = self.binder.current();
        let has_snapshot = lock(&self.snapshots).latest().is_some();

        SessionStatus {
            session_id: self.config.session_id.clone(),
            started_at: self.started_at,
            state: self.recording.state(),
            facing_mode: self.facing_mode(),
            selected_device,
            devices,
            stream_ready: stream.as_ref().map(LiveStream::is_ready).unwrap_or(false),
            stream_device: stream.as_ref().map(|s| s.device_id().to_string()),
            chunk_count: self.recording.chunk_count().await,
            buffered_bytes: self.recording.buffered_bytes().await,
            has_snapshot,
        }
    }

    /// Stop any recording and release the camera
    pub async fn shutdown(&self) {
        info!("Shutting down capture session: {}", self.config.session_id);

        // Stop re-querying first so no refresh races the teardown
        let watcher = lock(&self.device_watch).take();
        if let Some(task) = watcher {
            task.abort();
        }

        // Drain the encoder while its feed is still live
        if self.recording.is_recording() {
            if let Err(e) = self.recording.stop().await {
                warn!("Failed to stop recording during shutdown: {}", e);
            }
        }

        self.binder.release();
    }

    fn ensure_not_recording(&self) -> CaptureResult<()> {
        if self.recording.is_recording() {
            warn!("Camera change requested while recording");
            return Err(CaptureError::RecordingInProgress);
        }
        Ok(())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.device_watch).take() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
