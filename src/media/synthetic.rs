// Synthetic camera and encoder
//
// Produces a moving test pattern per device so the capture session can be
// driven end to end without camera hardware. Knobs on `SyntheticCamera`
// simulate permission loss, inventory failures and hot-plugging.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::backend::{
    CameraBackend, EncodedChunk, FacingMode, MediaDeviceInfo, MediaDeviceKind, VideoConstraints,
    VideoEncoder, VideoFrame, VideoSource,
};

/// A fake camera exposed by the synthetic backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticDevice {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub facing: FacingMode,
}

impl SyntheticDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>, facing: FacingMode) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            facing,
        }
    }
}

/// Configuration for the synthetic backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub devices: Vec<SyntheticDevice>,
    /// Native frame width
    pub width: u32,
    /// Native frame height
    pub height: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                SyntheticDevice::new("synthetic-front", "Front Camera", FacingMode::User),
                SyntheticDevice::new("synthetic-rear", "Back Camera", FacingMode::Environment),
            ],
            width: 640,
            height: 360,
        }
    }
}

struct CameraState {
    devices: Vec<SyntheticDevice>,
    access_denied: bool,
    enumeration_fails: bool,
    changes: u64,
}

/// In-process camera backend generating test patterns
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    state: Mutex<CameraState>,
    open_streams: Arc<AtomicUsize>,
    opens: AtomicUsize,
    changes_tx: watch::Sender<u64>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticConfig) -> Self {
        info!(
            "Synthetic camera initialized: {} devices, {}x{}",
            config.devices.len(),
            config.width,
            config.height
        );

        let (changes_tx, _) = watch::channel(0);

        Self {
            width: config.width,
            height: config.height,
            state: Mutex::new(CameraState {
                devices: config.devices,
                access_denied: false,
                enumeration_fails: false,
                changes: 0,
            }),
            open_streams: Arc::new(AtomicUsize::new(0)),
            opens: AtomicUsize::new(0),
            changes_tx,
        }
    }

    /// Attach a device and notify watchers
    pub fn plug(&self, device: SyntheticDevice) {
        info!("Synthetic device plugged: {}", device.id);
        self.mutate(|state| state.devices.push(device));
    }

    /// Detach a device and notify watchers
    pub fn unplug(&self, id: &str) {
        info!("Synthetic device unplugged: {}", id);
        self.mutate(|state| state.devices.retain(|d| d.id != id));
    }

    /// Make subsequent `open` calls fail as if permission was revoked
    pub fn set_access_denied(&self, denied: bool) {
        self.mutate_silently(|state| state.access_denied = denied);
    }

    /// Make subsequent inventory queries fail
    pub fn set_enumeration_fails(&self, fails: bool) {
        self.mutate_silently(|state| state.enumeration_fails = fails);
    }

    /// Number of feeds currently holding a device
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    /// Number of successful `open` calls so far
    pub fn total_opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn mutate(&self, f: impl FnOnce(&mut CameraState)) {
        let changes = match self.state.lock() {
            Ok(mut state) => {
                f(&mut state);
                state.changes += 1;
                state.changes
            }
            Err(e) => {
                warn!("Synthetic camera state poisoned: {}", e);
                return;
            }
        };
        self.changes_tx.send_replace(changes);
    }

    fn mutate_silently(&self, f: impl FnOnce(&mut CameraState)) {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(e) => warn!("Synthetic camera state poisoned: {}", e),
        }
    }

    fn inventory(&self) -> Result<Vec<MediaDeviceInfo>> {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => bail!("Synthetic camera state poisoned"),
        };

        if state.enumeration_fails {
            bail!("Media subsystem unavailable");
        }

        let mut devices: Vec<MediaDeviceInfo> = state
            .devices
            .iter()
            .map(|d| MediaDeviceInfo {
                device_id: d.id.clone(),
                label: d.label.clone(),
                kind: MediaDeviceKind::VideoInput,
            })
            .collect();

        // Real inventories interleave other kinds
        devices.insert(
            0,
            MediaDeviceInfo {
                device_id: "synthetic-microphone".to_string(),
                label: "Synthetic Microphone".to_string(),
                kind: MediaDeviceKind::AudioInput,
            },
        );

        Ok(devices)
    }

    fn resolve(&self, constraints: &VideoConstraints) -> Result<(usize, SyntheticDevice)> {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(_) => bail!("Synthetic camera state poisoned"),
        };

        if state.access_denied {
            bail!("Permission denied");
        }

        if let Some(id) = &constraints.device_id {
            return match state.devices.iter().position(|d| &d.id == id) {
                Some(index) => Ok((index, state.devices[index].clone())),
                None => bail!("Requested device {} not found", id),
            };
        }

        let index = state
            .devices
            .iter()
            .position(|d| d.facing == constraints.facing_mode)
            .or_else(|| (!state.devices.is_empty()).then_some(0));

        match index {
            Some(index) => Ok((index, state.devices[index].clone())),
            None => bail!("No camera available"),
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

#[async_trait::async_trait]
impl CameraBackend for SyntheticCamera {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        self.inventory()
    }

    async fn open(&self, constraints: &VideoConstraints) -> Result<Arc<dyn VideoSource>> {
        if constraints.audio {
            bail!("Audio capture is not supported by the synthetic camera");
        }

        let (index, device) = self.resolve(constraints)?;

        let width = constraints.width.min(self.width).max(1);
        let height = constraints.height.min(self.height).max(1);

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        self.opens.fetch_add(1, Ordering::SeqCst);

        debug!("Opened synthetic feed on {} at {}x{}", device.id, width, height);

        Ok(Arc::new(SyntheticSource {
            device_id: device.id,
            width,
            height,
            hue: (index as u8).wrapping_mul(67),
            opened_at: Instant::now(),
            live: AtomicBool::new(true),
            open_streams: Arc::clone(&self.open_streams),
        }))
    }

    fn device_changes(&self) -> Option<watch::Receiver<u64>> {
        Some(self.changes_tx.subscribe())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Test pattern feed bound to one synthetic device
struct SyntheticSource {
    device_id: String,
    width: u32,
    height: u32,
    hue: u8,
    opened_at: Instant,
    live: AtomicBool,
    open_streams: Arc<AtomicUsize>,
}

impl VideoSource for SyntheticSource {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn grab_frame(&self) -> Result<VideoFrame> {
        if !self.is_live() {
            bail!("Feed on {} has been stopped", self.device_id);
        }

        let timestamp_ms = self.opened_at.elapsed().as_millis() as u64;
        let bar = ((timestamp_ms / 40) % self.width as u64) as u32;

        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                if x == bar {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    let r = (x * 255 / self.width) as u8;
                    let g = (y * 255 / self.height) as u8;
                    data.extend_from_slice(&[r, g, self.hue, 255]);
                }
            }
        }

        Ok(VideoFrame {
            width: self.width,
            height: self.height,
            data,
            timestamp_ms,
        })
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.open_streams.fetch_sub(1, Ordering::SeqCst);
            debug!("Released synthetic feed on {}", self.device_id);
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encoder emitting one PNG-encoded frame per interval
///
/// On stop, one final frame is flushed before the channel closes.
pub struct SyntheticEncoder {
    interval: Duration,
    capacity: usize,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyntheticEncoder {
    pub const MIME_TYPE: &'static str = "video/x-png-sequence";

    pub fn new(interval: Duration, capacity: usize) -> Self {
        Self {
            interval,
            capacity: capacity.max(1),
            stop_tx: None,
            task: None,
        }
    }
}

impl Default for SyntheticEncoder {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), 64)
    }
}

#[async_trait::async_trait]
impl VideoEncoder for SyntheticEncoder {
    async fn start(&mut self, source: Arc<dyn VideoSource>) -> Result<mpsc::Receiver<EncodedChunk>> {
        if self.task.is_some() {
            bail!("Already encoding");
        }

        info!(
            "Starting synthetic encoder on {} (chunk every {}ms)",
            source.device_id(),
            self.interval.as_millis()
        );

        let (tx, rx) = mpsc::channel(self.capacity);
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Some(chunk) = encode_current(&*source, started) {
                            if tx.send(chunk).await.is_err() {
                                debug!("Chunk receiver dropped, ending encoder task");
                                return;
                            }
                        }
                    }
                }
            }

            // Flush the final chunk
            if let Some(chunk) = encode_current(&*source, started) {
                if tx.send(chunk).await.is_err() {
                    debug!("Chunk receiver dropped before final flush");
                }
            }

            info!("Synthetic encoder finalized");
        });

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already be gone if the receiver was dropped
            let _ = stop_tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| anyhow::anyhow!("Encoder task panicked: {}", e))?;
        }

        Ok(())
    }

    fn mime_type(&self) -> &str {
        Self::MIME_TYPE
    }

    fn name(&self) -> &str {
        "synthetic png-sequence"
    }
}

fn encode_current(source: &dyn VideoSource, started: Instant) -> Option<EncodedChunk> {
    let frame = match source.grab_frame() {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Skipping chunk: {}", e);
            return None;
        }
    };

    match frame.encode_png() {
        Ok(data) => Some(EncodedChunk::new(data, started.elapsed().as_millis() as u64)),
        Err(e) => {
            warn!("Failed to encode frame: {}", e);
            None
        }
    }
}
