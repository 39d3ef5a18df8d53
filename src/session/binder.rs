use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CaptureError, CaptureResult};
use crate::media::{CameraBackend, FacingMode, VideoConstraints, VideoFrame, VideoSource};

/// Handle to the active video feed
///
/// Clones share the same feed. Only the binder releases it.
#[derive(Clone)]
pub struct LiveStream {
    id: Uuid,
    facing_mode: FacingMode,
    requested_device: Option<String>,
    source: Arc<dyn VideoSource>,
}

impl LiveStream {
    fn new(
        facing_mode: FacingMode,
        requested_device: Option<String>,
        source: Arc<dyn VideoSource>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            facing_mode,
            requested_device,
            source,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Device actually delivering frames
    pub fn device_id(&self) -> &str {
        self.source.device_id()
    }

    /// Device id that was requested, if any
    pub fn requested_device(&self) -> Option<&str> {
        self.requested_device.as_deref()
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.source.resolution()
    }

    /// Whether frames can be read right now
    pub fn is_ready(&self) -> bool {
        self.source.is_live()
    }

    pub fn grab_frame(&self) -> anyhow::Result<VideoFrame> {
        self.source.grab_frame()
    }

    pub(crate) fn source(&self) -> Arc<dyn VideoSource> {
        Arc::clone(&self.source)
    }

    fn release(&self) {
        self.source.stop();
    }
}

impl fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStream")
            .field("id", &self.id)
            .field("device_id", &self.device_id())
            .field("facing_mode", &self.facing_mode)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Binds facing mode and device selection to a single live feed
///
/// Binds may overlap; only the most recently issued one can become active.
/// Older results are released as soon as they arrive.
pub struct StreamBinder {
    backend: Arc<dyn CameraBackend>,
    ideal_width: u32,
    ideal_height: u32,
    generation: AtomicU64,
    current: Mutex<Option<LiveStream>>,
}

impl StreamBinder {
    pub fn new(backend: Arc<dyn CameraBackend>, ideal_width: u32, ideal_height: u32) -> Self {
        Self {
            backend,
            ideal_width,
            ideal_height,
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Acquire a feed for `facing_mode`, or exactly `device_id` when given.
    ///
    /// On success the previous feed is released. On failure the previous feed
    /// stays active.
    pub async fn bind(
        &self,
        facing_mode: FacingMode,
        device_id: Option<String>,
    ) -> CaptureResult<LiveStream> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let constraints = VideoConstraints::new(facing_mode, device_id.clone())
            .with_resolution(self.ideal_width, self.ideal_height);

        info!(
            "Binding stream #{} (facing={}, device={:?}) via {}",
            generation,
            facing_mode,
            device_id,
            self.backend.name()
        );

        let source = match self.backend.open(&constraints).await {
            Ok(source) => source,
            Err(e) => {
                let kept = self.lock_current().is_some();
                warn!(
                    "Stream acquisition failed for bind #{}: {} (previous stream kept: {})",
                    generation, e, kept
                );
                return Err(CaptureError::StreamAcquisition(e.to_string()));
            }
        };

        let stream = LiveStream::new(facing_mode, device_id, source);

        let previous = {
            let mut current = self.lock_current();
            if self.generation.load(Ordering::SeqCst) != generation {
                drop(current);
                debug!("Bind #{} superseded, releasing its stream", generation);
                stream.release();
                return Err(CaptureError::BindSuperseded);
            }
            current.replace(stream.clone())
        };

        if let Some(previous) = previous {
            previous.release();
            debug!("Released previous stream {}", previous.id());
        }

        info!(
            "Stream {} bound to {} at {}x{}",
            stream.id(),
            stream.device_id(),
            stream.resolution().0,
            stream.resolution().1
        );

        Ok(stream)
    }

    /// The active feed, if any
    pub fn current(&self) -> Option<LiveStream> {
        self.lock_current().clone()
    }

    /// The active feed, only if it can deliver frames
    pub fn ready(&self) -> Option<LiveStream> {
        self.current().filter(LiveStream::is_ready)
    }

    /// Release the active feed
    pub fn release(&self) {
        // Pending binds must not resurrect a feed after teardown
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(stream) = self.lock_current().take() {
            stream.release();
            info!("Released stream {}", stream.id());
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<LiveStream>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for StreamBinder {
    fn drop(&mut self) {
        self.release();
    }
}
