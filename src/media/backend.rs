use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Preferred camera direction on devices with more than one camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the user
    User,
    /// Rear camera, facing away from the user
    #[default]
    Environment,
}

impl FacingMode {
    /// The other facing mode
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

impl FromStr for FacingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(FacingMode::User),
            "environment" => Ok(FacingMode::Environment),
            other => anyhow::bail!("Unknown facing mode: {}", other),
        }
    }
}

/// Kind of media device reported by the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// One entry of the environment's media device inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    /// May be empty when the environment withholds labels
    pub label: String,
    pub kind: MediaDeviceKind,
}

/// Constraints for a live video request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Ideal width in pixels
    pub width: u32,
    /// Ideal height in pixels
    pub height: u32,
    /// Preferred facing mode
    pub facing_mode: FacingMode,
    /// Exact device id; takes precedence over `facing_mode`
    pub device_id: Option<String>,
    /// Audio is never requested by the capture session
    pub audio: bool,
}

impl VideoConstraints {
    pub fn new(facing_mode: FacingMode, device_id: Option<String>) -> Self {
        Self {
            width: 1920,
            height: 1080,
            facing_mode,
            device_id,
            audio: false,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// A single decoded video frame (RGBA8, row-major)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Raw pixels, `width * height * 4` bytes
    pub data: Vec<u8>,
    /// Milliseconds since the source was opened
    pub timestamp_ms: u64,
}

impl VideoFrame {
    /// Encode as a PNG image
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            anyhow::bail!(
                "Frame buffer is {} bytes, expected {} for {}x{} RGBA",
                self.data.len(),
                expected,
                self.width,
                self.height
            );
        }

        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .context("Failed to write PNG header")?;
            writer
                .write_image_data(&self.data)
                .context("Failed to write PNG data")?;
        }

        Ok(out)
    }
}

/// A unit of encoded video emitted by an encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
    /// Milliseconds since the encoder was started
    pub timestamp_ms: u64,
}

impl EncodedChunk {
    pub fn new(data: Vec<u8>, timestamp_ms: u64) -> Self {
        Self { data, timestamp_ms }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Live video feed handed out by a camera backend
///
/// Holding a source keeps the underlying device locked until `stop` is called.
pub trait VideoSource: Send + Sync {
    /// Device actually backing this feed
    fn device_id(&self) -> &str;

    /// Native resolution of delivered frames
    fn resolution(&self) -> (u32, u32);

    /// Whether frames can currently be read
    fn is_live(&self) -> bool;

    /// Sample the current frame
    fn grab_frame(&self) -> Result<VideoFrame>;

    /// Release the device; idempotent
    fn stop(&self);
}

/// Camera access capability
///
/// Implementations:
/// - Synthetic: in-process test pattern (for demos/tests)
/// - Platform cameras plug in behind the same trait
#[async_trait::async_trait]
pub trait CameraBackend: Send + Sync {
    /// Query the media device inventory, all kinds, in environment order
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>>;

    /// Acquire a live video feed satisfying `constraints`
    async fn open(&self, constraints: &VideoConstraints) -> Result<Arc<dyn VideoSource>>;

    /// Device-change notifications, if the environment exposes them
    fn device_changes(&self) -> Option<watch::Receiver<u64>> {
        None
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Video encoding capability
///
/// `start` returns a channel receiving chunks in temporal order. `stop` flushes
/// any final chunk into that channel and then closes it.
#[async_trait::async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Begin encoding `source`
    async fn start(&mut self, source: Arc<dyn VideoSource>) -> Result<mpsc::Receiver<EncodedChunk>>;

    /// Finalize encoding
    async fn stop(&mut self) -> Result<()>;

    /// Content type of the produced stream (e.g. `video/webm`)
    fn mime_type(&self) -> &str;

    /// Encoder name for logging
    fn name(&self) -> &str;
}

/// Creates a fresh encoder for each recording
pub trait EncoderFactory: Send + Sync {
    fn create(&self) -> Box<dyn VideoEncoder>;
}

impl<F> EncoderFactory for F
where
    F: Fn() -> Box<dyn VideoEncoder> + Send + Sync,
{
    fn create(&self) -> Box<dyn VideoEncoder> {
        self()
    }
}
