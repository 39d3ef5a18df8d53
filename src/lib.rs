pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod session;

pub use config::Config;
pub use error::{CaptureError, CaptureResult};
pub use http::{create_router, AppState};
pub use media::{
    CameraBackend, EncodedChunk, EncoderFactory, FacingMode, MediaDeviceInfo, MediaDeviceKind,
    SyntheticCamera, SyntheticConfig, SyntheticDevice, SyntheticEncoder, VideoConstraints,
    VideoEncoder, VideoFrame, VideoSource,
};
pub use session::{
    CaptureSession, ChunkBuffer, Device, DeviceOption, DeviceRegistry, LiveStream,
    RecordingSession, RecordingState, RecordingSummary, SessionConfig, SessionStatus, Snapshot,
    VideoBlob,
};
