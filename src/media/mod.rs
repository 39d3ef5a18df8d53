pub mod backend;
pub mod synthetic;

pub use backend::{
    CameraBackend, EncodedChunk, EncoderFactory, FacingMode, MediaDeviceInfo, MediaDeviceKind,
    VideoConstraints, VideoEncoder, VideoFrame, VideoSource,
};
pub use synthetic::{SyntheticCamera, SyntheticConfig, SyntheticDevice, SyntheticEncoder};
