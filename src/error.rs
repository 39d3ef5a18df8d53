//! Error types for capture sessions

use thiserror::Error;

/// Failures surfaced by a capture session
///
/// Enumeration and acquisition failures come from the environment and are
/// absorbed by the session. `NoActiveStream`, `NotRecording`,
/// `AlreadyRecording` and `RecordingInProgress` are contract guards: a
/// correctly driven UI never triggers them.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("Stream acquisition failed: {0}")]
    StreamAcquisition(String),

    #[error("No active stream")]
    NoActiveStream,

    #[error("Not recording")]
    NotRecording,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Cannot change camera while recording")]
    RecordingInProgress,

    #[error("Bind superseded by a newer request")]
    BindSuperseded,

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::DeviceEnumeration(_) => "DEVICE_ENUMERATION_ERROR",
            CaptureError::StreamAcquisition(_) => "STREAM_ACQUISITION_ERROR",
            CaptureError::NoActiveStream => "NO_ACTIVE_STREAM",
            CaptureError::NotRecording => "NOT_RECORDING",
            CaptureError::AlreadyRecording => "ALREADY_RECORDING",
            CaptureError::RecordingInProgress => "RECORDING_IN_PROGRESS",
            CaptureError::BindSuperseded => "BIND_SUPERSEDED",
            CaptureError::Encoder(_) => "ENCODER_ERROR",
            CaptureError::Snapshot(_) => "SNAPSHOT_ERROR",
            CaptureError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether this is a caller-misuse guard rather than an environment failure
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            CaptureError::NoActiveStream
                | CaptureError::NotRecording
                | CaptureError::AlreadyRecording
                | CaptureError::RecordingInProgress
        )
    }
}

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;
