use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::devices::DeviceOption;
use super::recording::RecordingState;
use crate::media::FacingMode;

/// Point-in-time view of a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    pub state: RecordingState,

    pub facing_mode: FacingMode,

    /// Selected device id, even if it is no longer listed
    pub selected_device: Option<String>,

    /// Device picker entries
    pub devices: Vec<DeviceOption>,

    /// Whether a live stream is ready for capture
    pub stream_ready: bool,

    /// Device currently delivering frames
    pub stream_device: Option<String>,

    /// Number of buffered chunks
    pub chunk_count: usize,

    /// Buffered bytes across all chunks
    pub buffered_bytes: usize,

    /// Whether a snapshot is held
    pub has_snapshot: bool,
}
