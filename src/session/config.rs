use serde::{Deserialize, Serialize};

use crate::media::FacingMode;

/// Configuration for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "capture-<uuid>")
    pub session_id: String,

    /// Ideal capture width requested from the camera
    pub ideal_width: u32,

    /// Ideal capture height requested from the camera
    pub ideal_height: u32,

    /// Facing mode used until the user toggles it
    pub default_facing_mode: FacingMode,

    /// Export file name without extension
    pub file_stem: String,

    /// Empty the chunk buffer when a new recording starts.
    /// When false, successive recordings accumulate into one export.
    pub reset_buffer_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("capture-{}", uuid::Uuid::new_v4()),
            ideal_width: 1920,
            ideal_height: 1080,
            default_facing_mode: FacingMode::Environment,
            file_stem: "capture-stream".to_string(),
            reset_buffer_on_start: true,
        }
    }
}
