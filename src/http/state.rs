use crate::session::CaptureSession;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The capture session driven by this server
    pub session: Arc<CaptureSession>,
}

impl AppState {
    pub fn new(session: Arc<CaptureSession>) -> Self {
        Self { session }
    }
}
