//! HTTP API for driving a capture session
//!
//! Each route maps to one user action:
//! - GET /devices, POST /devices/refresh, POST /devices/select - Device picker
//! - POST /camera/toggle - Switch facing mode
//! - POST /photo, GET /photo - Capture and fetch the snapshot
//! - POST /recording/start, POST /recording/stop - Recording lifecycle
//! - GET /recording/download, GET /recording/preview - Export
//! - DELETE /recording - Clear the buffer
//! - GET /status, GET /health - Queries

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
