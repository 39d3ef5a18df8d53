use super::state::AppState;
use crate::error::CaptureError;
use crate::media::FacingMode;
use crate::session::{LiveStream, RecordingState, Snapshot, VideoBlob};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SelectDeviceRequest {
    pub device_id: String,
}

#[derive(Debug, Serialize)]
pub struct BindResponse {
    pub stream_id: String,
    pub device_id: String,
    pub facing_mode: FacingMode,
    pub width: u32,
    pub height: u32,
}

impl From<&LiveStream> for BindResponse {
    fn from(stream: &LiveStream) -> Self {
        let (width, height) = stream.resolution();
        Self {
            stream_id: stream.id().to_string(),
            device_id: stream.device_id().to_string(),
            facing_mode: stream.facing_mode(),
            width,
            height,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub width: u32,
    pub height: u32,
    pub device_id: String,
    pub captured_at: DateTime<Utc>,
    pub data_url: String,
}

impl From<&Snapshot> for SnapshotResponse {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            width: snapshot.width,
            height: snapshot.height,
            device_id: snapshot.device_id.clone(),
            captured_at: snapshot.captured_at,
            data_url: snapshot.to_data_url(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub status: RecordingState,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(e: CaptureError) -> Response {
    let status = match &e {
        CaptureError::NoActiveStream
        | CaptureError::NotRecording
        | CaptureError::AlreadyRecording
        | CaptureError::RecordingInProgress
        | CaptureError::BindSuperseded => StatusCode::CONFLICT,
        CaptureError::StreamAcquisition(_) | CaptureError::DeviceEnumeration(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CaptureError::Encoder(_) | CaptureError::Snapshot(_) | CaptureError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if e.is_guard() {
        warn!("Rejected action: {}", e);
    } else {
        error!("Action failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    )
        .into_response()
}

fn bind_response(result: Result<LiveStream, CaptureError>) -> Response {
    match result {
        Ok(stream) => (StatusCode::OK, Json(BindResponse::from(&stream))).into_response(),
        Err(e) => error_response(e),
    }
}

fn blob_response(blob: Option<VideoBlob>, disposition: &str) -> Response {
    match blob {
        Some(blob) => {
            let disposition = format!("{}; filename=\"{}\"", disposition, blob.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, blob.mime_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                blob.data,
            )
                .into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /devices
/// Device picker entries
pub async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.devices())
}

/// POST /devices/refresh
/// Re-enumerate video inputs
pub async fn refresh_devices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.refresh_devices().await)
}

/// POST /devices/select
/// Select a device and rebind the stream
pub async fn select_device(
    State(state): State<AppState>,
    Json(req): Json<SelectDeviceRequest>,
) -> Response {
    info!("Selecting device: {}", req.device_id);
    bind_response(state.session.select_device(req.device_id).await)
}

/// POST /camera/toggle
/// Switch between user- and environment-facing cameras
pub async fn toggle_camera(State(state): State<AppState>) -> Response {
    bind_response(state.session.toggle_facing_mode().await)
}

/// POST /photo
/// Capture a snapshot, replacing the previous one
pub async fn capture_photo(State(state): State<AppState>) -> Response {
    match state.session.capture_photo() {
        Ok(snapshot) => (StatusCode::OK, Json(SnapshotResponse::from(&snapshot))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /photo
/// The current snapshot as a PNG image
pub async fn get_photo(State(state): State<AppState>) -> Response {
    match state.session.snapshot() {
        Some(snapshot) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, Snapshot::MIME_TYPE)],
            snapshot.png,
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No snapshot captured".to_string(),
                code: "NO_SNAPSHOT".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /recording/start
pub async fn start_recording(State(state): State<AppState>) -> Response {
    match state.session.start_recording().await {
        Ok(()) => (
            StatusCode::OK,
            Json(RecordingResponse {
                status: RecordingState::Recording,
                message: "Recording started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /recording/stop
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    match state.session.stop_recording().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /recording/download
/// The concatenated recording as a file attachment; 204 if nothing is buffered
pub async fn download_recording(State(state): State<AppState>) -> Response {
    blob_response(state.session.export().await, "attachment")
}

/// GET /recording/preview
/// The concatenated recording for inline playback
pub async fn preview_recording(State(state): State<AppState>) -> Response {
    blob_response(state.session.export().await, "inline")
}

/// DELETE /recording
/// Empty the chunk buffer
pub async fn clear_recording(State(state): State<AppState>) -> Response {
    state.session.clear().await;
    (
        StatusCode::OK,
        Json(RecordingResponse {
            status: state.session.recording_state(),
            message: "Recording buffer cleared".to_string(),
        }),
    )
        .into_response()
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.status().await)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
