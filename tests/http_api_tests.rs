// Integration tests for the HTTP API
//
// Requests are sent straight into the router with `oneshot`; no socket is
// bound.

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use capture_booth::{create_router, AppState, CaptureSession};
use common::{session_over, two_cameras, ScriptedEncoder};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> (Router, Arc<CaptureSession>) {
    let encoders: Arc<dyn capture_booth::EncoderFactory> = Arc::new(|| {
        Box::new(ScriptedEncoder::new(&["head", "tail"], None))
            as Box<dyn capture_booth::VideoEncoder>
    });
    let session = Arc::new(session_over(two_cameras(), encoders));
    (create_router(AppState::new(Arc::clone(&session))), session)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Vec<u8>)> {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body)?).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

fn json(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let (app, _) = app();

    let (status, body) = send(&app, "GET", "/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK".to_vec());
    Ok(())
}

#[tokio::test]
async fn test_device_listing_uses_fallback_labels() -> Result<()> {
    let (app, _) = app();

    let (status, body) = send(&app, "POST", "/devices/refresh", None).await?;
    assert_eq!(status, StatusCode::OK);

    let devices = json(&body)?;
    assert_eq!(devices[0]["label"], "Front");
    assert_eq!(devices[1]["id"], "rear");
    assert_eq!(devices[1]["label"], "Camera 2");
    Ok(())
}

#[tokio::test]
async fn test_select_device_rebinds_stream() -> Result<()> {
    let (app, session) = app();
    session.open().await?;

    let (status, body) = send(
        &app,
        "POST",
        "/devices/select",
        Some(serde_json::json!({ "device_id": "front" })),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    let bound = json(&body)?;
    assert_eq!(bound["device_id"], "front");
    assert_eq!(bound["facing_mode"], "environment");
    assert_eq!(session.selected_device().as_deref(), Some("front"));
    Ok(())
}

#[tokio::test]
async fn test_toggle_camera_flips_facing_mode() -> Result<()> {
    let (app, session) = app();
    session.open().await?;

    let (status, body) = send(&app, "POST", "/camera/toggle", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)?["facing_mode"], "user");
    Ok(())
}

#[tokio::test]
async fn test_photo_without_stream_is_conflict() -> Result<()> {
    let (app, _) = app();

    let (status, body) = send(&app, "POST", "/photo", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)?["code"], "NO_ACTIVE_STREAM");

    let (status, _) = send(&app, "GET", "/photo", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_photo_capture_and_fetch() -> Result<()> {
    let (app, session) = app();
    session.open().await?;

    let (status, body) = send(&app, "POST", "/photo", None).await?;
    assert_eq!(status, StatusCode::OK);
    let snapshot = json(&body)?;
    assert_eq!(snapshot["device_id"], "rear");
    assert!(snapshot["data_url"]
        .as_str()
        .unwrap_or_default()
        .starts_with("data:image/png;base64,"));

    let (status, png) = send(&app, "GET", "/photo", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&png[..4], b"\x89PNG");
    Ok(())
}

#[tokio::test]
async fn test_recording_round_trip_over_http() -> Result<()> {
    let (app, session) = app();
    session.open().await?;

    let (status, body) = send(&app, "POST", "/recording/start", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)?["status"], "recording");

    let (status, _) = send(&app, "POST", "/recording/start", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/recording/stop", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)?["buffered_chunks"], 2);

    let response = app
        .clone()
        .oneshot(Request::get("/recording/download").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/webm");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"capture-stream.webm\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(bytes.to_vec(), b"headtail".to_vec());

    // Downloading leaves the buffer intact for preview
    let (status, preview) = send(&app, "GET", "/recording/preview", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview, b"headtail".to_vec());

    let (status, _) = send(&app, "DELETE", "/recording", None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/recording/download", None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_stop_while_idle_is_conflict() -> Result<()> {
    let (app, _) = app();

    let (status, body) = send(&app, "POST", "/recording/stop", None).await?;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)?["code"], "NOT_RECORDING");
    Ok(())
}

#[tokio::test]
async fn test_status_endpoint() -> Result<()> {
    let (app, session) = app();
    session.open().await?;

    let (status, body) = send(&app, "GET", "/status", None).await?;

    assert_eq!(status, StatusCode::OK);
    let report = json(&body)?;
    assert_eq!(report["state"], "idle");
    assert_eq!(report["facing_mode"], "environment");
    assert_eq!(report["stream_ready"], true);
    assert_eq!(report["session_id"], session.session_id());
    Ok(())
}

#[tokio::test]
async fn test_toggle_while_recording_is_conflict() -> Result<()> {
    let (app, session) = app();
    session.open().await?;
    session.start_recording().await?;

    let (status, body) = send(&app, "POST", "/camera/toggle", None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json(&body)?["code"], "RECORDING_IN_PROGRESS");

    let (status, _) = send(
        &app,
        "POST",
        "/devices/select",
        Some(serde_json::json!({ "device_id": "front" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    session.stop_recording().await?;
    Ok(())
}
