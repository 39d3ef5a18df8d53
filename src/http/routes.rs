use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::get_status))
        // Device registry
        .route("/devices", get(handlers::list_devices))
        .route("/devices/refresh", post(handlers::refresh_devices))
        .route("/devices/select", post(handlers::select_device))
        // Stream binding
        .route("/camera/toggle", post(handlers::toggle_camera))
        // Snapshots
        .route(
            "/photo",
            get(handlers::get_photo).post(handlers::capture_photo),
        )
        // Recording control
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/download", get(handlers::download_recording))
        .route("/recording/preview", get(handlers::preview_recording))
        .route("/recording", axum::routing::delete(handlers::clear_recording))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
