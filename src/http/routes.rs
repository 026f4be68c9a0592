use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recordings
        .route(
            "/recordings",
            get(handlers::list_recordings).post(handlers::create_recording),
        )
        .route("/recordings/fetch", post(handlers::fetch_recording))
        .route(
            "/recordings/:id",
            patch(handlers::update_recording).delete(handlers::delete_recording),
        )
        .route(
            "/recordings/:id/transcribe",
            post(handlers::transcribe_recording),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        // Statistics
        .route("/stats/monthly", get(handlers::monthly_stats))
        // Local model control
        .route("/model/load", post(handlers::load_model))
        .route("/model/status", get(handlers::model_status))
        .route("/model/reset", post(handlers::reset_model))
        // Remote extraction
        .route("/extract", post(handlers::extract_pending))
        .route("/extract/texts", post(handlers::extract_texts))
        .route(
            "/recordings/:id/extract",
            post(handlers::extract_recording),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
