use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{artifacts, convert, formats, handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Multipart overhead on top of the configured upload limit.
    let body_limit = state.max_upload_bytes() as usize + 64 * 1024;

    let api_routes = Router::new()
        // Health, config, metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Conversion
        .route("/convert", post(convert::convert))
        .route("/formats", get(formats::list_formats))
        // Jobs
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}", delete(jobs::cancel_job))
        // Artifacts
        .route("/download/{artifact_id}", get(artifacts::download))
        .route("/artifacts/{id}", delete(artifacts::delete_artifact))
        .route("/cleanup", post(artifacts::cleanup))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
