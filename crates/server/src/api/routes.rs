use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::{entries, handlers, jobs};
use crate::state::AppState;

/// Upload body limit: media files are large.
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let media_dir = state.config().storage.media_dir();
    let rss_path = state.config().storage.rss_path();

    let api_routes = Router::new()
        // Health, config, orchestrator status
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        // Jobs
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/upload", post(jobs::upload_job))
        .route("/jobs/{id}", get(jobs::get_job_status))
        .route("/jobs/{id}", delete(jobs::cancel_job))
        // Feed entries
        .route("/entries", get(entries::list_entries))
        .route("/entries/{id}", delete(entries::delete_entry))
        .with_state(state);

    // The published documents are served straight from durable storage.
    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(crate::metrics::metrics_handler))
        .route_service("/feed.xml", ServeFile::new(rss_path))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
}
