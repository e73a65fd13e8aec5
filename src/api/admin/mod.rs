//! Admin API endpoints for inspecting and managing the cache

pub mod cache;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Snapshots carry one embedding per entry and outgrow axum's 2 MiB default
const SNAPSHOT_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/stats", get(cache::get_stats))
        .route("/cache/entries", delete(cache::invalidate_entry))
        .route("/cache/prewarm", post(cache::prewarm))
        .route("/cache/export", get(cache::export_cache))
        .route(
            "/cache/import",
            post(cache::import_cache).layer(DefaultBodyLimit::max(SNAPSHOT_BODY_LIMIT)),
        )
}
