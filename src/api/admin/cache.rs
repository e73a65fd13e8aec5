//! Cache administration endpoints

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{CacheSnapshot, CacheStatsView, PrewarmReport};
use crate::infrastructure::services::ImportSummary;

/// Request to drop the cached answer for one query
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub removed: bool,
}

/// Queries to run through the cache ahead of traffic
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PrewarmRequest {
    #[validate(length(min = 1, max = 1000))]
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: bool,
    pub stats: CacheStatsView,
}

/// GET /admin/cache/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<CacheStatsView>, ApiError> {
    Ok(Json(state.engine.get_cache_stats()?))
}

/// DELETE /admin/cache
pub async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<ClearCacheResponse>, ApiError> {
    state.engine.clear_cache()?;

    Ok(Json(ClearCacheResponse {
        cleared: true,
        stats: state.engine.get_cache_stats()?,
    }))
}

/// DELETE /admin/cache/entries
pub async fn invalidate_entry(
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let removed = state.engine.invalidate(&request.query)?;

    Ok(Json(InvalidateResponse { removed }))
}

/// POST /admin/cache/prewarm
pub async fn prewarm(
    State(state): State<AppState>,
    Json(request): Json<PrewarmRequest>,
) -> Result<Json<PrewarmReport>, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()).with_param("queries"))?;

    info!(queries = request.queries.len(), "Pre-warm requested");

    Ok(Json(state.engine.pre_warm_cache(request.queries).await))
}

/// GET /admin/cache/export
pub async fn export_cache(State(state): State<AppState>) -> Result<Json<CacheSnapshot>, ApiError> {
    Ok(Json(state.engine.export_cache()?))
}

/// POST /admin/cache/import
///
/// Takes the body as raw JSON so that shape errors are reported as snapshot
/// validation failures rather than extractor rejections.
pub async fn import_cache(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ImportSummary>, ApiError> {
    let snapshot = CacheSnapshot::from_json(body)?;

    Ok(Json(state.engine.import_cache(snapshot)?))
}
