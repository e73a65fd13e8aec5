//! Query endpoint

use axum::extract::State;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{CagRequest, CagResult};

/// POST /v1/query
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<CagRequest>,
) -> Result<Json<CagResult>, ApiError> {
    let result = state.engine.query(request).await?;

    debug!(
        cache_hit_type = result.hit.as_str(),
        processing_time_ms = result.processing_time.as_millis() as u64,
        "Query answered"
    );

    Ok(Json(result))
}
