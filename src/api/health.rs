//! Liveness, readiness and status probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;
use crate::domain::cag::CacheStatsView;

use super::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            Self::Healthy => StatusCode::OK,
            Self::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<StoreCheck>,
}

/// Occupancy of one bounded store
#[derive(Serialize, Debug, PartialEq)]
pub struct StoreCheck {
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: VERSION,
        uptime_secs: Some(state.started_at.elapsed().as_secs()),
        checks: Vec::new(),
    })
}

/// Ready once both stores answer; a poisoned store lock makes the instance unready
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let config = state.engine.config();

    let checks = match state.engine.get_cache_stats() {
        Ok(stats) => store_checks(&stats, config.max_size, config.max_embedding_cache_size),
        Err(e) => vec![StoreCheck {
            name: "response_store",
            status: HealthStatus::Unhealthy,
            entries: None,
            capacity: None,
            error: Some(e.to_string()),
        }],
    };

    let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    tracing::debug!(?status, elapsed_us = started.elapsed().as_micros() as u64, "Readiness probed");

    (
        status.status_code(),
        Json(HealthResponse {
            status,
            version: VERSION,
            uptime_secs: None,
            checks,
        }),
    )
}

pub async fn live_check() -> StatusCode {
    StatusCode::OK
}

fn store_checks(stats: &CacheStatsView, max_size: usize, max_embeddings: usize) -> Vec<StoreCheck> {
    let healthy = |name, entries, capacity| StoreCheck {
        name,
        status: HealthStatus::Healthy,
        entries: Some(entries),
        capacity: Some(capacity),
        error: None,
    };

    vec![
        healthy("response_store", stats.cache_size, max_size),
        healthy("embedding_cache", stats.embedding_cache_size, max_embeddings),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(HealthStatus::Healthy.status_code(), StatusCode::OK);
        assert_eq!(
            HealthStatus::Unhealthy.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_store_checks_report_occupancy() {
        let stats = CacheStatsView {
            cache_size: 3,
            embedding_cache_size: 7,
            ..CacheStatsView::default()
        };

        let checks = store_checks(&stats, 10, 20);

        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].name, "response_store");
        assert_eq!(checks[0].entries, Some(3));
        assert_eq!(checks[1].capacity, Some(20));
    }

    #[test]
    fn test_liveness_body_omits_empty_fields() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0",
            uptime_secs: None,
            checks: Vec::new(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json.get("checks").is_none());
        assert!(json.get("uptime_secs").is_none());
    }
}
