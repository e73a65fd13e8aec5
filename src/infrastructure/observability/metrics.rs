//! Prometheus metrics infrastructure

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
});

static NUMERIC_SEGMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder. Returns `None` when metrics are
/// disabled or a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let buckets = config.histogram_buckets();
    let installed = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_duration_seconds".to_string()), &buckets)
        .and_then(|builder| builder.install_recorder());

    let handle = match installed {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus recorder not installed");
            return None;
        }
    };

    register_default_metrics();
    tracing::info!(path = %config.path, buckets = buckets.len(), "Prometheus metrics enabled");

    Some(PrometheusMetrics {
        handle: Arc::new(handle),
    })
}

fn register_default_metrics() {
    gauge!("cag_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record one answered query, labelled by how it was answered
pub fn record_cache_query(hit_type: &str, duration: Duration) {
    let labels = [("hit_type", hit_type.to_string())];

    counter!("cag_queries_total", &labels).increment(1);
    histogram!("cag_query_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record entries evicted from one of the stores ("responses" or "embeddings")
pub fn record_cache_evictions(store: &'static str, count: usize) {
    if count == 0 {
        return;
    }

    counter!("cag_evictions_total", "store" => store).increment(count as u64);
}

pub fn record_pipeline_error(timed_out: bool) {
    let reason = if timed_out { "timeout" } else { "error" };
    counter!("cag_pipeline_errors_total", "reason" => reason).increment(1);
}

pub fn record_embedding_error() {
    counter!("cag_embedding_errors_total").increment(1);
}

/// Publish current store sizes
pub fn record_cache_sizes(responses: usize, embeddings: usize) {
    gauge!("cag_cache_entries", "store" => "responses").set(responses as f64);
    gauge!("cag_cache_entries", "store" => "embeddings").set(embeddings as f64);
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let mut path = path.to_string();

    if let Some(re) = UUID_SEGMENT.as_ref() {
        path = re.replace_all(&path, "{id}").into_owned();
    }

    if let Some(re) = NUMERIC_SEGMENT.as_ref() {
        path = re.replace_all(&path, "/{id}$1").into_owned();
    }

    path.chars().take(50).collect()
}
