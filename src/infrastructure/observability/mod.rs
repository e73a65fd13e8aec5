//! Observability infrastructure - Tracing, Metrics, and Logging

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_evictions, record_cache_query,
    record_cache_sizes, record_embedding_error, record_http_request, record_pipeline_error,
    PrometheusMetrics,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
