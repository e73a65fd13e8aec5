//! Settings for span export and the Prometheus recorder

use serde::Deserialize;

/// Upper bounds (seconds) for query and HTTP latency histograms.
/// Cache hits land in the first few buckets; generations in the last.
pub const DEFAULT_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

/// OTLP span export. Off unless a collector is configured.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub otlp_endpoint: String,
    pub service_name: String,
    /// Fraction of root spans kept; clamped into `[0, 1]`
    pub sampling_ratio: f64,
}

impl TracingConfig {
    pub fn effective_sampling_ratio(&self) -> f64 {
        if self.sampling_ratio.is_nan() {
            return 1.0;
        }
        self.sampling_ratio.clamp(0.0, 1.0)
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: env!("CARGO_PKG_NAME").to_string(),
            sampling_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Route the scrape endpoint is mounted on
    pub path: String,
    pub latency_buckets: Vec<f64>,
}

impl MetricsConfig {
    /// Configured buckets, sorted, with non-positive and non-finite bounds dropped.
    /// Falls back to the defaults when nothing usable is left.
    pub fn histogram_buckets(&self) -> Vec<f64> {
        let mut buckets: Vec<f64> = self
            .latency_buckets
            .iter()
            .copied()
            .filter(|b| b.is_finite() && *b > 0.0)
            .collect();
        buckets.sort_by(f64::total_cmp);
        buckets.dedup();

        if buckets.is_empty() {
            DEFAULT_LATENCY_BUCKETS.to_vec()
        } else {
            buckets
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
            latency_buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }
}
