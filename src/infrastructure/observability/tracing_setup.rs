//! Subscriber installation: console/JSON output plus optional OTLP span export

use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use super::config::TracingConfig;
use crate::config::LogFormat;
use crate::infrastructure::logging::LoggingConfig;

const FALLBACK_DIRECTIVE: &str = "info";

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
/// Call once per process; OTLP failures fall back to local output only.
pub fn init_tracing(logging: &LoggingConfig, tracing_config: &TracingConfig) {
    let (filter, bad_directive) = build_filter(&logging.level);

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    let provider = tracing_config
        .enabled
        .then(|| build_provider(tracing_config));

    let (otel, otel_error) = match provider {
        Some(Ok(provider)) => {
            let tracer = provider.tracer(tracing_config.service_name.clone());
            opentelemetry::global::set_tracer_provider(provider);
            (Some(tracing_opentelemetry::layer().with_tracer(tracer)), None)
        }
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let exporting = otel.is_some();

    tracing_subscriber::registry()
        .with(otel)
        .with(output)
        .with(filter)
        .init();

    if let Some(directive) = bad_directive {
        tracing::warn!(%directive, fallback = FALLBACK_DIRECTIVE, "Ignoring invalid log level");
    }

    if let Some(e) = otel_error {
        tracing::warn!(error = %e, endpoint = %tracing_config.otlp_endpoint, "OTLP export unavailable");
    } else if exporting {
        tracing::info!(
            endpoint = %tracing_config.otlp_endpoint,
            ratio = tracing_config.effective_sampling_ratio(),
            "Exporting spans over OTLP"
        );
    }
}

/// `RUST_LOG` first, then the configured directive, then `info`.
/// Returns the rejected configured directive so it can be reported once logging is up.
fn build_filter(configured: &str) -> (EnvFilter, Option<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }

    match EnvFilter::try_new(configured) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new(FALLBACK_DIRECTIVE), Some(configured.to_string())),
    }
}

fn sampler_for(ratio: f64) -> Sampler {
    match ratio {
        r if r >= 1.0 => Sampler::AlwaysOn,
        r if r <= 0.0 => Sampler::AlwaysOff,
        r => Sampler::TraceIdRatioBased(r),
    }
}

fn build_provider(config: &TracingConfig) -> Result<TracerProvider, opentelemetry::trace::TraceError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    Ok(TracerProvider::builder()
        .with_sampler(sampler_for(config.effective_sampling_ratio()))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ]))
        .with_batch_exporter(exporter, runtime::Tokio)
        .build())
}

/// Flush buffered spans before exit
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
