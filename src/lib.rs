//! CAG Cache
//!
//! A cache-augmented generation layer that sits in front of an expensive
//! retrieval + language-model pipeline:
//! - Exact lookups on normalized query text
//! - Semantic lookups by cosine similarity over query embeddings
//! - Bounded LRU storage with optional TTL
//! - Coalescing of concurrent identical misses into one generation
//! - Statistics, pre-warming, and snapshot export/import

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use config::{EmbeddingProviderKind, EmbeddingSettings, GenerationSettings};
use domain::{DomainError, EmbeddingProvider, GenerationPipeline};
use infrastructure::embedding::{HashingEmbeddingProvider, OpenAiEmbeddingProvider};
use infrastructure::generation::OpenAiGenerationPipeline;
use infrastructure::http::HttpClient;
use infrastructure::services::CacheEngine;
use tracing::{info, warn};

/// Build a cache engine and its collaborators from configuration
pub fn build_engine(config: &AppConfig) -> Result<Arc<CacheEngine>, DomainError> {
    config.cache.validate()?;

    let embedding_provider = build_embedding_provider(&config.embedding)?;
    let pipeline = build_generation_pipeline(&config.generation);

    info!(
        embedding_provider = embedding_provider.provider_name(),
        max_size = config.cache.max_size,
        similarity_threshold = config.cache.similarity_threshold,
        ttl_secs = ?config.cache.ttl_secs,
        "Cache engine configured"
    );

    Ok(Arc::new(CacheEngine::with_config(
        embedding_provider,
        pipeline,
        config.cache.clone(),
    )))
}

fn build_embedding_provider(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    match settings.provider {
        EmbeddingProviderKind::Hashing => {
            let dimensions = settings.hashing_dimensions();

            if dimensions == 0 {
                return Err(DomainError::configuration(
                    "embedding.dimensions must be at least 1",
                ));
            }

            Ok(Arc::new(HashingEmbeddingProvider::new(dimensions)))
        }
        EmbeddingProviderKind::Openai => {
            let client = HttpClient::with_timeout(Duration::from_secs(settings.request_timeout_secs))?;
            let api_key = read_api_key(&settings.api_key_env);
            let provider = OpenAiEmbeddingProvider::with_base_url(
                client,
                api_key,
                settings.model.clone(),
                settings.base_url.clone(),
            );

            Ok(match settings.dimensions {
                Some(dimensions) => Arc::new(provider.with_dimensions(dimensions)),
                None => Arc::new(provider),
            })
        }
    }
}

/// The engine bounds each generation with the per-request or configured
/// timeout, so the transport itself carries none.
fn build_generation_pipeline(settings: &GenerationSettings) -> Arc<dyn GenerationPipeline> {
    let mut pipeline = OpenAiGenerationPipeline::with_base_url(
        HttpClient::new(),
        read_api_key(&settings.api_key_env),
        settings.model.clone(),
        settings.base_url.clone(),
    );

    if let Some(temperature) = settings.temperature {
        pipeline = pipeline.with_temperature(temperature);
    }

    if let Some(max_tokens) = settings.max_tokens {
        pipeline = pipeline.with_max_tokens(max_tokens);
    }

    Arc::new(pipeline)
}

/// Local OpenAI-compatible servers accept requests without a key
fn read_api_key(env_var: &str) -> String {
    match std::env::var(env_var) {
        Ok(key) => key,
        Err(_) => {
            warn!(env_var, "API key variable not set; sending requests without a key");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_engine_with_defaults() {
        let engine = build_engine(&AppConfig::default()).unwrap();

        assert_eq!(engine.config().max_size, 1000);
        assert_eq!(engine.get_cache_stats().unwrap().cache_size, 0);
    }

    #[test]
    fn test_build_engine_rejects_invalid_cache_config() {
        let mut config = AppConfig::default();
        config.cache.max_size = 0;

        let err = build_engine(&config).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_hashing_provider_rejects_zero_dimensions() {
        let settings = EmbeddingSettings {
            dimensions: Some(0),
            ..Default::default()
        };

        assert!(build_embedding_provider(&settings).is_err());
    }

    #[test]
    fn test_openai_provider_reports_configured_dimensions() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProviderKind::Openai,
            dimensions: Some(512),
            api_key_env: "CAG_TEST_UNSET_EMBEDDING_KEY".to_string(),
            ..Default::default()
        };

        let provider = build_embedding_provider(&settings).unwrap();
        assert_eq!(provider.dimensions(), Some(512));
    }
}
