//! Cache engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Capacity, threshold and timeout settings for one cache engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached answers
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Maximum number of cached query embeddings, bounded independently
    #[serde(default = "default_max_embedding_cache_size")]
    pub max_embedding_cache_size: usize,

    /// Minimum cosine similarity for a semantic hit (0.0 to 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Optional time-to-live for cached answers; disabled when absent
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Upper bound on a single generation-pipeline call
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Number of pre-warm queries run at once
    #[serde(default = "default_prewarm_concurrency")]
    pub prewarm_concurrency: usize,

    /// `max_results` used for pre-warm queries
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
}

fn default_max_size() -> usize {
    1000
}

fn default_max_embedding_cache_size() -> usize {
    5000
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_prewarm_concurrency() -> usize {
    4
}

fn default_max_results() -> usize {
    5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            max_embedding_cache_size: default_max_embedding_cache_size(),
            similarity_threshold: default_similarity_threshold(),
            ttl_secs: None,
            generation_timeout_secs: default_generation_timeout_secs(),
            prewarm_concurrency: default_prewarm_concurrency(),
            default_max_results: default_max_results(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// TTL as a Duration, if enabled
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }

    /// Generation timeout as a Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn with_max_size(mut self, max: usize) -> Self {
        self.max_size = max;
        self
    }

    pub fn with_max_embedding_cache_size(mut self, max: usize) -> Self {
        self.max_embedding_cache_size = max;
        self
    }

    /// Set the similarity threshold, clamped to [0, 1]
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = Some(ttl.as_secs());
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_prewarm_concurrency(mut self, concurrency: usize) -> Self {
        self.prewarm_concurrency = concurrency;
        self
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_size == 0 {
            return Err(DomainError::configuration("cache.max_size must be at least 1"));
        }

        if self.max_embedding_cache_size == 0 {
            return Err(DomainError::configuration(
                "cache.max_embedding_cache_size must be at least 1",
            ));
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(DomainError::configuration(format!(
                "cache.similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.prewarm_concurrency == 0 {
            return Err(DomainError::configuration(
                "cache.prewarm_concurrency must be at least 1",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();

        assert_eq!(config.max_size, 1000);
        assert_eq!(config.max_embedding_cache_size, 5000);
        assert!((config.similarity_threshold - 0.85).abs() < f32::EPSILON);
        assert!(config.ttl().is_none());
        assert_eq!(config.generation_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_max_size(10)
            .with_max_embedding_cache_size(20)
            .with_similarity_threshold(0.9)
            .with_ttl(Duration::from_secs(60))
            .with_generation_timeout(Duration::from_secs(5))
            .with_prewarm_concurrency(2);

        assert_eq!(config.max_size, 10);
        assert_eq!(config.max_embedding_cache_size, 20);
        assert!((config.similarity_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.ttl(), Some(Duration::from_secs(60)));
        assert_eq!(config.generation_timeout_secs, 5);
        assert_eq!(config.prewarm_concurrency, 2);
    }

    #[test]
    fn test_similarity_threshold_clamped() {
        let config = CacheConfig::new().with_similarity_threshold(1.5);
        assert!((config.similarity_threshold - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CacheConfig::new().with_max_size(0).validate().is_err());
        assert!(CacheConfig::new().with_max_embedding_cache_size(0).validate().is_err());
        assert!(CacheConfig::new().with_similarity_threshold(0.0).validate().is_err());
        assert!(CacheConfig::new().with_prewarm_concurrency(0).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"max_size": 3, "ttl_secs": 120}"#).unwrap();

        assert_eq!(config.max_size, 3);
        assert_eq!(config.ttl(), Some(Duration::from_secs(120)));
        assert_eq!(config.max_embedding_cache_size, 5000);
    }
}
