use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::CacheConfig;
use crate::infrastructure::embedding::DEFAULT_HASHING_DIMENSIONS;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub snapshot: SnapshotSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How often expired entries are swept when TTL is enabled
    #[serde(default = "default_expiry_sweep_secs")]
    pub expiry_sweep_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which embedding backend turns queries into vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local feature hashing, no network access
    #[default]
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    Openai,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Vector size; required for hashing, optional for remote providers
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Optional on-disk snapshot used across restarts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub load_on_start: bool,
    #[serde(default)]
    pub save_on_shutdown: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_expiry_sweep_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            expiry_sweep_secs: default_expiry_sweep_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
            dimensions: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl EmbeddingSettings {
    /// Vector size for the hashing provider
    pub fn hashing_dimensions(&self) -> usize {
        self.dimensions.unwrap_or(DEFAULT_HASHING_DIMENSIONS)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CAG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.cache.similarity_threshold, 0.85);
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Hashing);
        assert_eq!(config.embedding.hashing_dimensions(), DEFAULT_HASHING_DIMENSIONS);
        assert!(config.snapshot.path.is_none());
        assert!(!config.snapshot.save_on_shutdown);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "cache": {"max_size": 10, "ttl_secs": 3600},
            "embedding": {"provider": "openai", "dimensions": 1536},
            "snapshot": {"path": "/var/lib/cag/cache.json", "load_on_start": true}
        }))
        .unwrap();

        assert_eq!(config.cache.max_size, 10);
        assert_eq!(config.cache.max_embedding_cache_size, 5000);
        assert_eq!(config.cache.ttl_secs, Some(3600));
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Openai);
        assert_eq!(config.embedding.dimensions, Some(1536));
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.generation.api_key_env, "OPENAI_API_KEY");
        assert!(config.snapshot.load_on_start);
        assert!(!config.snapshot.save_on_shutdown);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_log_format_parsing() {
        let config: LoggingConfig =
            serde_json::from_value(serde_json::json!({"format": "json"})).unwrap();

        assert!(matches!(config.format, LogFormat::Json));
    }

    #[test]
    fn test_unknown_embedding_provider_is_rejected() {
        let result: Result<EmbeddingSettings, _> =
            serde_json::from_value(serde_json::json!({"provider": "word2vec"}));

        assert!(result.is_err());
    }
}
