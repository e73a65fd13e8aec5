//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, EmbeddingProviderKind, EmbeddingSettings, GenerationSettings, LogFormat,
    LoggingConfig, ServerConfig, SnapshotSettings,
};
