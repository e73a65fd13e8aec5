//! Log output settings handed to the tracing subscriber

use crate::config::{AppConfig, LogFormat};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl From<&AppConfig> for LoggingConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            level: config.logging.level.clone(),
            format: config.logging.format.clone(),
        }
    }
}
