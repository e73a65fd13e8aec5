use thiserror::Error;

/// Core domain errors
///
/// `Clone` so that a single pipeline failure can be handed to every caller
/// waiting on the same coalesced generation.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Embedding service error: {message}")]
    EmbeddingService { message: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String, timed_out: bool },

    #[error("Snapshot validation error: {message}")]
    SnapshotValidation { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    pub fn embedding_service(message: impl Into<String>) -> Self {
        Self::EmbeddingService {
            message: message.into(),
        }
    }

    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn pipeline_timeout(message: impl Into<String>) -> Self {
        Self::Pipeline {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn snapshot_validation(message: impl Into<String>) -> Self {
        Self::SnapshotValidation {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from a generation call that exceeded its timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Pipeline { timed_out: true, .. })
    }
}
