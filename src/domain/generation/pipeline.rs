//! Generation pipeline trait

use async_trait::async_trait;

use super::{GeneratedAnswer, GenerationRequest};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Knowledge-retrieval-and-generation pipeline invoked on a cache miss
///
/// Failures are reported as `DomainError::Pipeline` (or `Provider` for
/// transport errors, which the engine folds into a pipeline error).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationPipeline: Send + Sync {
    /// Produce a complete answer for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, DomainError>;
}
