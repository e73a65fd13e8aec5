//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for embedding providers (OpenAI-compatible APIs, local hashing, etc.)
///
/// Implementations report failures as `DomainError::EmbeddingService` so the
/// cache engine can degrade a semantic lookup to a miss.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate the embedding vector for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the dimension of produced vectors, when known up front
    fn dimensions(&self) -> Option<usize>;
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    use super::*;

    /// Test provider with pinned vectors per text and a deterministic fallback
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimensions: usize,
        fixed: RwLock<HashMap<String, Vec<f32>>>,
        error: Option<String>,
        calls: AtomicUsize,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                fixed: RwLock::new(HashMap::new()),
                error: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Pin the vector returned for `text` (matched verbatim)
        pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.fixed.write().unwrap().insert(text.into(), vector);
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(ref error) = self.error {
                return Err(DomainError::embedding_service(error));
            }

            if let Some(vector) = self.fixed.read().unwrap().get(text) {
                return Ok(vector.clone());
            }

            // Deterministic vector derived from the text bytes
            let hash = text
                .bytes()
                .fold(7u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let vector = (0..self.dimensions)
                .map(|i| {
                    let mixed = hash.wrapping_mul(i as u64 + 1).rotate_left(i as u32 % 64);
                    ((mixed % 2000) as f32 / 1000.0) - 1.0
                })
                .collect();

            Ok(vector)
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }

        fn dimensions(&self) -> Option<usize> {
            Some(self.dimensions)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_provider_dimensions() {
            let provider = MockEmbeddingProvider::new(16);
            let vector = provider.embed("hello").await.unwrap();

            assert_eq!(vector.len(), 16);
            assert_eq!(provider.calls(), 1);
        }

        #[tokio::test]
        async fn test_mock_provider_pinned_vector() {
            let provider = MockEmbeddingProvider::new(3).with_vector("a", vec![1.0, 0.0, 0.0]);

            assert_eq!(provider.embed("a").await.unwrap(), vec![1.0, 0.0, 0.0]);
        }

        #[tokio::test]
        async fn test_mock_provider_error() {
            let provider = MockEmbeddingProvider::new(3).with_error("down");
            let result = provider.embed("a").await;

            assert!(matches!(result, Err(DomainError::EmbeddingService { .. })));
        }

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new(32);

            assert_eq!(
                provider.embed("same text").await.unwrap(),
                provider.embed("same text").await.unwrap()
            );
        }
    }
}
