//! Offline embedding provider based on feature hashing
//!
//! Each lower-cased word and word bigram is hashed with SHA-256 into one of
//! `dimensions` buckets with a hash-derived sign, and the result is
//! L2-normalized. Texts sharing vocabulary get high cosine similarity, which
//! is enough for paraphrase-level semantic hits without a network service.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::embedding::EmbeddingProvider;
use crate::domain::DomainError;

pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

static TOKEN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").ok());

/// Deterministic local embeddings; never fails for non-empty text
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn tokens(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();

        match TOKEN.as_ref() {
            Some(re) => re.find_iter(&lowered).map(|m| m.as_str().to_string()).collect(),
            None => lowered.split_whitespace().map(String::from).collect(),
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);

        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };

        vector[bucket] += sign * weight;
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let tokens = Self::tokens(text);
        let mut vector = vec![0.0f32; self.dimensions];

        for token in &tokens {
            self.add_feature(&mut vector, token, 1.0);
        }

        for pair in tokens.windows(2) {
            self.add_feature(&mut vector, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let vector = self.vectorize(text);

        if vector.iter().all(|v| *v == 0.0) {
            return Err(DomainError::embedding_service(
                "text has no tokens to embed",
            ));
        }

        Ok(vector)
    }

    fn provider_name(&self) -> &'static str {
        "hashing"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_vectors_are_normalized_and_deterministic() {
        let provider = HashingEmbeddingProvider::new(64);

        let a = provider.embed("what is sql injection?").await.unwrap();
        let b = provider.embed("what is sql injection?").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = HashingEmbeddingProvider::default();

        let base = provider.embed("how to prevent sql injection").await.unwrap();
        let close = provider.embed("how to prevent sql injection attacks").await.unwrap();
        let far = provider.embed("configure kerberos delegation").await.unwrap();

        assert!(cosine_similarity(&base, &close) > cosine_similarity(&base, &far));
        assert!(cosine_similarity(&base, &close) > 0.8);
    }

    #[tokio::test]
    async fn test_punctuation_only_fails() {
        let provider = HashingEmbeddingProvider::default();

        assert!(matches!(
            provider.embed("?!...").await,
            Err(DomainError::EmbeddingService { .. })
        ));
    }

    #[test]
    fn test_provider_info() {
        let provider = HashingEmbeddingProvider::new(0);
        assert_eq!(provider.provider_name(), "hashing");
        assert_eq!(provider.dimensions(), Some(1));
    }
}
