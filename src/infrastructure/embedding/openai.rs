//! OpenAI-compatible embedding provider

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::embedding::EmbeddingProvider;
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Known OpenAI embedding models and their dimensions
const EMBEDDING_MODELS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

/// Embeds query text through an OpenAI-compatible `/v1/embeddings` endpoint
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    dimensions: Option<usize>,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, model, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            model: model.into(),
            dimensions: None,
        }
    }

    /// Request shortened vectors (supported by the text-embedding-3 family)
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, text: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        if let Some(dims) = self.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<f32>, DomainError> {
        let response: OpenAiEmbeddingResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::embedding_service(format!("Failed to parse embedding response: {}", e))
        })?;

        response
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| DomainError::embedding_service("No embedding returned"))
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let body = self.build_request(text);

        let response = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body)
            .await
            .map_err(|e| DomainError::embedding_service(e.to_string()))?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions.or_else(|| {
            EMBEDDING_MODELS
                .iter()
                .find(|(name, _)| *name == self.model)
                .map(|(_, dims)| *dims)
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/embeddings";
    const MODEL: &str = "text-embedding-3-small";

    fn create_mock_response(dimensions: usize) -> serde_json::Value {
        let embedding: Vec<f32> = (0..dimensions).map(|j| j as f32 * 0.001).collect();

        serde_json::json!({
            "object": "list",
            "model": MODEL,
            "data": [{"index": 0, "embedding": embedding, "object": "embedding"}],
            "usage": {"prompt_tokens": 5, "total_tokens": 5}
        })
    }

    #[tokio::test]
    async fn test_embed_text() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(1536));
        let provider = OpenAiEmbeddingProvider::new(client, "test-api-key", MODEL);

        let vector = provider.embed("what is sql injection?").await.unwrap();

        assert_eq!(vector.len(), 1536);
        assert_eq!(vector[1], 0.001);
    }

    #[tokio::test]
    async fn test_request_body() {
        let client = MockHttpClient::new().with_response(TEST_URL, create_mock_response(256));
        let provider =
            OpenAiEmbeddingProvider::new(client, "test-api-key", MODEL).with_dimensions(256);

        provider.embed("hello").await.unwrap();
        let body = provider.client.last_body().unwrap();

        assert_eq!(body["model"], MODEL);
        assert_eq!(body["input"], "hello");
        assert_eq!(body["dimensions"], 256);
    }

    #[tokio::test]
    async fn test_transport_error_is_embedding_error() {
        let client = MockHttpClient::new().with_error(TEST_URL, "Rate limit exceeded");
        let provider = OpenAiEmbeddingProvider::new(client, "test-api-key", MODEL);

        let result = provider.embed("hello").await;

        assert!(matches!(result, Err(DomainError::EmbeddingService { .. })));
    }

    #[tokio::test]
    async fn test_empty_data_is_error() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, serde_json::json!({"data": [], "model": MODEL}));
        let provider = OpenAiEmbeddingProvider::new(client, "test-api-key", MODEL);

        assert!(provider.embed("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/embeddings";
        let client = MockHttpClient::new().with_response(custom_url, create_mock_response(8));
        let provider = OpenAiEmbeddingProvider::with_base_url(
            client,
            "test-key",
            MODEL,
            "http://localhost:8080/",
        );

        assert_eq!(provider.embed("Test").await.unwrap().len(), 8);
    }

    #[test]
    fn test_provider_info() {
        let provider = OpenAiEmbeddingProvider::new(MockHttpClient::new(), "k", MODEL);
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.dimensions(), Some(1536));

        let large =
            OpenAiEmbeddingProvider::new(MockHttpClient::new(), "k", "text-embedding-3-large");
        assert_eq!(large.dimensions(), Some(3072));

        let custom = OpenAiEmbeddingProvider::new(MockHttpClient::new(), "k", "local-model");
        assert_eq!(custom.dimensions(), None);
        assert_eq!(custom.with_dimensions(64).dimensions(), Some(64));
    }
}
