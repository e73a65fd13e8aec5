//! JSON-over-HTTP transport shared by the embedding and generation adapters

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::domain::cag::truncate_for_log;
use crate::domain::DomainError;

/// Upstream error bodies are cut to this many characters before they reach logs or callers
const ERROR_BODY_CHARS: usize = 300;

const TRANSPORT: &str = "http";

#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    /// POST `body` as JSON and decode the JSON reply. Non-2xx replies are errors.
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client whose every request (connect through body) is bounded by `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map(|client| Self { client })
            .map_err(|e| DomainError::configuration(format!("Cannot build HTTP client: {}", e)))
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let request = headers
            .into_iter()
            .fold(self.client.post(url), |req, (name, value)| req.header(name, value))
            .json(body);

        let response = request.send().await.map_err(|e| send_error(url, e))?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        response.json().await.map_err(|e| {
            DomainError::provider(TRANSPORT, format!("Undecodable reply from {}: {}", url, e))
        })
    }
}

fn send_error(url: &str, e: reqwest::Error) -> DomainError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "could not connect"
    } else {
        "failed"
    };

    DomainError::provider(TRANSPORT, format!("POST {} {}: {}", url, kind, e))
}

fn status_error(status: StatusCode, body: &str) -> DomainError {
    let body = body.trim();
    let detail = if body.is_empty() {
        status.canonical_reason().unwrap_or("no body").to_string()
    } else {
        truncate_for_log(body, ERROR_BODY_CHARS)
    };

    DomainError::provider(TRANSPORT, format!("HTTP {}: {}", status.as_u16(), detail))
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Canned responses and errors keyed by URL; remembers the last body sent
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        responses: RwLock<HashMap<String, serde_json::Value>>,
        errors: RwLock<HashMap<String, String>>,
        last_body: RwLock<Option<serde_json::Value>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.write().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_error(self, url: impl Into<String>, error: impl Into<String>) -> Self {
            self.errors.write().unwrap().insert(url.into(), error.into());
            self
        }

        pub fn last_body(&self) -> Option<serde_json::Value> {
            self.last_body.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, DomainError> {
            *self.last_body.write().unwrap() = Some(body.clone());

            if let Some(error) = self.errors.read().unwrap().get(url) {
                return Err(DomainError::provider("mock", error));
            }

            self.responses
                .read()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| DomainError::provider("mock", format!("No mock response for {}", url)))
        }
    }
}
