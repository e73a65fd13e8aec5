//! OpenAI-compatible chat-completion generation pipeline

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::prompt::build_user_prompt;
use crate::domain::generation::{GeneratedAnswer, GenerationPipeline, GenerationRequest};
use crate::domain::DomainError;
use crate::infrastructure::http::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Confidence assigned when the model answers in plain text instead of JSON
const PLAIN_TEXT_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You are a security knowledge assistant. Answer the question \
using your knowledge base. Reply with a JSON object with the fields \"response\" (string), \
\"techniques\", \"tools\", \"code_examples\", \"sources\" (arrays of strings) and \
\"confidence\" (number between 0 and 1).";

/// Generates answers through an OpenAI-compatible `/v1/chat/completions` endpoint
#[derive(Debug)]
pub struct OpenAiGenerationPipeline<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl<C: HttpClientTrait> OpenAiGenerationPipeline<C> {
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
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_user_prompt(request)},
            ],
            "response_format": {"type": "json_object"},
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        request: &GenerationRequest,
    ) -> Result<GeneratedAnswer, DomainError> {
        let response: ChatResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::pipeline(format!("Failed to parse completion response: {}", e))
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DomainError::pipeline("Model returned no content"))?;

        let answer = match serde_json::from_str::<ModelAnswer>(&content) {
            Ok(parsed) => parsed.into_answer(),
            Err(e) => {
                debug!(error = %e, "Completion is not structured JSON, using it as plain text");
                GeneratedAnswer::new(content, PLAIN_TEXT_CONFIDENCE)
            }
        };

        Ok(shape_answer(answer, request))
    }
}

/// Apply the request's output limits to a model answer
fn shape_answer(mut answer: GeneratedAnswer, request: &GenerationRequest) -> GeneratedAnswer {
    let limit = request.max_results;

    answer.techniques.truncate(limit);
    answer.tools.truncate(limit);
    answer.code_examples.truncate(limit);
    answer.sources.truncate(limit);

    if !request.include_code {
        answer.code_examples.clear();
    }

    if !request.include_techniques {
        answer.techniques.clear();
    }

    answer
}

#[async_trait]
impl<C: HttpClientTrait> GenerationPipeline for OpenAiGenerationPipeline<C> {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAnswer, DomainError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post_json(&self.chat_completions_url(), self.headers(), &body)
            .await?;

        self.parse_response(response, request)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Structured answer as requested in the system prompt
#[derive(Debug, Deserialize)]
struct ModelAnswer {
    response: String,
    #[serde(default)]
    techniques: Vec<String>,
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default)]
    code_examples: Vec<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

impl ModelAnswer {
    fn into_answer(self) -> GeneratedAnswer {
        GeneratedAnswer::new(self.response, self.confidence.unwrap_or(PLAIN_TEXT_CONFIDENCE))
            .with_techniques(self.techniques)
            .with_tools(self.tools)
            .with_code_examples(self.code_examples)
            .with_sources(self.sources)
    }
}
