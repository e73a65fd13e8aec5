//! Generated answer payload

use serde::{Deserialize, Serialize};

/// Answer produced by the generation pipeline
///
/// This is also the payload the cache stores and replays on hits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub response: String,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub code_examples: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub confidence: f32,
}

impl GeneratedAnswer {
    pub fn new(response: impl Into<String>, confidence: f32) -> Self {
        Self {
            response: response.into(),
            confidence: confidence.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    pub fn with_techniques(mut self, techniques: Vec<String>) -> Self {
        self.techniques = techniques;
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_code_examples(mut self, code_examples: Vec<String>) -> Self {
        self.code_examples = code_examples;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }
}
