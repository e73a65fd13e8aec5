//! Generation request type

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Input handed to the generation pipeline on a cache miss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Original (un-normalized) query text
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub max_results: usize,
    pub include_code: bool,
    pub include_techniques: bool,
    /// Free-form context; ordered so prompt construction is deterministic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, serde_json::Value>>,
}

impl GenerationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
            difficulty: None,
            max_results: 5,
            include_code: true,
            include_techniques: true,
            context: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_context(mut self, context: BTreeMap<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = GenerationRequest::new("What is XSS?")
            .with_category("web")
            .with_difficulty("beginner")
            .with_max_results(3);

        assert_eq!(request.query, "What is XSS?");
        assert_eq!(request.category.as_deref(), Some("web"));
        assert_eq!(request.difficulty.as_deref(), Some("beginner"));
        assert_eq!(request.max_results, 3);
        assert!(request.include_code);
        assert!(request.context.is_none());
    }
}
