//! Query request and result types

use std::collections::BTreeMap;
use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use crate::domain::generation::{GeneratedAnswer, GenerationRequest};

/// A query submitted to the cache engine
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CagRequest {
    #[validate(length(min = 1, max = 4096))]
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 50))]
    pub max_results: usize,
    #[serde(default = "default_true")]
    pub include_code: bool,
    #[serde(default = "default_true")]
    pub include_techniques: bool,
    /// When false the cache is neither consulted nor populated
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default)]
    pub context: Option<BTreeMap<String, serde_json::Value>>,
    /// Per-request bound on the generation call; the engine default applies when absent
    #[serde(default)]
    #[validate(range(min = 1))]
    pub timeout_ms: Option<u64>,
}

fn default_max_results() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl CagRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
            difficulty: None,
            max_results: default_max_results(),
            include_code: true,
            include_techniques: true,
            use_cache: true,
            context: None,
            timeout_ms: None,
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

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_context(mut self, context: BTreeMap<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().max(1) as u64);
        self
    }

    /// The request forwarded to the generation pipeline on a miss
    pub fn to_generation_request(&self) -> GenerationRequest {
        GenerationRequest {
            query: self.query.clone(),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            max_results: self.max_results,
            include_code: self.include_code,
            include_techniques: self.include_techniques,
            context: self.context.clone(),
        }
    }
}

/// How a query was answered
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheHit {
    /// Normalized key matched a cached entry
    Exact,
    /// A cached entry's embedding scored at or above the threshold
    Semantic { similarity: f32 },
    /// Answer was generated by the pipeline
    Miss,
}

impl CacheHit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Semantic { .. } => "semantic",
            Self::Miss => "miss",
        }
    }

    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::Miss)
    }

    /// 1.0 for exact hits, the cosine score for semantic hits
    pub fn similarity_score(&self) -> Option<f32> {
        match self {
            Self::Exact => Some(1.0),
            Self::Semantic { similarity } => Some(*similarity),
            Self::Miss => None,
        }
    }
}

/// Result of one query: the answer payload joined with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct CagResult {
    pub answer: GeneratedAnswer,
    pub hit: CacheHit,
    pub processing_time: Duration,
}

impl CagResult {
    pub fn cached(&self) -> bool {
        self.hit.is_hit()
    }
}

impl Serialize for CagResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let similarity = self.hit.similarity_score();
        let field_count = if similarity.is_some() { 10 } else { 9 };
        let mut state = serializer.serialize_struct("CagResult", field_count)?;

        state.serialize_field("response", &self.answer.response)?;
        state.serialize_field("techniques", &self.answer.techniques)?;
        state.serialize_field("tools", &self.answer.tools)?;
        state.serialize_field("code_examples", &self.answer.code_examples)?;
        state.serialize_field("confidence", &self.answer.confidence)?;
        state.serialize_field("sources", &self.answer.sources)?;
        state.serialize_field("cached", &self.cached())?;
        state.serialize_field("cache_hit_type", self.hit.as_str())?;

        if let Some(score) = similarity {
            state.serialize_field("similarity_score", &score)?;
        } else {
            state.skip_field("similarity_score")?;
        }

        state.serialize_field(
            "processing_time_ms",
            &(self.processing_time.as_secs_f64() * 1000.0),
        )?;
        state.end()
    }
}
