//! Domain layer - Core cache types and collaborator traits

pub mod cag;
pub mod embedding;
pub mod error;
pub mod generation;

pub use cag::{
    normalize_query, CacheConfig, CacheEntry, CacheHit, CacheSnapshot, CacheStatistics,
    CacheStatsView, CagRequest, CagResult, MatchFilter, PrewarmReport, SnapshotEntry,
};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::DomainError;
pub use generation::{GeneratedAnswer, GenerationPipeline, GenerationRequest};
