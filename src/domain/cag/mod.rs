//! Cache-augmented generation domain
//!
//! Types shared by the response store, the embedding cache and the engine:
//! entries, configuration, key normalization, query results, statistics,
//! snapshots and the similarity search over cached embeddings.

mod config;
mod entry;
mod key;
mod query;
mod similarity;
mod snapshot;
mod stats;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use key::{normalize_query, truncate_for_log};
pub use query::{CacheHit, CagRequest, CagResult};
pub use similarity::{find_best_match, MatchFilter, SimilarityMatch};
pub use snapshot::{CacheSnapshot, SnapshotEntry, ValidatedSnapshot, SNAPSHOT_VERSION};
pub use stats::{CacheStatistics, CacheStatsView, PrewarmReport};
