//! Hit/miss accounting

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CacheHit;

/// Running counters owned by one cache engine
///
/// Starts at zero, is updated once per query and is never reset by
/// clearing the cache contents.
#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    total_queries: u64,
    hits: u64,
    misses: u64,
    exact_hits: u64,
    semantic_hits: u64,
    failed_queries: u64,
    embedding_errors: u64,
    evictions: u64,
    embedding_evictions: u64,
    total_processing_time: Duration,
    semantic_similarity_sum: f64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query that produced a result
    pub fn record_query(&mut self, hit: CacheHit, elapsed: Duration) {
        self.total_queries += 1;
        self.total_processing_time += elapsed;

        match hit {
            CacheHit::Exact => {
                self.hits += 1;
                self.exact_hits += 1;
            }
            CacheHit::Semantic { similarity } => {
                self.hits += 1;
                self.semantic_hits += 1;
                self.semantic_similarity_sum += similarity as f64;
            }
            CacheHit::Miss => self.misses += 1,
        }
    }

    /// Record a query that missed the cache and then failed in generation
    pub fn record_failed_generation(&mut self, elapsed: Duration) {
        self.total_queries += 1;
        self.misses += 1;
        self.failed_queries += 1;
        self.total_processing_time += elapsed;
    }

    /// Record a query rejected before it reached the cache
    pub fn record_rejected(&mut self) {
        self.total_queries += 1;
        self.failed_queries += 1;
    }

    pub fn record_embedding_error(&mut self) {
        self.embedding_errors += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_embedding_evictions(&mut self, count: usize) {
        self.embedding_evictions += count as u64;
    }

    pub fn total_queries(&self) -> u64 {
        self.total_queries
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }

        self.hits as f64 / self.total_queries as f64
    }

    pub fn avg_processing_time(&self) -> Duration {
        if self.total_queries == 0 {
            return Duration::ZERO;
        }

        let nanos = self.total_processing_time.as_nanos() / u128::from(self.total_queries);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn avg_semantic_similarity(&self) -> f64 {
        if self.semantic_hits == 0 {
            return 0.0;
        }

        self.semantic_similarity_sum / self.semantic_hits as f64
    }

    /// Build the read-only view, adding the current store sizes
    pub fn view(&self, cache_size: usize, embedding_cache_size: usize) -> CacheStatsView {
        CacheStatsView {
            total_queries: self.total_queries,
            hits: self.hits,
            misses: self.misses,
            exact_hits: self.exact_hits,
            semantic_hits: self.semantic_hits,
            failed_queries: self.failed_queries,
            embedding_errors: self.embedding_errors,
            evictions: self.evictions,
            embedding_evictions: self.embedding_evictions,
            hit_rate: self.hit_rate(),
            cache_size,
            embedding_cache_size,
            total_processing_time_ms: self.total_processing_time.as_secs_f64() * 1000.0,
            avg_response_time_ms: self.avg_processing_time().as_secs_f64() * 1000.0,
            avg_semantic_similarity: self.avg_semantic_similarity(),
        }
    }
}

/// Snapshot of statistics returned to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatsView {
    pub total_queries: u64,
    pub hits: u64,
    pub misses: u64,
    pub exact_hits: u64,
    pub semantic_hits: u64,
    pub failed_queries: u64,
    pub embedding_errors: u64,
    pub evictions: u64,
    pub embedding_evictions: u64,
    pub hit_rate: f64,
    pub cache_size: usize,
    pub embedding_cache_size: usize,
    pub total_processing_time_ms: f64,
    pub avg_response_time_ms: f64,
    pub avg_semantic_similarity: f64,
}

/// Outcome of a pre-warm run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrewarmReport {
    pub requested: usize,
    /// Queries that were generated and stored
    pub warmed: usize,
    /// Queries answered from the cache without generation
    pub already_cached: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_survives_counts_beyond_u32() {
        let stats = CacheStatistics {
            total_queries: 1 << 32,
            total_processing_time: Duration::from_secs(1 << 33),
            ..CacheStatistics::default()
        };

        assert_eq!(stats.avg_processing_time(), Duration::from_secs(2));
    }

    #[test]
    fn test_new_statistics_are_zero() {
        let stats = CacheStatistics::new();
        let view = stats.view(0, 0);

        assert_eq!(view.total_queries, 0);
        assert_eq!(view.hit_rate, 0.0);
        assert_eq!(view.avg_response_time_ms, 0.0);
        assert_eq!(view.avg_semantic_similarity, 0.0);
    }

    #[test]
    fn test_record_queries() {
        let mut stats = CacheStatistics::new();

        stats.record_query(CacheHit::Miss, Duration::from_millis(100));
        stats.record_query(CacheHit::Exact, Duration::from_millis(2));
        stats.record_query(CacheHit::Semantic { similarity: 0.9 }, Duration::from_millis(6));
        stats.record_query(CacheHit::Semantic { similarity: 0.8 }, Duration::from_millis(12));

        let view = stats.view(3, 4);

        assert_eq!(view.total_queries, 4);
        assert_eq!(view.hits, 3);
        assert_eq!(view.misses, 1);
        assert_eq!(view.exact_hits, 1);
        assert_eq!(view.semantic_hits, 2);
        assert!((view.hit_rate - 0.75).abs() < 1e-9);
        assert!((view.avg_response_time_ms - 30.0).abs() < 1e-6);
        assert!((view.avg_semantic_similarity - 0.85).abs() < 1e-6);
        assert_eq!(view.cache_size, 3);
        assert_eq!(view.embedding_cache_size, 4);
    }

    #[test]
    fn test_failures_count_as_queries_not_hits() {
        let mut stats = CacheStatistics::new();

        stats.record_failed_generation(Duration::from_millis(5));
        stats.record_rejected();

        assert_eq!(stats.total_queries(), 2);
        assert_eq!(stats.hits(), 0);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.view(0, 0).failed_queries, 2);
    }

    #[test]
    fn test_evictions_accumulate() {
        let mut stats = CacheStatistics::new();

        stats.record_evictions(2);
        stats.record_evictions(1);
        stats.record_embedding_evictions(4);

        let view = stats.view(0, 0);
        assert_eq!(view.evictions, 3);
        assert_eq!(view.embedding_evictions, 4);
    }
}
