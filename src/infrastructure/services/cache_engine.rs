//! Cache-augmented generation engine
//!
//! Answers queries from the response store when it can (exact key first,
//! then the closest cached embedding), and otherwise runs the generation
//! pipeline once per key, storing the result for later callers.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::domain::cag::{
    normalize_query, truncate_for_log, CacheConfig, CacheEntry, CacheHit, CacheSnapshot,
    CacheStatistics, CacheStatsView, CagRequest, CagResult, MatchFilter, PrewarmReport,
};
use crate::domain::embedding::{is_finite_vector, EmbeddingProvider};
use crate::domain::generation::{GeneratedAnswer, GenerationPipeline};
use crate::domain::DomainError;
use crate::infrastructure::cache::{EmbeddingCache, RequestCoalescer, ResponseStore};
use crate::infrastructure::observability::{
    record_cache_evictions, record_cache_query, record_cache_sizes, record_embedding_error,
    record_pipeline_error,
};

const LOG_QUERY_CHARS: usize = 50;

/// Counts reported by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub embeddings: usize,
    pub evicted: usize,
}

/// Orchestrates lookups, generation, storage and statistics for one cache
pub struct CacheEngine {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    pipeline: Arc<dyn GenerationPipeline>,
    config: CacheConfig,
    responses: ResponseStore,
    embeddings: EmbeddingCache,
    stats: Mutex<CacheStatistics>,
    coalescer: RequestCoalescer<GeneratedAnswer>,
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("embedding_provider", &self.embedding_provider.provider_name())
            .field("config", &self.config)
            .field("responses", &self.responses)
            .field("embeddings", &self.embeddings)
            .finish_non_exhaustive()
    }
}

impl CacheEngine {
    /// Create an engine with default configuration
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        pipeline: Arc<dyn GenerationPipeline>,
    ) -> Self {
        Self::with_config(embedding_provider, pipeline, CacheConfig::default())
    }

    pub fn with_config(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        pipeline: Arc<dyn GenerationPipeline>,
        config: CacheConfig,
    ) -> Self {
        Self {
            responses: ResponseStore::new(config.max_size, config.ttl()),
            embeddings: EmbeddingCache::new(config.max_embedding_cache_size),
            stats: Mutex::new(CacheStatistics::new()),
            coalescer: RequestCoalescer::new(),
            embedding_provider,
            pipeline,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn stats(&self) -> Result<MutexGuard<'_, CacheStatistics>, DomainError> {
        self.stats
            .lock()
            .map_err(|e| DomainError::internal(format!("Statistics lock poisoned: {}", e)))
    }

    /// Answer a query: exact lookup, semantic lookup, then generation
    #[instrument(skip(self, request), fields(query = %truncate_for_log(&request.query, LOG_QUERY_CHARS)))]
    pub async fn query(&self, request: CagRequest) -> Result<CagResult, DomainError> {
        let started = Instant::now();

        let key = match self.normalize(&request) {
            Ok(key) => key,
            Err(e) => {
                self.stats()?.record_rejected();
                return Err(e);
            }
        };

        let mut query_vector = None;

        if request.use_cache {
            if let Some(entry) = self.responses.get(&key)? {
                debug!(key = %truncate_for_log(&key, LOG_QUERY_CHARS), "Exact cache hit");
                return self.respond(entry.into_answer(), CacheHit::Exact, started);
            }

            query_vector = self.query_embedding(&key).await?;

            if let Some(ref vector) = query_vector {
                let filter = MatchFilter::new(request.category.clone(), request.difficulty.clone());

                if let Some((entry, score)) = self.responses.best_match(vector, &filter)? {
                    if score >= self.config.similarity_threshold {
                        debug!(
                            matched = %truncate_for_log(entry.key(), LOG_QUERY_CHARS),
                            similarity = score,
                            "Semantic cache hit"
                        );
                        self.responses.record_hit(entry.key())?;
                        return self.respond(
                            entry.into_answer(),
                            CacheHit::Semantic { similarity: score },
                            started,
                        );
                    }

                    debug!(best = score, threshold = self.config.similarity_threshold, "Closest entry below threshold");
                }
            }
        }

        let answer = match self.generate(&key, &request).await {
            Ok(answer) => answer,
            Err(e) => {
                self.stats()?.record_failed_generation(started.elapsed());
                record_pipeline_error(e.is_timeout());
                warn!(error = %e, "Generation failed");
                return Err(e);
            }
        };

        if request.use_cache {
            self.store(&key, &request, &answer, query_vector).await?;
        }

        self.respond(answer, CacheHit::Miss, started)
    }

    fn normalize(&self, request: &CagRequest) -> Result<String, DomainError> {
        request
            .validate()
            .map_err(|e| DomainError::invalid_query(e.to_string()))?;

        normalize_query(&request.query)
    }

    fn respond(
        &self,
        answer: GeneratedAnswer,
        hit: CacheHit,
        started: Instant,
    ) -> Result<CagResult, DomainError> {
        let processing_time = started.elapsed();

        self.stats()?.record_query(hit, processing_time);
        record_cache_query(hit.as_str(), processing_time);

        Ok(CagResult {
            answer,
            hit,
            processing_time,
        })
    }

    /// Embedding for a normalized key, from the embedding cache or the provider.
    /// Provider failures degrade to `None` and are counted.
    async fn query_embedding(&self, key: &str) -> Result<Option<Vec<f32>>, DomainError> {
        if let Some(vector) = self.embeddings.get(key)? {
            return Ok(Some(vector));
        }

        let vector = match self.embedding_provider.embed(key).await {
            Ok(vector) if !vector.is_empty() && is_finite_vector(&vector) => vector,
            Ok(_) => {
                self.note_embedding_failure("provider returned an empty or non-finite vector")?;
                return Ok(None);
            }
            Err(e) => {
                self.note_embedding_failure(&e.to_string())?;
                return Ok(None);
            }
        };

        let evicted = self.embeddings.put(key, vector.clone())?;

        if evicted > 0 {
            self.stats()?.record_embedding_evictions(evicted);
            record_cache_evictions("embeddings", evicted);
        }

        Ok(Some(vector))
    }

    fn note_embedding_failure(&self, reason: &str) -> Result<(), DomainError> {
        self.stats()?.record_embedding_error();
        record_embedding_error();
        warn!(
            provider = self.embedding_provider.provider_name(),
            reason, "Embedding unavailable, skipping semantic lookup"
        );
        Ok(())
    }

    /// Run the pipeline through the coalescer, bounded by the request or default timeout.
    /// The bound applies to this caller's wait as well as to the shared attempt,
    /// so joining a slower in-flight generation cannot extend it.
    async fn generate(
        &self,
        key: &str,
        request: &CagRequest,
    ) -> Result<GeneratedAnswer, DomainError> {
        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.generation_timeout());
        let generation = request.to_generation_request();
        let pipeline = self.pipeline.clone();

        let producer = async move {
            match tokio::time::timeout(timeout, pipeline.generate(&generation)).await {
                Ok(outcome) => outcome.map_err(as_pipeline_error),
                Err(_) => Err(timed_out(timeout)),
            }
        };

        let slot_key = coalescing_key(key, request);
        let shared = self.coalescer.run_exclusive(&slot_key, producer);

        tokio::time::timeout(timeout, shared)
            .await
            .unwrap_or_else(|_| Err(timed_out(timeout)))
    }

    /// Store a freshly generated answer, reusing the lookup embedding when there is one
    async fn store(
        &self,
        key: &str,
        request: &CagRequest,
        answer: &GeneratedAnswer,
        query_vector: Option<Vec<f32>>,
    ) -> Result<(), DomainError> {
        let vector = match query_vector {
            Some(vector) => Some(vector),
            None => self.query_embedding(key).await?,
        };

        let Some(vector) = vector else {
            warn!(key = %truncate_for_log(key, LOG_QUERY_CHARS), "No embedding available, answer not cached");
            return Ok(());
        };

        let entry = CacheEntry::new(key, answer.clone(), vector)
            .with_category(request.category.clone())
            .with_difficulty(request.difficulty.clone())
            .with_ttl(self.config.ttl());

        match self.responses.put(entry) {
            Ok(evicted) => {
                if evicted > 0 {
                    self.stats()?.record_evictions(evicted);
                    record_cache_evictions("responses", evicted);
                    debug!(evicted, "Evicted least recently used entries");
                }
            }
            Err(e) => warn!(error = %e, "Answer not cached"),
        }

        Ok(())
    }

    /// Current statistics plus store sizes
    pub fn get_cache_stats(&self) -> Result<CacheStatsView, DomainError> {
        let cache_size = self.responses.size()?;
        let embedding_cache_size = self.embeddings.size()?;
        record_cache_sizes(cache_size, embedding_cache_size);

        Ok(self.stats()?.view(cache_size, embedding_cache_size))
    }

    /// Empty both stores; statistics are kept
    pub fn clear_cache(&self) -> Result<(), DomainError> {
        let responses = self.responses.clear()?;
        let embeddings = self.embeddings.clear()?;
        record_cache_sizes(0, 0);

        info!(responses, embeddings, "Cache cleared");
        Ok(())
    }

    /// Remove the entry for one query from both stores.
    /// Returns whether a cached answer existed.
    pub fn invalidate(&self, query: &str) -> Result<bool, DomainError> {
        let key = normalize_query(query)?;
        let removed = self.responses.remove(&key)?;
        self.embeddings.remove(&key)?;

        debug!(key = %truncate_for_log(&key, LOG_QUERY_CHARS), removed, "Cache entry invalidated");
        Ok(removed)
    }

    /// Eagerly drop expired answers
    pub fn cleanup_expired(&self) -> Result<usize, DomainError> {
        let removed = self.responses.cleanup_expired()?;

        if removed > 0 {
            debug!(removed, "Expired cache entries removed");
        }

        Ok(removed)
    }

    /// Run every query through the normal lifecycle with caching enabled.
    /// Queries that normalize to a key already in the batch run once and
    /// the repeats are reported as already cached.
    pub async fn pre_warm_cache(&self, queries: Vec<String>) -> PrewarmReport {
        let requested = queries.len();
        let mut seen = HashSet::new();
        let queries: Vec<String> = queries
            .into_iter()
            .filter(|query| match normalize_query(query) {
                Ok(key) => seen.insert(key),
                Err(_) => true,
            })
            .collect();

        let mut report = PrewarmReport {
            requested,
            already_cached: requested - queries.len(),
            ..Default::default()
        };
        let max_results = self.config.default_max_results;
        let concurrency = self.config.prewarm_concurrency.max(1);

        let outcomes: Vec<(String, Result<CagResult, DomainError>)> = stream::iter(queries)
            .map(|query| async move {
                let request = CagRequest::new(query.clone()).with_max_results(max_results);
                let outcome = self.query(request).await;
                (query, outcome)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (query, outcome) in outcomes {
            match outcome {
                Ok(result) if result.cached() => report.already_cached += 1,
                Ok(_) => report.warmed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(query = %truncate_for_log(&query, LOG_QUERY_CHARS), error = %e, "Pre-warm query failed");
                }
            }
        }

        info!(
            requested = report.requested,
            warmed = report.warmed,
            already_cached = report.already_cached,
            failed = report.failed,
            "Cache pre-warm finished"
        );

        report
    }

    /// Copy all live entries and cached embeddings into a snapshot
    pub fn export_cache(&self) -> Result<CacheSnapshot, DomainError> {
        let entries = self.responses.all_entries()?;
        let embeddings = self.embeddings.entries()?;
        let snapshot = CacheSnapshot::from_parts(&entries, embeddings);

        info!(entries = snapshot.len(), "Cache exported");
        Ok(snapshot)
    }

    /// Validate a snapshot and merge it into the stores.
    /// Nothing is written unless the whole snapshot is valid.
    pub fn import_cache(&self, snapshot: CacheSnapshot) -> Result<ImportSummary, DomainError> {
        let validated = snapshot.validate(self.responses.dimension()?, self.config.ttl())?;

        let imported = validated.entries.len();
        let evicted = self.responses.put_many(validated.entries)?;

        let mut embedding_evictions = 0;
        let embeddings = validated.embeddings.len();

        for (key, vector) in validated.embeddings {
            embedding_evictions += self.embeddings.put(key, vector)?;
        }

        {
            let mut stats = self.stats()?;
            stats.record_evictions(evicted);
            stats.record_embedding_evictions(embedding_evictions);
        }
        record_cache_evictions("responses", evicted);
        record_cache_evictions("embeddings", embedding_evictions);

        info!(imported, embeddings, evicted, "Cache imported");

        Ok(ImportSummary {
            imported,
            embeddings,
            evicted,
        })
    }

    /// Periodically remove expired entries while the engine is alive.
    /// Returns `None` when TTL is disabled.
    pub fn spawn_expiry_sweep(self: &Arc<Self>, every: Duration) -> Option<JoinHandle<()>> {
        self.config.ttl()?;

        let engine: Weak<Self> = Arc::downgrade(self);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;

            loop {
                interval.tick().await;

                let Some(engine) = engine.upgrade() else {
                    break;
                };

                if let Err(e) = engine.cleanup_expired() {
                    warn!(error = %e, "Expired entry sweep failed");
                }
            }
        }))
    }
}

/// Coalescing scope: the normalized key plus the tags that scope its answer
fn coalescing_key(key: &str, request: &CagRequest) -> String {
    format!(
        "{}\u{1f}{}\u{1f}{}",
        key,
        request.category.as_deref().unwrap_or_default(),
        request.difficulty.as_deref().unwrap_or_default()
    )
}

fn timed_out(timeout: Duration) -> DomainError {
    DomainError::pipeline_timeout(format!(
        "generation did not finish within {} ms",
        timeout.as_millis()
    ))
}

fn as_pipeline_error(error: DomainError) -> DomainError {
    match error {
        DomainError::Pipeline { .. } => error,
        DomainError::Provider { provider, message } => {
            DomainError::pipeline(format!("{} provider error: {}", provider, message))
        }
        other => DomainError::pipeline(other.to_string()),
    }
}
