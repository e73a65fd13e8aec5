//! Cached answer entry

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::generation::GeneratedAnswer;

/// One cached answer together with the embedding of the query it answers
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    key: String,
    answer: GeneratedAnswer,
    embedding: Vec<f32>,
    category: Option<String>,
    difficulty: Option<String>,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    hit_count: u64,
    /// Store-assigned access sequence; breaks ties between equal timestamps
    access_seq: u64,
}

impl CacheEntry {
    /// Create a new entry keyed by an already-normalized query
    pub fn new(key: impl Into<String>, answer: GeneratedAnswer, embedding: Vec<f32>) -> Self {
        let now = Utc::now();

        Self {
            key: key.into(),
            answer,
            embedding,
            category: None,
            difficulty: None,
            created_at: now,
            last_accessed_at: now,
            expires_at: None,
            hit_count: 0,
            access_seq: 0,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Option<String>) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Expire the entry `ttl` after its creation time
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| self.created_at + ttl);
        self
    }

    /// Override the creation time (used when restoring snapshots)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        if let Some(expires_at) = self.expires_at {
            self.expires_at = Some(created_at + (expires_at - self.created_at));
        }
        self.created_at = created_at;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn answer(&self) -> &GeneratedAnswer {
        &self.answer
    }

    pub fn into_answer(self) -> GeneratedAnswer {
        self.answer
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.difficulty.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Record a hit: bump the counter and refresh recency
    pub fn touch(&mut self, now: DateTime<Utc>, seq: u64) {
        self.hit_count += 1;
        self.last_accessed_at = now;
        self.access_seq = seq;
    }

    /// Stamp the entry as just written by the store
    pub(crate) fn mark_stored(&mut self, now: DateTime<Utc>, seq: u64) {
        self.last_accessed_at = now;
        self.access_seq = seq;
    }

    /// Carry hit history over from the entry this one replaces
    pub(crate) fn inherit_hits(&mut self, previous: &CacheEntry) {
        self.hit_count = previous.hit_count;
    }

    /// Eviction order: oldest access first, then fewest hits
    pub(crate) fn eviction_rank(&self) -> (DateTime<Utc>, u64, u64) {
        (self.last_accessed_at, self.hit_count, self.access_seq)
    }
}
