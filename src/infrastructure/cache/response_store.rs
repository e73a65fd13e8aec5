//! Bounded in-memory store of cached answers with LRU eviction

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use crate::domain::cag::{find_best_match, CacheEntry, MatchFilter};
use crate::domain::DomainError;

use super::lru::lru_victim;

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    /// Monotonic access counter; orders accesses within the same instant
    seq: u64,
    /// Embedding length shared by all entries, fixed by the first insert
    dimension: Option<usize>,
}

impl StoreState {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn purge_expired(&mut self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    /// Insert or replace, evicting LRU entries while at capacity.
    /// Returns the number of entries evicted.
    fn insert(&mut self, mut entry: CacheEntry, max_size: usize) -> usize {
        let seq = self.next_seq();
        entry.mark_stored(Utc::now(), seq);

        if let Some(previous) = self.entries.get(entry.key()) {
            entry.inherit_hits(previous);
            self.entries.insert(entry.key().to_string(), entry);
            return 0;
        }

        if self.entries.len() >= max_size {
            self.purge_expired();
        }

        let mut evicted = 0;

        while self.entries.len() >= max_size {
            let Some(victim) = lru_victim(&self.entries, CacheEntry::eviction_rank) else {
                break;
            };
            self.entries.remove(&victim);
            evicted += 1;
        }

        if self.dimension.is_none() {
            self.dimension = Some(entry.embedding().len());
        }

        self.entries.insert(entry.key().to_string(), entry);
        evicted
    }
}

/// Bounded key-value store of cached answers
///
/// A single mutex guards entries, recency and the dimension invariant, so
/// concurrent puts and evictions cannot interleave.
#[derive(Debug)]
pub struct ResponseStore {
    state: Mutex<StoreState>,
    max_size: usize,
    ttl: Option<Duration>,
}

impl ResponseStore {
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            max_size: max_size.max(1),
            ttl,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, DomainError> {
        self.state
            .lock()
            .map_err(|e| DomainError::internal(format!("Response store lock poisoned: {}", e)))
    }

    /// Look up a live entry; a hit refreshes recency and bumps its hit count.
    /// Expired entries are removed on the way.
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>, DomainError> {
        let mut state = self.state()?;
        let now = Utc::now();

        let expired = match state.entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            state.entries.remove(key);
            return Ok(None);
        }

        let seq = state.next_seq();
        Ok(state.entries.get_mut(key).map(|entry| {
            entry.touch(now, seq);
            entry.clone()
        }))
    }

    /// Insert an entry, evicting the least recently used one when full.
    /// Returns how many entries were evicted.
    pub fn put(&self, entry: CacheEntry) -> Result<usize, DomainError> {
        let mut state = self.state()?;

        if let Some(dimension) = state.dimension {
            if entry.embedding().len() != dimension {
                return Err(DomainError::internal(format!(
                    "Embedding dimension mismatch for '{}': store uses {}, entry has {}",
                    entry.key(),
                    dimension,
                    entry.embedding().len()
                )));
            }
        }

        Ok(state.insert(entry, self.max_size))
    }

    /// Insert a batch under one lock. Either every entry is inserted or,
    /// on a dimension mismatch, none is.
    pub fn put_many(&self, entries: Vec<CacheEntry>) -> Result<usize, DomainError> {
        let mut state = self.state()?;
        let expected = state
            .dimension
            .or_else(|| entries.first().map(|entry| entry.embedding().len()));

        if let Some(dimension) = expected {
            if let Some(bad) = entries.iter().find(|e| e.embedding().len() != dimension) {
                return Err(DomainError::snapshot_validation(format!(
                    "Embedding dimension mismatch for '{}': expected {}, got {}",
                    bad.key(),
                    dimension,
                    bad.embedding().len()
                )));
            }
        }

        Ok(entries
            .into_iter()
            .map(|entry| state.insert(entry, self.max_size))
            .sum())
    }

    pub fn remove(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.state()?.entries.remove(key).is_some())
    }

    /// Copies of all live entries
    pub fn all_entries(&self) -> Result<Vec<CacheEntry>, DomainError> {
        let state = self.state()?;
        let now = Utc::now();

        Ok(state
            .entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
            .collect())
    }

    /// Scan live entries for the closest embedding without touching recency
    pub fn best_match(
        &self,
        query_vector: &[f32],
        filter: &MatchFilter,
    ) -> Result<Option<(CacheEntry, f32)>, DomainError> {
        let state = self.state()?;
        let now = Utc::now();
        let live = state.entries.values().filter(|entry| !entry.is_expired_at(now));

        Ok(find_best_match(query_vector, live, filter).map(|m| (m.entry.clone(), m.score)))
    }

    /// Count a hit on an entry found by similarity search
    pub fn record_hit(&self, key: &str) -> Result<bool, DomainError> {
        let mut state = self.state()?;
        let seq = state.next_seq();

        Ok(match state.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(Utc::now(), seq);
                true
            }
            None => false,
        })
    }

    pub fn size(&self) -> Result<usize, DomainError> {
        Ok(self.state()?.entries.len())
    }

    pub fn dimension(&self) -> Result<Option<usize>, DomainError> {
        Ok(self.state()?.dimension)
    }

    /// Remove every entry; the dimension is forgotten with them
    pub fn clear(&self) -> Result<usize, DomainError> {
        let mut state = self.state()?;
        let removed = state.entries.len();
        state.entries.clear();
        state.dimension = None;
        Ok(removed)
    }

    /// Eagerly drop TTL-expired entries
    pub fn cleanup_expired(&self) -> Result<usize, DomainError> {
        Ok(self.state()?.purge_expired())
    }
}
