//! Bounded text to vector cache

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::domain::DomainError;

use super::lru::lru_victim;

#[derive(Debug, Clone)]
struct EmbeddingSlot {
    vector: Vec<f32>,
    last_accessed_at: DateTime<Utc>,
    access_seq: u64,
}

impl EmbeddingSlot {
    fn rank(&self) -> (DateTime<Utc>, u64) {
        (self.last_accessed_at, self.access_seq)
    }
}

#[derive(Debug, Default)]
struct EmbeddingState {
    slots: HashMap<String, EmbeddingSlot>,
    seq: u64,
}

/// Memoizes embeddings by normalized query text
///
/// Bounded independently of the response store so a query's meaning can
/// outlive its cached answer.
#[derive(Debug)]
pub struct EmbeddingCache {
    state: Mutex<EmbeddingState>,
    max_size: usize,
}

impl EmbeddingCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(EmbeddingState::default()),
            max_size: max_size.max(1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn state(&self) -> Result<MutexGuard<'_, EmbeddingState>, DomainError> {
        self.state
            .lock()
            .map_err(|e| DomainError::internal(format!("Embedding cache lock poisoned: {}", e)))
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<f32>>, DomainError> {
        let mut state = self.state()?;
        state.seq += 1;
        let seq = state.seq;

        Ok(state.slots.get_mut(key).map(|slot| {
            slot.last_accessed_at = Utc::now();
            slot.access_seq = seq;
            slot.vector.clone()
        }))
    }

    /// Store a vector, returning how many older vectors were evicted
    pub fn put(&self, key: impl Into<String>, vector: Vec<f32>) -> Result<usize, DomainError> {
        let key = key.into();
        let mut state = self.state()?;
        state.seq += 1;

        let slot = EmbeddingSlot {
            vector,
            last_accessed_at: Utc::now(),
            access_seq: state.seq,
        };

        if let Some(existing) = state.slots.get_mut(&key) {
            *existing = slot;
            return Ok(0);
        }

        let mut evicted = 0;

        while state.slots.len() >= self.max_size {
            let Some(victim) = lru_victim(&state.slots, EmbeddingSlot::rank) else {
                break;
            };
            state.slots.remove(&victim);
            evicted += 1;
        }

        state.slots.insert(key, slot);
        Ok(evicted)
    }

    pub fn remove(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.state()?.slots.remove(key).is_some())
    }

    pub fn size(&self) -> Result<usize, DomainError> {
        Ok(self.state()?.slots.len())
    }

    pub fn clear(&self) -> Result<usize, DomainError> {
        let mut state = self.state()?;
        let removed = state.slots.len();
        state.slots.clear();
        Ok(removed)
    }

    /// Copies of all cached vectors, keyed by text
    pub fn entries(&self) -> Result<Vec<(String, Vec<f32>)>, DomainError> {
        Ok(self
            .state()?
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.vector.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_put() {
        let cache = EmbeddingCache::new(4);

        assert!(cache.get("xss").unwrap().is_none());
        cache.put("xss", vec![0.5, 0.5]).unwrap();

        assert_eq!(cache.get("xss").unwrap(), Some(vec![0.5, 0.5]));
        assert_eq!(cache.size().unwrap(), 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = EmbeddingCache::new(1);
        cache.put("a", vec![1.0]).unwrap();

        assert_eq!(cache.put("a", vec![2.0]).unwrap(), 0);
        assert_eq!(cache.get("a").unwrap(), Some(vec![2.0]));
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbeddingCache::new(2);
        cache.put("a", vec![1.0]).unwrap();
        cache.put("b", vec![2.0]).unwrap();
        cache.get("a").unwrap();

        assert_eq!(cache.put("c", vec![3.0]).unwrap(), 1);
        assert!(cache.get("b").unwrap().is_none());
        assert!(cache.get("a").unwrap().is_some());
        assert!(cache.get("c").unwrap().is_some());
    }

    #[test]
    fn test_clear_and_entries() {
        let cache = EmbeddingCache::new(8);
        cache.put("a", vec![1.0]).unwrap();
        cache.put("b", vec![2.0]).unwrap();

        let mut entries = cache.entries().unwrap();
        entries.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(entries[0], ("a".to_string(), vec![1.0]));

        assert!(cache.remove("a").unwrap());
        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.size().unwrap(), 0);
    }
}
