//! Single-flight execution per key, built on moka's coalesced initialization

use std::future::Future;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::DomainError;

/// Upper bound on how long a finished result may linger before it is dropped
/// from the slot table. Results are normally removed as soon as they are read.
const SETTLED_SLOT_TTL: Duration = Duration::from_secs(5);

/// Ensures at most one producer runs per key at any time
///
/// Concurrent callers for the same key await the leader's outcome. Both
/// successes and failures are delivered to every waiter, then the slot is
/// cleared so later calls start a fresh attempt.
#[derive(Debug)]
pub struct RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    slots: MokaCache<String, V>,
}

impl<V> RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: MokaCache::builder()
                .time_to_live(SETTLED_SLOT_TTL)
                .build(),
        }
    }

    /// Run `producer` unless another caller is already running it for `key`,
    /// in which case wait for and share that result instead.
    pub async fn run_exclusive<F>(&self, key: &str, producer: F) -> Result<V, DomainError>
    where
        F: Future<Output = Result<V, DomainError>>,
    {
        let outcome = self.slots.try_get_with(key.to_string(), producer).await;

        // Failed initializations are never stored; successful ones are
        // removed so the next miss triggers a new generation.
        self.slots.invalidate(key).await;

        outcome.map_err(|e| (*e).clone())
    }
}

impl<V> Default for RequestCoalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
