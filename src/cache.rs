mod store;
mod sweeper;

use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use store::Store;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache capacity must be positive")]
    ZeroCapacity,
    #[error("cache sweep interval must be positive")]
    ZeroSweepInterval,
}

/// Why a lookup produced no value. Callers of the job facade see both as
/// "not found".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheMiss {
    #[error("no entry for key")]
    NotFound,
    #[error("entry expired")]
    Expired,
}

/// Bounded key-value cache with per-entry TTL and least-recently-used
/// eviction.
///
/// Every operation, reads included, goes through one mutex because a read
/// reorders the recency list. Recency follows the order in which callers
/// acquire that mutex, not wall-clock timestamps.
///
/// Expired entries are dropped lazily on `get` and eagerly by the sweeper
/// started with [`ResultCache::spawn_sweeper`], which stops when the cache is
/// dropped.
pub struct ResultCache<K, V> {
    store: Arc<Mutex<Store<K, V>>>,
    shutdown: CancellationToken,
}

impl<K, V> ResultCache<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            store: Arc::new(Mutex::new(Store::new(capacity, ttl))),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn set(&self, key: K, value: V) {
        let evicted = self.store.lock().set(key, value, Instant::now());
        if let Some(evicted) = evicted {
            log::debug!("Evicted least recently used cache entry {evicted:?}");
        }
    }

    pub fn get(&self, key: &K) -> Result<V, CacheMiss> {
        self.store.lock().get(key, Instant::now())
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.store.lock().remove(key)
    }

    /// Number of entries held, expired ones not yet swept included
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all expired entries now and returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.store.lock().purge_expired(Instant::now())
    }

    /// Starts the periodic expiry sweep on the current tokio runtime.
    ///
    /// The task only holds a weak reference to the entries, and ends when the
    /// cache is dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> Result<JoinHandle<()>, CacheError> {
        if interval.is_zero() {
            return Err(CacheError::ZeroSweepInterval);
        }
        Ok(tokio::spawn(sweeper::sweep(
            Arc::downgrade(&self.store),
            interval,
            self.shutdown.child_token(),
        )))
    }
}

impl<K, V> Drop for ResultCache<K, V> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
