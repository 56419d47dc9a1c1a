//! Per-key aggregate cache with lazy time-based eviction

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Entities that carry their own cache key
pub trait Keyed {
    fn cache_key(&self) -> &str;
}

struct CacheEntry<T> {
    entity: T,
    inserted_at: Instant,
}

/// Map from key to entity, swept of entries older than the TTL on lookup
///
/// Not capacity-bounded and not LRU: only age matters.
pub struct StatCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T: Keyed + Clone> StatCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Evict expired entries, then look up `key`
    pub fn try_get(&self, key: &str) -> Option<T> {
        let mut entries = self.lock();

        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        entries.get(key).map(|entry| entry.entity.clone())
    }

    /// Store or overwrite under the entity's own key
    pub fn insert(&self, entity: T) {
        let key = entity.cache_key().to_string();
        let entry = CacheEntry {
            entity,
            inserted_at: Instant::now(),
        };
        self.lock().insert(key, entry);
    }

    /// Number of entries currently held, expired or not
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
