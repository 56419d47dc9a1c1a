//! Single-slot, TTL-bounded cache for list-valued reports

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Holds one ordered report list and the instant it was published
pub struct ReportCache<T> {
    slot: Mutex<ReportSlot<T>>,
    ttl: Duration,
}

struct ReportSlot<T> {
    items: Vec<T>,
    published_at: Option<Instant>,
}

impl<T> ReportSlot<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        matches!(self.published_at, Some(at) if at.elapsed() < ttl)
    }
}

impl<T: Clone> ReportCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(ReportSlot {
                items: Vec::new(),
                published_at: None,
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the first `max_count` cached items while the slot is fresh
    pub fn try_get(&self, max_count: usize) -> Option<Vec<T>> {
        let slot = self.lock();
        Self::fresh_prefix(&slot, max_count, self.ttl)
    }

    /// Replace the cached list and restart its TTL
    pub fn publish(&self, items: Vec<T>) {
        let mut slot = self.lock();
        Self::replace(&mut slot, items);
    }

    /// Serve from the slot, or recompute and publish while holding the guard
    ///
    /// Callers blocked behind an in-flight recomputation read the freshly
    /// published list once they acquire the guard. A failed recomputation
    /// leaves the slot untouched.
    pub fn get_or_refresh<E, F>(&self, max_count: usize, recompute: F) -> Result<Vec<T>, E>
    where
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        let mut slot = self.lock();

        if let Some(items) = Self::fresh_prefix(&slot, max_count, self.ttl) {
            return Ok(items);
        }

        let items = recompute()?;
        let prefix = items.iter().take(max_count).cloned().collect();
        Self::replace(&mut slot, items);

        Ok(prefix)
    }

    fn fresh_prefix(slot: &ReportSlot<T>, max_count: usize, ttl: Duration) -> Option<Vec<T>> {
        if !slot.is_fresh(ttl) {
            return None;
        }
        Some(slot.items.iter().take(max_count).cloned().collect())
    }

    fn replace(slot: &mut ReportSlot<T>, items: Vec<T>) {
        slot.items = items;
        slot.published_at = Some(Instant::now());
    }

    fn lock(&self) -> MutexGuard<'_, ReportSlot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    const TTL: Duration = Duration::from_secs(1);

    #[test]
    fn test_empty_cache_misses() {
        let cache: ReportCache<u32> = ReportCache::new(TTL);
        assert!(cache.try_get(50).is_none());
    }

    #[test]
    fn test_hit_after_publish() {
        let cache = ReportCache::new(TTL);
        cache.publish(vec!["a", "b", "c"]);

        assert_eq!(cache.try_get(50), Some(vec!["a", "b", "c"]));
        assert_eq!(cache.try_get(2), Some(vec!["a", "b"]));
        assert_eq!(cache.try_get(0), Some(vec![]));
    }

    #[test]
    fn test_miss_after_ttl() {
        let cache = ReportCache::new(TTL);
        cache.publish(vec![1, 2, 3]);
        assert!(cache.try_get(50).is_some());

        thread::sleep(TTL);

        assert!(cache.try_get(50).is_none());
    }

    #[test]
    fn test_publish_resets_ttl() {
        let cache = ReportCache::new(TTL);
        cache.publish(vec![1]);
        thread::sleep(TTL);

        cache.publish(vec![2]);

        assert_eq!(cache.try_get(1), Some(vec![2]));
    }

    #[test]
    fn test_get_or_refresh_recomputes_only_on_miss() {
        let cache = ReportCache::new(TTL);
        let calls = AtomicUsize::new(0);
        let recompute = || -> Result<Vec<u32>, String> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok((1..=10).collect())
        };

        let first = cache.get_or_refresh(3, recompute).unwrap();
        let second = cache.get_or_refresh(5, recompute).unwrap();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3, 4, 5]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_refresh_does_not_publish() {
        let cache: ReportCache<u32> = ReportCache::new(TTL);

        let result = cache.get_or_refresh(5, || Err("store unavailable".to_string()));

        assert!(result.is_err());
        assert!(cache.try_get(5).is_none());
    }

    #[test]
    fn test_concurrent_misses_collapse_into_one_recompute() {
        let cache = Arc::new(ReportCache::new(TTL));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_refresh(50, || -> Result<Vec<u32>, ()> {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(vec![7, 8, 9])
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![7, 8, 9]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
