//! Process-scoped memoization keyed by exact parameters.
//!
//! Each key owns a slot. The first caller for a key computes the value while
//! holding only that slot's lock; concurrent callers for the same key block
//! on the slot and then observe the stored value. Callers for other keys are
//! never blocked by a computation in progress. A failed computation stores
//! nothing; its slot is dropped unless another caller is already waiting on
//! it. Computed values are never evicted.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

type Slot<V> = Arc<Mutex<Option<V>>>;

/// A thread-safe, unbounded memo table.
pub struct MemoCache<K, V> {
    slots: RwLock<HashMap<K, Slot<V>>>,
    filled: AtomicUsize,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            filled: AtomicUsize::new(0),
        }
    }

    fn slot(&self, key: &K) -> Slot<V> {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Return the cached value for `key`, computing it with `init` on a miss.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &K,
        init: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let slot = self.slot(key);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        match init() {
            Ok(value) => {
                *guard = Some(value.clone());
                self.filled.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(e) => {
                drop(guard);
                self.discard_empty(key, &slot);
                Err(e)
            }
        }
    }

    /// Remove `slot` from the table if only the table and the caller hold it.
    /// Callers already waiting on the slot keep it alive and retry in it.
    fn discard_empty(&self, key: &K, slot: &Slot<V>) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let unused = slots
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2);
        if unused {
            slots.remove(key);
        }
    }

    /// Infallible variant of [`get_or_try_insert_with`](Self::get_or_try_insert_with).
    pub fn get_or_insert_with(&self, key: &K, init: impl FnOnce() -> V) -> V {
        match self.get_or_try_insert_with::<std::convert::Infallible>(key, || Ok(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// The cached value for `key`, if one has been computed.
    pub fn get(&self, key: &K) -> Option<V> {
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Number of keys holding a computed value.
    pub fn len(&self) -> usize {
        self.filled.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn computes_once_per_key() {
        let cache: MemoCache<u32, String> = MemoCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache.get_or_insert_with(&7, || {
                calls.fetch_add(1, Ordering::SeqCst);
                "seven".to_string()
            });
            assert_eq!(v, "seven");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let cache: MemoCache<(u32, i64), u32> = MemoCache::new();
        assert_eq!(cache.get_or_insert_with(&(1, -1), || 10), 10);
        assert_eq!(cache.get_or_insert_with(&(1, 0), || 20), 20);
        assert_eq!(cache.get(&(1, -1)), Some(10));
        assert_eq!(cache.get(&(2, 0)), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: MemoCache<u32, u32> = MemoCache::new();
        let first: Result<u32, &str> = cache.get_or_try_insert_with(&1, || Err("boom"));
        assert!(first.is_err());
        assert!(cache.is_empty());

        let second: Result<u32, &str> = cache.get_or_try_insert_with(&1, || Ok(5));
        assert_eq!(second, Ok(5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_keys_leave_no_slots_behind() {
        let cache: MemoCache<u32, u32> = MemoCache::new();
        for key in 0..100 {
            let out: Result<u32, &str> = cache.get_or_try_insert_with(&key, || Err("bad id"));
            assert!(out.is_err());
        }
        assert!(cache.slots.read().unwrap().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn len_does_not_wait_for_computation_in_progress() {
        let cache: MemoCache<u32, u32> = MemoCache::new();
        cache.get_or_insert_with(&1, || 1);
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let shared = &cache;
        std::thread::scope(|scope| {
            scope.spawn(move || {
                shared.get_or_insert_with(&2, || {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    2
                })
            });
            started_rx.recv().unwrap();
            assert_eq!(cache.len(), 1);
            release_tx.send(()).unwrap();
        });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        let cache: MemoCache<u32, Arc<String>> = MemoCache::new();
        let calls = AtomicUsize::new(0);

        let results: Vec<Arc<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        cache.get_or_insert_with(&42, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Arc::new("answer".to_string())
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
