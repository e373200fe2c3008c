//! Time-bounded cache with single-flight population.
//!
//! Every key is in one of two states:
//!
//! - **Ready**: a computed value with an expiry instant.
//! - **Pending**: a computation is running; callers asking for the key join
//!   it instead of starting their own.
//!
//! Successful computations become Ready entries. Failed computations are
//! handed to every waiter and then forgotten, so the next request retries.
//!
//! Invalidation only drops Ready entries. A Pending slot stays joinable until
//! its computation finishes, so there is never more than one computation per
//! key, even across invalidations.
//!
//! Time is read from the tokio clock, which lets tests pause and advance it.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use tokio::time::Instant;

use crate::errors::AvailabilityError;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, AvailabilityError>>>;

/// A stored value and its lifetime.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

enum Slot<V> {
    Ready(CacheEntry<V>),
    Pending {
        generation: u64,
        fetch: SharedFetch<V>,
        /// Cleared while running: answer waiters but do not store.
        discard: bool,
    },
}

enum Lookup<V> {
    Hit(V),
    Join(SharedFetch<V>),
    Miss,
}

/// Counters describing how the cache has been used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups answered from a fresh entry
    pub hits: u64,
    /// Lookups that started a computation
    pub misses: u64,
    /// Lookups that joined a computation already in flight
    pub coalesced: u64,
    /// Computations that failed and were not stored
    pub failures: u64,
}

struct Inner<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    /// Lock the slot map, recovering from poison if necessary.
    ///
    /// The map only holds finished values and handles to running fetches,
    /// neither of which is left half-written by a panic.
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record the result of the computation identified by `generation`.
    ///
    /// A slot replaced while the computation ran is left alone. A slot marked
    /// by [`TtlCache::clear`] is removed without storing the result.
    fn settle(&self, key: &K, generation: u64, result: &Result<V, AvailabilityError>, ttl: Duration) {
        let mut slots = self.lock_slots();

        let discard = match slots.get(key) {
            Some(Slot::Pending {
                generation: g,
                discard,
                ..
            }) if *g == generation => *discard,
            _ => {
                debug!("Cache: slot for '{}' was replaced, leaving it alone", key);
                return;
            }
        };
        if discard {
            slots.remove(key);
            debug!("Cache: discarding result for '{}', cache was cleared", key);
            return;
        }

        match result {
            Ok(value) => {
                let now = Instant::now();
                slots.insert(
                    key.clone(),
                    Slot::Ready(CacheEntry {
                        value: value.clone(),
                        expires_at: now + ttl,
                    }),
                );
                debug!("Cache: stored '{}' for {:?}", key, ttl);
            }
            Err(e) => {
                slots.remove(key);
                self.failures.fetch_add(1, Ordering::Relaxed);
                debug!("Cache: not storing failed result for '{}': {}", key, e);
            }
        }
    }

    /// Drop a pending slot whose task never reported back.
    fn abandon(&self, key: &K, generation: u64) {
        let mut slots = self.lock_slots();
        if matches!(
            slots.get(key),
            Some(Slot::Pending { generation: g, .. }) if *g == generation
        ) {
            slots.remove(key);
        }
    }
}

/// Key→value cache with expiry and at most one in-flight computation per key.
///
/// Cloning the cache is cheap and yields a handle to the same storage.
pub struct TtlCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    /// Return the value for `key` if a fresh entry exists.
    pub fn get(&self, key: &K) -> Option<V> {
        let slots = self.inner.lock_slots();
        match slots.get(key) {
            Some(Slot::Ready(entry)) if !entry.is_expired_at(Instant::now()) => {
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    /// Whether a fresh entry exists for `key`.
    pub fn contains(&self, key: &K) -> bool {
        let slots = self.inner.lock_slots();
        matches!(
            slots.get(key),
            Some(Slot::Ready(entry)) if !entry.is_expired_at(Instant::now())
        )
    }

    /// Return the cached value for `key`, computing it if needed.
    ///
    /// - A fresh entry is returned without calling `compute`.
    /// - If a computation for `key` is already running, this call waits for
    ///   it and returns its result.
    /// - Otherwise `compute` is called once to build the future, which runs
    ///   as its own task. A success is stored for `ttl`; a failure is returned
    ///   to every waiter and not stored.
    ///
    /// A panic inside the computation becomes
    /// [`AvailabilityError::FetchPanicked`] for every waiter.
    ///
    /// `compute` is called while the slot map is locked, so it should only
    /// construct the future and leave the work to it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: K,
        compute: F,
        ttl: Duration,
    ) -> Result<V, AvailabilityError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, AvailabilityError>> + Send + 'static,
    {
        let fetch = {
            let mut slots = self.inner.lock_slots();

            let lookup = match slots.get(&key) {
                Some(Slot::Ready(entry)) if !entry.is_expired_at(Instant::now()) => {
                    Lookup::Hit(entry.value.clone())
                }
                Some(Slot::Pending { fetch, .. }) => Lookup::Join(fetch.clone()),
                _ => Lookup::Miss,
            };

            match lookup {
                Lookup::Hit(value) => {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Lookup::Join(fetch) => {
                    self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache: joining in-flight fetch for '{}'", key);
                    fetch
                }
                Lookup::Miss => {
                    self.inner.misses.fetch_add(1, Ordering::Relaxed);
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.spawn_fetch(key.clone(), generation, compute(), ttl);
                    slots.insert(
                        key,
                        Slot::Pending {
                            generation,
                            fetch: fetch.clone(),
                            discard: false,
                        },
                    );
                    fetch
                }
            }
        };

        fetch.await
    }

    fn spawn_fetch<Fut>(&self, key: K, generation: u64, work: Fut, ttl: Duration) -> SharedFetch<V>
    where
        Fut: Future<Output = Result<V, AvailabilityError>> + Send + 'static,
    {
        let label = key.to_string();

        let task_inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Cache: computation for '{}' panicked", task_label);
                    Err(AvailabilityError::FetchPanicked {
                        provider: task_label,
                    })
                }
            };
            task_inner.settle(&task_key, generation, &result, ttl);
            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Cache: computation for '{}' was aborted: {}", label, e);
                    inner.abandon(&key, generation);
                    Err(AvailabilityError::FetchAborted { provider: label })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Remove the stored entry for `key`.
    ///
    /// A computation already running for `key` is left in place: it started
    /// after the value being invalidated, and later callers join it.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut slots = self.inner.lock_slots();
        if matches!(slots.get(key), Some(Slot::Ready(_))) {
            slots.remove(key);
            true
        } else {
            false
        }
    }

    /// Remove every stored entry whose key matches `predicate`.
    ///
    /// In-flight computations are kept, as in [`invalidate`](Self::invalidate).
    pub fn invalidate_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&K) -> bool,
    {
        let mut slots = self.inner.lock_slots();
        let before = slots.len();
        slots.retain(|key, slot| matches!(slot, Slot::Pending { .. }) || !predicate(key));
        before - slots.len()
    }

    /// Remove every stored entry.
    ///
    /// In-flight computations stay joinable so no key is fetched twice at
    /// once, but their results are handed to waiters without being stored.
    pub fn clear(&self) {
        let mut slots = self.inner.lock_slots();
        slots.retain(|_, slot| match slot {
            Slot::Ready(_) => false,
            Slot::Pending { discard, .. } => {
                *discard = true;
                true
            }
        });
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.inner.lock_slots();
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => !entry.is_expired_at(now),
            Slot::Pending { .. } => true,
        });
        before - slots.len()
    }

    /// Number of fresh entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock_slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(entry) if !entry.is_expired_at(now)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of computations currently running.
    pub fn in_flight(&self) -> usize {
        self.inner
            .lock_slots()
            .values()
            .filter(|slot| matches!(slot, Slot::Pending { .. }))
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TTL: Duration = Duration::from_secs(300);

    fn counting(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        value: u32,
    ) -> impl Future<Output = Result<u32, AvailabilityError>> + Send + 'static {
        let calls = Arc::clone(calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            Ok(value)
        }
    }

    async fn explode() -> Result<u32, AvailabilityError> {
        panic!("parser blew up")
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_skips_compute() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_compute("a".into(), || counting(&calls, Duration::ZERO, 7), TTL)
            .await;
        let second = cache
            .get_or_compute("a".into(), || counting(&calls, Duration::ZERO, 8), TTL)
            .await;

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(7));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "a".to_string();

        cache
            .get_or_compute(key.clone(), || counting(&calls, Duration::ZERO, 1), TTL)
            .await
            .unwrap();

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(cache.contains(&key));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cache.contains(&key));
        assert_eq!(cache.get(&key), None);

        let value = cache
            .get_or_compute(key.clone(), || counting(&calls, Duration::ZERO, 2), TTL)
            .await;
        assert_eq!(value, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_computation() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..10).map(|i| {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            async move {
                cache
                    .get_or_compute(
                        "a".to_string(),
                        || counting(&calls, Duration::from_millis(200), i),
                        TTL,
                    )
                    .await
            }
        });
        let results = futures::future::join_all(requests).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| *r == Ok(0)));
        assert_eq!(cache.stats().coalesced, 9);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_keys_compute_in_parallel() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let a = cache.get_or_compute("a".into(), || counting(&calls, Duration::from_secs(1), 1), TTL);
        let b = cache.get_or_compute("b".into(), || counting(&calls, Duration::from_secs(1), 2), TTL);
        let (a, b) = futures::join!(a, b);

        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_shared_but_not_cached() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = |calls: &Arc<AtomicUsize>| {
            let calls = Arc::clone(calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<u32, _>(AvailabilityError::provider("a", "HTTP 503"))
            }
        };

        let (first, second) = futures::join!(
            cache.get_or_compute("a".into(), || failing(&calls), TTL),
            cache.get_or_compute("a".into(), || failing(&calls), TTL),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(first.is_err());
        assert!(!cache.contains(&"a".to_string()));

        // Source recovered: the very next request goes upstream again.
        let value = cache
            .get_or_compute("a".into(), || counting(&calls, Duration::ZERO, 5), TTL)
            .await;
        assert_eq!(value, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_becomes_error_for_all_waiters() {
        let cache: TtlCache<String, u32> = TtlCache::new();

        let (first, second) = futures::join!(
            cache.get_or_compute("a".into(), explode, TTL),
            cache.get_or_compute("a".into(), explode, TTL),
        );

        let expected = Err(AvailabilityError::FetchPanicked {
            provider: "a".to_string(),
        });
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(cache.in_flight(), 0);

        let calls = Arc::new(AtomicUsize::new(0));
        let value = cache
            .get_or_compute("a".into(), || counting(&calls, Duration::ZERO, 3), TTL)
            .await;
        assert_eq!(value, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_after_invalidate_joins_running_fetch() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "a".to_string();

        let first = cache.get_or_compute(
            key.clone(),
            || counting(&calls, Duration::from_secs(1), 9),
            TTL,
        );
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let removed = cache.invalidate(&key);
            let value = cache
                .get_or_compute(
                    key.clone(),
                    || counting(&calls, Duration::from_secs(1), 10),
                    TTL,
                )
                .await;
            (removed, value)
        };
        let (first, (removed, second)) = futures::join!(first, second);

        assert!(!removed);
        assert_eq!(first, Ok(9));
        assert_eq!(second, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 1);
        assert_eq!(cache.get(&key), Some(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_where_keeps_running_fetches() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.get_or_compute(
            "a:1".to_string(),
            || counting(&calls, Duration::from_secs(1), 1),
            TTL,
        );
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(cache.invalidate_where(|k| k.ends_with(":1")), 0);
            assert_eq!(cache.in_flight(), 1);
            cache
                .get_or_compute(
                    "a:1".to_string(),
                    || counting(&calls, Duration::ZERO, 2),
                    TTL,
                )
                .await
        };
        let (first, second) = futures::join!(first, second);

        assert_eq!((first, second), (Ok(1), Ok(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_flight_shares_but_does_not_store() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = "a".to_string();

        let first = cache.get_or_compute(
            key.clone(),
            || counting(&calls, Duration::from_secs(1), 9),
            TTL,
        );
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cache.clear();
            cache
                .get_or_compute(
                    key.clone(),
                    || counting(&calls, Duration::ZERO, 10),
                    TTL,
                )
                .await
        };
        let (first, second) = futures::join!(first, second);

        assert_eq!((first, second), (Ok(9), Ok(9)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.contains(&key));
        assert_eq!(cache.in_flight(), 0);

        let value = cache
            .get_or_compute(key.clone(), || counting(&calls, Duration::ZERO, 11), TTL)
            .await;
        assert_eq!(value, Ok(11));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_and_invalidate_where() {
        let cache: TtlCache<String, u32> = TtlCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_compute("short".into(), || counting(&calls, Duration::ZERO, 1), Duration::from_secs(10))
            .await
            .unwrap();
        cache
            .get_or_compute("long:1".into(), || counting(&calls, Duration::ZERO, 2), TTL)
            .await
            .unwrap();
        cache
            .get_or_compute("long:2".into(), || counting(&calls, Duration::ZERO, 3), TTL)
            .await
            .unwrap();
        assert_eq!(cache.len(), 3);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);

        assert_eq!(cache.invalidate_where(|k| k.ends_with(":1")), 1);
        assert_eq!(cache.get(&"long:2".to_string()), Some(3));

        cache.clear();
        assert!(cache.is_empty());
    }
}
