//! Coalescing Cache Module
//!
//! Public handle tying the entry store, eviction policy and fetch coordinator together.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStats, EntryStore, FetchCoordinator, Lookup, StatsRecorder};
use crate::config::Config;
use crate::error::Result;

// == Coalescing Cache ==
/// Bounded, request-coalescing cache with negative caching.
///
/// Cloning is cheap and every clone shares the same entries and in-flight
/// fetches.
///
/// # Example
/// ```ignore
/// let cache: CoalescingCache<String, String> =
///     CoalescingCache::new(100, Duration::from_secs(300));
///
/// // `Ok(None)` from the source is remembered as "not found" for 5 minutes
/// let long_url = cache
///     .get_or_fetch(code.clone(), move || async move { source.lookup(&code).await })
///     .await?;
/// ```
pub struct CoalescingCache<K, V>
where
    K: Eq + Hash,
{
    store: Arc<EntryStore<K, V>>,
    coordinator: FetchCoordinator<K, V>,
    stats: Arc<StatsRecorder>,
}

impl<K, V> CoalescingCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `max_entries` - Entry count the cache trims back to after every write
    /// * `negative_ttl` - How long a "not found" outcome is remembered
    pub fn new(max_entries: usize, negative_ttl: Duration) -> Self {
        let stats = Arc::new(StatsRecorder::new());
        let store = Arc::new(EntryStore::new(max_entries, negative_ttl, stats.clone()));
        let coordinator = FetchCoordinator::new(store.clone(), stats.clone());

        Self {
            store,
            coordinator,
            stats,
        }
    }

    /// Creates an empty cache sized from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_entries, config.negative_ttl())
    }

    // == Lookup ==
    /// Probes the cache without fetching.
    ///
    /// A positive hit refreshes the entry's recency; an expired negative entry
    /// is removed and reported as [`Lookup::Miss`].
    pub fn lookup(&self, key: &K) -> Lookup<V> {
        self.store.get(key)
    }

    // == Get ==
    /// Returns the cached value, or `V::default()` when the key is missing or
    /// known to be absent.
    pub fn get(&self, key: &K) -> V
    where
        V: Default,
    {
        self.lookup(key).into_value().unwrap_or_default()
    }

    // == Set ==
    /// Unconditionally stores `value` under `key`.
    pub fn set(&self, key: K, value: V) {
        self.store.set(key, value);
    }

    /// Remembers `key` as not found for the negative TTL.
    pub fn set_negative(&self, key: K) {
        self.store.set_negative(key);
    }

    // == Remove ==
    /// Drops any entry for `key`. Returns true if one was present.
    pub fn remove(&self, key: &K) -> bool {
        self.store.remove(key)
    }

    // == Get Or Fetch ==
    /// Returns the cached value or populates it with a single shared call to
    /// `factory`, which reports "not found" as `Ok(None)`.
    ///
    /// Factory failures reach every waiter and are never cached. The fetch
    /// runs on a spawned task, so this must be called inside a Tokio runtime.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, factory: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<V>, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        self.coordinator.get_or_fetch(key, factory).await
    }

    // == Get Or Create ==
    /// Like [`get_or_fetch`](Self::get_or_fetch), with "not found" signalled by
    /// the factory returning `V::default()`.
    ///
    /// A genuine value equal to `V::default()` is indistinguishable from "not
    /// found" and is cached as a negative entry. Callers that need to store
    /// such values should use `get_or_fetch`.
    pub async fn get_or_create<F, Fut, E>(&self, key: K, factory: F) -> Result<V>
    where
        V: Default + PartialEq,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let found = self
            .get_or_fetch(key, move || {
                let fetch = factory();
                async move {
                    let value = fetch.await?;
                    Ok::<_, E>((value != V::default()).then_some(value))
                }
            })
            .await?;

        Ok(found.unwrap_or_default())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.store.len(), self.coordinator.pending())
    }

    // == Length ==
    /// Number of entries, positive and negative.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Fetches currently in flight.
    pub fn pending_fetches(&self) -> usize {
        self.coordinator.pending()
    }

    pub fn max_entries(&self) -> usize {
        self.store.max_entries()
    }

    pub fn negative_ttl(&self) -> Duration {
        self.store.negative_ttl()
    }
}

impl<K, V> Clone for CoalescingCache<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            coordinator: self.coordinator.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_factory(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> futures::future::Ready<anyhow::Result<String>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(value.to_string()))
        }
    }

    #[test]
    fn test_get_returns_default_for_missing_and_absent() {
        let cache: CoalescingCache<String, String> =
            CoalescingCache::new(10, Duration::from_secs(60));

        assert_eq!(cache.get(&"missing".to_string()), "");

        cache.set_negative("absent".to_string());
        assert_eq!(cache.get(&"absent".to_string()), "");
        assert_eq!(cache.lookup(&"absent".to_string()), Lookup::Absent);

        cache.set("present".to_string(), "value".to_string());
        assert_eq!(cache.get(&"present".to_string()), "value");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            max_entries: 7,
            negative_ttl: 42,
            server_port: 0,
        };
        let cache: CoalescingCache<String, String> = CoalescingCache::from_config(&config);

        assert_eq!(cache.max_entries(), 7);
        assert_eq!(cache.negative_ttl(), Duration::from_secs(42));
    }

    #[tokio::test]
    async fn test_get_or_create_caches_value() {
        let cache: CoalescingCache<String, String> =
            CoalescingCache::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_create("abc".to_string(), counting_factory(&calls, "https://a.example"))
            .await
            .unwrap();
        let second = cache
            .get_or_create("abc".to_string(), counting_factory(&calls, "https://b.example"))
            .await
            .unwrap();

        assert_eq!(first, "https://a.example");
        assert_eq!(second, "https://a.example");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get(&"abc".to_string()), "https://a.example");
    }

    #[tokio::test]
    async fn test_get_or_create_default_is_not_found() {
        let cache: CoalescingCache<String, String> =
            CoalescingCache::new(10, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let value = cache
            .get_or_create("x".to_string(), counting_factory(&calls, ""))
            .await
            .unwrap();
        assert_eq!(value, "");
        assert_eq!(cache.lookup(&"x".to_string()), Lookup::Absent);

        let value = cache
            .get_or_create("x".to_string(), counting_factory(&calls, "late"))
            .await
            .unwrap();
        assert_eq!(value, "", "negative entry answers until it expires");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_create_after_negative_ttl() {
        let cache: CoalescingCache<String, String> =
            CoalescingCache::new(10, Duration::from_millis(50));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_create("x".to_string(), counting_factory(&calls, ""))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        let value = cache
            .get_or_create("x".to_string(), counting_factory(&calls, "now-found"))
            .await
            .unwrap();
        assert_eq!(value, "now-found");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let cache: CoalescingCache<String, String> =
            CoalescingCache::new(1, Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_create("a".to_string(), counting_factory(&calls, "1"))
            .await
            .unwrap();
        cache
            .get_or_create("b".to_string(), counting_factory(&calls, "2"))
            .await
            .unwrap();
        cache.get(&"b".to_string());

        let stats = cache.stats();
        assert_eq!(stats.fetches, 2);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.pending_fetches, 0);
    }
}
