//! Fetch Coordinator Module
//!
//! Single-flight population of the entry store: concurrent misses on the same
//! key share one factory invocation and all observe its outcome.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cache::{EntryStore, Lookup, StatsRecorder};
use crate::error::{CacheError, Result};

/// Settled outcome of one fetch episode; `Ok(None)` means "not found".
type FetchOutcome<V> = Result<Option<V>>;

/// Awaitable handle every waiter of an episode clones.
type PendingFetch<V> = Shared<BoxFuture<'static, FetchOutcome<V>>>;

// == Fetch Coordinator ==
/// Registry of in-flight fetches, at most one per key.
///
/// The episode itself runs on a spawned task, so it settles and writes back
/// even when every waiter has stopped waiting.
pub struct FetchCoordinator<K, V>
where
    K: Eq + Hash,
{
    store: Arc<EntryStore<K, V>>,
    pending: Arc<DashMap<K, PendingFetch<V>>>,
    stats: Arc<StatsRecorder>,
}

impl<K, V> FetchCoordinator<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new(store: Arc<EntryStore<K, V>>, stats: Arc<StatsRecorder>) -> Self {
        Self {
            store,
            pending: Arc::new(DashMap::new()),
            stats,
        }
    }

    /// Number of fetch episodes currently in flight.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    // == Get Or Fetch ==
    /// Returns the cached outcome for `key`, or runs `factory` once for all
    /// concurrent callers and caches what it produces.
    ///
    /// - `Ok(Some(v))` from the factory is stored as a positive entry.
    /// - `Ok(None)` is stored as a negative entry.
    /// - `Err(_)` is handed to every waiter and nothing is stored.
    ///
    /// `factory` is only called by the caller that registers the fetch.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, factory: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<V>, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        match self.store.get(&key) {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Absent => return Ok(None),
            Lookup::Miss => {}
        }

        // Check-pending-and-register happens under the shard lock for `key`.
        // Episodes write their entry before deregistering, so a vacant slot
        // with a fresh entry means we lost the race to a finished episode.
        // The factory runs only after the shard lock is released.
        let (settle, fetch) = match self.pending.entry(key.clone()) {
            Entry::Occupied(slot) => {
                self.stats.record_coalesced();
                debug!("joining in-flight fetch");
                (None, slot.get().clone())
            }
            Entry::Vacant(slot) => match self.store.revisit(&key) {
                Lookup::Hit(value) => return Ok(Some(value)),
                Lookup::Absent => return Ok(None),
                Lookup::Miss => {
                    let (settle, fetch) = pending_fetch();
                    slot.insert(fetch.clone());
                    (Some(settle), fetch)
                }
            },
        };

        if let Some(settle) = settle {
            self.start_fetch(key, factory, settle);
        }

        fetch.await
    }

    // == Start Fetch ==
    /// Runs `factory` for a registered episode and settles it on a spawned task.
    fn start_fetch<F, Fut, E>(
        &self,
        key: K,
        factory: F,
        settle: oneshot::Sender<FetchOutcome<V>>,
    )
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Option<V>, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        self.stats.record_fetch();

        // Deregisters even if `factory` or the fetch panics
        let registration = Registration {
            pending: Arc::clone(&self.pending),
            key: key.clone(),
            settle: Some(settle),
        };
        let fetch = factory();

        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let outcome = match fetch.await {
                Ok(Some(value)) => {
                    store.set(key, value.clone());
                    Ok(Some(value))
                }
                Ok(None) => {
                    debug!("fetch found nothing, caching negative entry");
                    store.set_negative(key);
                    Ok(None)
                }
                Err(err) => {
                    let err = CacheError::factory(err);
                    stats.record_fetch_failure();
                    warn!(error = %err, "fetch failed, nothing cached");
                    Err(err)
                }
            };

            registration.settle(outcome);
        });
    }
}

/// Builds the shared handle for a new episode, settled through the returned sender.
///
/// A sender dropped without settling (the fetch panicked) reaches waiters as
/// [`CacheError::Internal`].
fn pending_fetch<V>() -> (oneshot::Sender<FetchOutcome<V>>, PendingFetch<V>)
where
    V: Clone + Send + Sync + 'static,
{
    let (settle, settled) = oneshot::channel();
    let fetch = async move {
        settled.await.unwrap_or_else(|_| {
            warn!("fetch task ended without an outcome");
            Err(CacheError::Internal("fetch task ended without an outcome".to_string()))
        })
    }
    .boxed()
    .shared();

    (settle, fetch)
}

impl<K, V> Clone for FetchCoordinator<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pending: Arc::clone(&self.pending),
            stats: Arc::clone(&self.stats),
        }
    }
}

// == Registration ==
/// An episode's slot in the pending registry, released once the episode settles.
///
/// The key is always deregistered before waiters are woken, so a waiter never
/// observes its own finished episode as still pending.
struct Registration<K, V>
where
    K: Eq + Hash,
{
    pending: Arc<DashMap<K, PendingFetch<V>>>,
    key: K,
    settle: Option<oneshot::Sender<FetchOutcome<V>>>,
}

impl<K, V> Registration<K, V>
where
    K: Eq + Hash,
{
    /// Deregisters and hands `outcome` to every waiter still listening.
    fn settle(mut self, outcome: FetchOutcome<V>) {
        if let Some(settle) = self.settle.take() {
            self.pending.remove(&self.key);
            let _ = settle.send(outcome);
        }
    }
}

impl<K, V> Drop for Registration<K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        // Unsettled on drop: the factory or its fetch panicked
        if let Some(settle) = self.settle.take() {
            self.pending.remove(&self.key);
            drop(settle);
        }
    }
}
