//! Entry Store Module
//!
//! Concurrent key -> entry map with negative-entry expiry and size-bounded eviction.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheEntry, EvictionPolicy, Lookup, StatsRecorder};

// == Entry Store ==
/// Thread-safe mapping from key to [`CacheEntry`].
///
/// Point operations go through the sharded map and never serialize with each
/// other. Only the eviction pass takes `eviction_lock`, which gives it a
/// consistent snapshot-and-remove step without blocking readers.
#[derive(Debug)]
pub struct EntryStore<K, V>
where
    K: Eq + Hash,
{
    /// Key-value storage
    entries: DashMap<K, CacheEntry<V>>,
    /// Size bound and victim selection
    policy: EvictionPolicy,
    /// How long negative entries stay valid
    negative_ttl: Duration,
    /// Source of access sequence numbers
    clock: AtomicU64,
    /// Serializes eviction passes
    eviction_lock: Mutex<()>,
    /// Performance statistics
    stats: Arc<StatsRecorder>,
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries kept after any write
    /// * `negative_ttl` - Lifetime of a negative entry
    /// * `stats` - Counters shared with the rest of the cache
    pub fn new(max_entries: usize, negative_ttl: Duration, stats: Arc<StatsRecorder>) -> Self {
        Self {
            entries: DashMap::new(),
            policy: EvictionPolicy::new(max_entries),
            negative_ttl,
            clock: AtomicU64::new(0),
            eviction_lock: Mutex::new(()),
            stats,
        }
    }

    fn next_seq(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    // == Get ==
    /// Looks a key up, refreshing recency on a positive hit.
    ///
    /// An expired negative entry is deleted here and reported as a miss.
    pub fn get(&self, key: &K) -> Lookup<V> {
        let expired_seq = match self.entries.get_mut(key) {
            None => {
                self.stats.record_miss();
                return Lookup::Miss;
            }
            Some(mut entry) => {
                if let Some(value) = entry.payload().cloned() {
                    entry.touch(self.next_seq());
                    self.stats.record_hit();
                    return Lookup::Hit(value);
                }
                if !entry.is_expired(self.negative_ttl) {
                    self.stats.record_negative_hit();
                    return Lookup::Absent;
                }
                entry.access_seq()
            }
        };

        // Only drop the entry we judged expired, not one written since
        if self
            .entries
            .remove_if(key, |_, entry| entry.access_seq() == expired_seq)
            .is_some()
        {
            debug!("negative cache entry expired");
        }
        self.stats.record_miss();
        Lookup::Miss
    }

    // == Peek ==
    /// Looks a key up without touching recency, statistics or expired entries.
    pub fn peek(&self, key: &K) -> Lookup<V> {
        self.entries
            .get(key)
            .map(|entry| entry.lookup(self.negative_ttl))
            .unwrap_or(Lookup::Miss)
    }

    // == Revisit ==
    /// Re-reads a key whose miss the caller already counted through [`get`](Self::get).
    ///
    /// An entry written in the meantime answers the lookup after all: a
    /// positive one is refreshed, and the miss is recounted as a hit. Expired
    /// negative entries are left for the next `get` to remove.
    pub fn revisit(&self, key: &K) -> Lookup<V> {
        let mut entry = match self.entries.get_mut(key) {
            Some(entry) => entry,
            None => return Lookup::Miss,
        };

        match entry.lookup(self.negative_ttl) {
            Lookup::Hit(value) => {
                entry.touch(self.next_seq());
                self.stats.record_late_hit();
                Lookup::Hit(value)
            }
            Lookup::Absent => {
                self.stats.record_late_negative_hit();
                Lookup::Absent
            }
            Lookup::Miss => Lookup::Miss,
        }
    }

    // == Set ==
    /// Inserts or overwrites a positive entry, then enforces the size bound.
    pub fn set(&self, key: K, value: V) {
        let seq = self.next_seq();
        self.entries.insert(key, CacheEntry::positive(value, seq));
        self.enforce_capacity();
    }

    // == Set Negative ==
    /// Records that `key` is known not to exist, then enforces the size bound.
    pub fn set_negative(&self, key: K) {
        let seq = self.next_seq();
        self.entries.insert(key, CacheEntry::negative(seq));
        self.enforce_capacity();
    }

    // == Remove ==
    /// Removes an entry. Returns true if one was present.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Enforce Capacity ==
    /// Evicts the oldest-accessed entries until the store fits its bound.
    ///
    /// Victims are taken from a snapshot; an entry refreshed or replaced after
    /// the snapshot keeps its place and is judged again on the next pass.
    ///
    /// Returns the number of entries removed.
    pub fn enforce_capacity(&self) -> usize {
        if self.policy.overflow(self.entries.len()) == 0 {
            return 0;
        }

        let _guard = self.eviction_lock.lock();

        let mut evicted = 0;
        // A pass can come up short when its victims were touched meanwhile
        while self.policy.overflow(self.entries.len()) > 0 {
            let snapshot: Vec<(K, u64)> = self
                .entries
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().access_seq()))
                .collect();

            for (key, seq) in self.policy.select_victims(snapshot) {
                if self
                    .entries
                    .remove_if(&key, |_, entry| entry.access_seq() == seq)
                    .is_some()
                {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            self.stats.record_evictions(evicted as u64);
            debug!(
                evicted,
                max_entries = self.policy.max_entries(),
                "evicted least recently accessed entries"
            );
        }
        evicted
    }

    // == Length ==
    /// Returns the current number of entries, positive and negative.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.policy.max_entries()
    }

    pub fn negative_ttl(&self) -> Duration {
        self.negative_ttl
    }
}
