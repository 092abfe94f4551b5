//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and fetch coalescing.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Recorder ==
/// Lock-free counters shared by the entry store and the fetch coordinator.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    negative_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    fetches: AtomicU64,
    coalesced: AtomicU64,
    fetch_failures: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_negative_hit(&self) {
        self.negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A lookup already counted as a miss was answered by a positive entry.
    pub fn record_late_hit(&self) {
        self.misses.fetch_sub(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late_negative_hit(&self) {
        self.misses.fetch_sub(1, Ordering::Relaxed);
        self.negative_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// A factory was invoked for a new fetch episode.
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller attached to a fetch already in flight.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads all counters into a serializable snapshot.
    pub fn snapshot(&self, total_entries: usize, pending_fetches: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            total_entries,
            pending_fetches,
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered by a positive entry
    pub hits: u64,
    /// Lookups answered by an unexpired negative entry
    pub negative_hits: u64,
    /// Lookups that found no usable entry
    pub misses: u64,
    /// Entries removed to respect the size bound
    pub evictions: u64,
    /// Factory invocations
    pub fetches: u64,
    /// Callers that shared another caller's in-flight fetch
    pub coalesced: u64,
    /// Factory invocations that failed
    pub fetch_failures: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Fetches currently in flight
    pub pending_fetches: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate, counting negative hits as hits.
    ///
    /// Returns 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let answered = self.hits + self.negative_hits;
        let total = answered + self.misses;
        if total == 0 {
            0.0
        } else {
            answered as f64 / total as f64
        }
    }
}
