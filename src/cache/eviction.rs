//! Eviction Policy Module
//!
//! Oldest-accessed-first selection of entries to drop when the store overflows.

// == Eviction Policy ==
/// Keeps the store at or below a maximum entry count.
///
/// Selection is a full scan over a snapshot of `(key, access_seq)` pairs
/// rather than a maintained ordering, so reads never pay for bookkeeping.
/// It only runs when a write leaves the store over capacity.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    max_entries: usize,
}

impl EvictionPolicy {
    // == Constructor ==
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Overflow ==
    /// Number of entries that must go for a store holding `len` entries.
    pub fn overflow(&self, len: usize) -> usize {
        len.saturating_sub(self.max_entries)
    }

    // == Select Victims ==
    /// Picks the `overflow` entries with the smallest access sequence.
    ///
    /// The returned pairs keep the sequence number seen in the snapshot so the
    /// caller can skip entries that were refreshed or replaced in the meantime.
    /// Order among the victims is unspecified.
    pub fn select_victims<K>(&self, mut snapshot: Vec<(K, u64)>) -> Vec<(K, u64)> {
        let excess = self.overflow(snapshot.len());
        if excess == 0 {
            return Vec::new();
        }
        if excess < snapshot.len() {
            snapshot.select_nth_unstable_by_key(excess - 1, |(_, seq)| *seq);
            snapshot.truncate(excess);
        }
        snapshot
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_keys(victims: Vec<(&'static str, u64)>) -> Vec<&'static str> {
        let mut keys: Vec<_> = victims.into_iter().map(|(k, _)| k).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_overflow() {
        let policy = EvictionPolicy::new(3);
        assert_eq!(policy.overflow(0), 0);
        assert_eq!(policy.overflow(3), 0);
        assert_eq!(policy.overflow(5), 2);
    }

    #[test]
    fn test_within_capacity_selects_nothing() {
        let policy = EvictionPolicy::new(3);
        let victims = policy.select_victims(vec![("a", 1), ("b", 2), ("c", 3)]);
        assert!(victims.is_empty());
    }

    #[test]
    fn test_selects_oldest() {
        let policy = EvictionPolicy::new(2);
        let victims = policy.select_victims(vec![("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(victims, vec![("a", 1)]);
    }

    #[test]
    fn test_selects_oldest_regardless_of_snapshot_order() {
        let policy = EvictionPolicy::new(2);
        let snapshot = vec![("d", 40), ("a", 7), ("e", 50), ("b", 3), ("c", 30)];

        assert_eq!(sorted_keys(policy.select_victims(snapshot)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_capacity_evicts_everything() {
        let policy = EvictionPolicy::new(0);
        let victims = policy.select_victims(vec![("a", 1), ("b", 2)]);
        assert_eq!(sorted_keys(victims), vec!["a", "b"]);
    }
}
