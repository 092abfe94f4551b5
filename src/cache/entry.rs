//! Cache Entry Module
//!
//! Defines individual cache entries, positive or negative, with recency metadata.

use std::time::{Duration, Instant};

// == Lookup ==
/// Result of probing the entry store for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Positive entry holding a fetched value
    Hit(V),
    /// Unexpired negative entry: the key is known not to exist
    Absent,
    /// No usable entry
    Miss,
}

impl<V> Lookup<V> {
    /// Returns true for `Hit` and `Absent`, the outcomes that must not trigger a fetch.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lookup::Miss)
    }

    /// Collapses the lookup to `Some(value)` for a hit, `None` otherwise.
    pub fn into_value(self) -> Option<V> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Absent | Lookup::Miss => None,
        }
    }
}

// == Cache Entry ==
/// A single cache entry with value and recency metadata.
///
/// `value == None` marks a negative entry: a memoized "not found".
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached payload, or `None` for a negative entry
    value: Option<V>,
    /// Time of creation or last positive read
    last_accessed: Instant,
    /// Store-wide sequence number of the last access, used to order evictions
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructors ==
    /// Creates a positive entry.
    pub fn positive(value: V, access_seq: u64) -> Self {
        Self::new(Some(value), access_seq)
    }

    /// Creates a negative entry.
    pub fn negative(access_seq: u64) -> Self {
        Self::new(None, access_seq)
    }

    fn new(value: Option<V>, access_seq: u64) -> Self {
        Self {
            value,
            last_accessed: Instant::now(),
            access_seq,
        }
    }

    // == Accessors ==
    /// The cached payload, `None` for a negative entry.
    pub fn payload(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_none()
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn access_seq(&self) -> u64 {
        self.access_seq
    }

    // == Touch ==
    /// Refreshes recency after a read.
    ///
    /// Both fields only move forward: a stale sequence number from a racing
    /// reader never rewinds the entry.
    pub fn touch(&mut self, access_seq: u64) {
        self.last_accessed = self.last_accessed.max(Instant::now());
        self.access_seq = self.access_seq.max(access_seq);
    }

    // == Is Expired ==
    /// Checks whether a negative entry has outlived `negative_ttl`.
    ///
    /// Positive entries never expire. A negative entry is expired once the
    /// full TTL has elapsed since it was written.
    pub fn is_expired(&self, negative_ttl: Duration) -> bool {
        self.is_negative() && self.last_accessed.elapsed() >= negative_ttl
    }

    /// Resolves the entry into a lookup outcome, treating expired negatives as misses.
    pub fn lookup(&self, negative_ttl: Duration) -> Lookup<V>
    where
        V: Clone,
    {
        match &self.value {
            Some(value) => Lookup::Hit(value.clone()),
            None if self.is_expired(negative_ttl) => Lookup::Miss,
            None => Lookup::Absent,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_positive_entry() {
        let entry = CacheEntry::positive("value".to_string(), 1);

        assert_eq!(entry.payload(), Some(&"value".to_string()));
        assert!(!entry.is_negative());
        assert!(!entry.is_expired(Duration::ZERO));
        assert_eq!(entry.lookup(Duration::ZERO), Lookup::Hit("value".to_string()));
    }

    #[test]
    fn test_negative_entry_within_ttl() {
        let entry: CacheEntry<String> = CacheEntry::negative(1);

        assert!(entry.is_negative());
        assert!(!entry.is_expired(Duration::from_secs(60)));
        assert_eq!(entry.lookup(Duration::from_secs(60)), Lookup::Absent);
    }

    #[test]
    fn test_negative_entry_expiration() {
        let entry: CacheEntry<String> = CacheEntry::negative(1);

        sleep(Duration::from_millis(30));

        assert!(entry.is_expired(Duration::from_millis(20)));
        assert_eq!(entry.lookup(Duration::from_millis(20)), Lookup::Miss);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry: CacheEntry<String> = CacheEntry::negative(1);

        // A zero TTL has always fully elapsed
        assert!(entry.is_expired(Duration::ZERO));
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut entry = CacheEntry::positive(1u32, 10);
        let before = entry.last_accessed();

        entry.touch(5);
        assert_eq!(entry.access_seq(), 10, "older sequence must not rewind");
        assert!(entry.last_accessed() >= before);

        entry.touch(42);
        assert_eq!(entry.access_seq(), 42);
    }

    #[test]
    fn test_lookup_helpers() {
        assert!(Lookup::Hit(1).is_cached());
        assert!(Lookup::<u8>::Absent.is_cached());
        assert!(!Lookup::<u8>::Miss.is_cached());

        assert_eq!(Lookup::Hit(3).into_value(), Some(3));
        assert_eq!(Lookup::<u8>::Absent.into_value(), None);
        assert_eq!(Lookup::<u8>::Miss.into_value(), None);
    }
}
