//! Cache Module
//!
//! Provides an in-memory cache that coalesces concurrent fetches per key,
//! remembers "not found" results for a bounded time, and evicts the least
//! recently accessed entries to stay within a size bound.

mod coalescing;
mod coordinator;
mod entry;
mod eviction;
mod stats;
mod store;


// Re-export public types
pub use coalescing::CoalescingCache;
pub use coordinator::FetchCoordinator;
pub use entry::{CacheEntry, Lookup};
pub use eviction::EvictionPolicy;
pub use stats::{CacheStats, StatsRecorder};
pub use store::EntryStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
