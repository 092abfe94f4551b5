//! Coalescing Cache - a bounded in-memory cache that deduplicates concurrent fetches
//!
//! Concurrent misses on one key share a single fetch, "not found" results are
//! remembered for a configurable TTL, and the least recently accessed entries
//! are evicted to stay within a size bound.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod source;

pub use api::AppState;
pub use cache::{CacheStats, CoalescingCache, Lookup};
pub use config::Config;
pub use error::{CacheError, Result};
pub use source::{MemorySource, Source};
