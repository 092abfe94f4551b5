//! Value Source Module
//!
//! The collaborator a cache fetch falls back to: a lookup that yields a value
//! or "not found", and an insert for newly created mappings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

// == Source Trait ==
/// Backing lookup consulted on cache misses.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the value stored under `key`, or `None` if there is none.
    async fn lookup(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores a new `key -> value` mapping.
    async fn insert(&self, key: String, value: String) -> anyhow::Result<()>;
}

// == Memory Source ==
/// In-process [`Source`] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored mappings.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn lookup(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn insert(&self, key: String, value: String) -> anyhow::Result<()> {
        self.entries.write().await.insert(key, value);
        Ok(())
    }
}
