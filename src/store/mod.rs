//! Pluggable key-value store backends.
//!
//! The cache link talks to its store through the minimal [`CacheStore`]
//! capability trait — `get` and `set` over ASCII keys and serialized text
//! values. Any compliant backend substitutes: a networked store in
//! production, the bundled [`MemoryStore`] in tests and demos. The store is
//! trusted to serialize its own operations; the link never locks around it.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors produced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asynchronous key-value access, the only capability the cache link needs.
///
/// Both operations are fallible; the link degrades gracefully on failure
/// (a failed read forces a backend call, a failed write is logged and
/// dropped). Implementations must be safe to share across tasks.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store backed by a mutex-guarded map.
///
/// Infallible by construction; intended for tests, demos, and
/// single-process deployments that do not need a shared store.
///
/// # Examples
///
/// ```
/// use swr_link::{CacheStore, MemoryStore};
///
/// # async fn example() -> Result<(), swr_link::StoreError> {
/// let store = MemoryStore::new();
/// store.set("k", "v").await?;
/// assert_eq!(store.get("k").await?.as_deref(), Some("v"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip() {
        let store = MemoryStore::new();
        store.set("key", "value").await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn absent_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite() {
        let store = MemoryStore::new();
        store.set("key", "old").await.unwrap();
        store.set("key", "new").await.unwrap();
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("new"));
    }
}
