//! Key-value store abstraction used by the cache-aside layer
//!
//! Values are opaque text at this boundary. The decorator serializes results
//! to JSON before `set` and parses them after `get`.

use crate::cache::types::CacheValue;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Asynchronous key-value store with per-entry TTL
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value for a key, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Set the value for a key, expiring after `ttl_seconds`
    async fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64) -> Result<()>;

    /// Remove the value for a key
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Store handle shared between decorated resolvers
pub type SharedStore = Arc<dyn KeyValueStore>;

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64) -> Result<()> {
        (**self).set(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }
}
