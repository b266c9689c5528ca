//! Redis-backed store
//!
//! Expiry is enforced by Redis through `SET ... EX`; nothing is tracked on the
//! client side. Only compiled with the `redis` feature.

use crate::cache::{
    store::KeyValueStore,
    types::{CacheKey, CacheValue},
};
use crate::error::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Redis connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    pub url: String,

    /// Optional namespace prepended as `<prefix>:`; unset keeps keys verbatim
    #[serde(default)]
    pub prefix: Option<String>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            prefix: None,
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Key as written to Redis
    pub fn make_key(&self, key: &str) -> CacheKey {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Store backed by a Redis server
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    config: RedisStoreConfig,
}

impl RedisStore {
    /// Connect to the configured server
    pub async fn connect(config: RedisStoreConfig) -> Result<Self> {
        info!("Connecting field cache store to Redis at {}", config.url);

        let client = redis::Client::open(config.url.as_str())?;
        let manager = client.get_connection_manager().await?;

        Ok(Self::from_manager(manager, config))
    }

    /// Use an existing connection manager
    pub fn from_manager(manager: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self { manager, config }
    }

    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    /// Round-trip a `PING`
    pub async fn ping(&self) -> Result<bool> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let full_key = self.config.make_key(key);
        let mut conn = self.manager.clone();

        let value: Option<String> = redis::cmd("GET")
            .arg(&full_key)
            .query_async(&mut conn)
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64) -> Result<()> {
        // Redis rejects `EX 0`
        if ttl_seconds == 0 {
            debug!("Skipping Redis write with zero TTL: {}", key);
            return Ok(());
        }

        let full_key = self.config.make_key(key);
        let mut conn = self.manager.clone();

        redis::cmd("SET")
            .arg(&full_key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_key = self.config.make_key(key);
        let mut conn = self.manager.clone();

        redis::cmd("DEL")
            .arg(&full_key)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }
}
