//! Environment-driven configuration
//!
//! Environment variables (a `.env` file is loaded first when present):
//!
//! | Variable                      | Meaning                                   | Default   |
//! |-------------------------------|-------------------------------------------|-----------|
//! | `FIELD_CACHE_REDIS_URL`       | Use Redis at this URL (`redis` feature)   | unset     |
//! | `FIELD_CACHE_REDIS_PREFIX`    | Namespace for Redis keys                  | unset     |
//! | `FIELD_CACHE_MAX_ENTRIES`     | LRU bound of the in-memory store          | unbounded |
//! | `FIELD_CACHE_METRICS`         | Track in-memory store statistics          | `true`    |
//! | `FIELD_CACHE_NULL`            | Store and serve null results              | `false`   |
//! | `FIELD_CACHE_PRIVATE_SCOPE`   | `bypass` or `unscoped`                    | `bypass`  |

use crate::cache::{
    CacheDefaults, CacheOption, InMemoryStore, MemoryStoreConfig, PrivateScopePolicy, SharedStore,
};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tracing::info;

pub const ENV_REDIS_URL: &str = "FIELD_CACHE_REDIS_URL";
pub const ENV_REDIS_PREFIX: &str = "FIELD_CACHE_REDIS_PREFIX";
pub const ENV_MAX_ENTRIES: &str = "FIELD_CACHE_MAX_ENTRIES";
pub const ENV_METRICS: &str = "FIELD_CACHE_METRICS";
pub const ENV_CACHE_NULL: &str = "FIELD_CACHE_NULL";
pub const ENV_PRIVATE_SCOPE: &str = "FIELD_CACHE_PRIVATE_SCOPE";

/// Process-level cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default)]
    pub redis_prefix: Option<String>,

    #[serde(default)]
    pub max_entries: Option<usize>,

    #[serde(default = "default_enable_metrics")]
    pub enable_metrics: bool,

    #[serde(default)]
    pub cache_null: bool,

    #[serde(default)]
    pub private_scope_policy: PrivateScopePolicy,
}

fn default_enable_metrics() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_prefix: None,
            max_entries: None,
            enable_metrics: default_enable_metrics(),
            cache_null: false,
            private_scope_policy: PrivateScopePolicy::default(),
        }
    }
}

impl CacheSettings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let max_entries = match non_empty(ENV_MAX_ENTRIES) {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                CacheError::Config(format!("{} must be a positive integer: {}", ENV_MAX_ENTRIES, e))
            })?),
            None => None,
        };

        let private_scope_policy = match non_empty(ENV_PRIVATE_SCOPE) {
            Some(raw) => parse_policy(raw.trim())?,
            None => PrivateScopePolicy::default(),
        };

        let settings = Self {
            redis_url: non_empty(ENV_REDIS_URL),
            redis_prefix: non_empty(ENV_REDIS_PREFIX),
            max_entries,
            enable_metrics: match non_empty(ENV_METRICS) {
                Some(raw) => parse_flag(ENV_METRICS, raw.trim())?,
                None => default_enable_metrics(),
            },
            cache_null: match non_empty(ENV_CACHE_NULL) {
                Some(raw) => parse_flag(ENV_CACHE_NULL, raw.trim())?,
                None => false,
            },
            private_scope_policy,
        };

        settings.memory_config().validate()?;
        Ok(settings)
    }

    /// Configuration of the in-memory store
    pub fn memory_config(&self) -> MemoryStoreConfig {
        let mut builder = MemoryStoreConfig::builder().enable_metrics(self.enable_metrics);
        if let Some(max) = self.max_entries {
            builder = builder.max_entries(max);
        }
        builder.build()
    }

    /// Open the configured store
    ///
    /// Redis is used when a URL is set and the `redis` feature is enabled;
    /// otherwise an in-memory store is created.
    pub async fn build_store(&self) -> Result<SharedStore> {
        if let Some(url) = &self.redis_url {
            #[cfg(feature = "redis")]
            {
                use crate::cache::{RedisStore, RedisStoreConfig};

                let mut config = RedisStoreConfig::new(url.clone());
                if let Some(prefix) = &self.redis_prefix {
                    config = config.with_prefix(prefix.clone());
                }
                let store = RedisStore::connect(config).await?;
                return Ok(Arc::new(store));
            }

            #[cfg(not(feature = "redis"))]
            tracing::warn!(
                "{} is set to {} but the redis feature is disabled, using in-memory store",
                ENV_REDIS_URL, url
            );
        }

        let config = self.memory_config();
        config.validate()?;
        info!("Using in-memory field cache store");
        Ok(Arc::new(InMemoryStore::with_config(config)))
    }

    /// Decorator defaults around the given store
    pub fn defaults<C>(&self, store: SharedStore) -> CacheDefaults<C> {
        let mut defaults = CacheDefaults::with_store(store);
        defaults.set_default(CacheOption::CacheNull(self.cache_null));
        defaults.set_default(CacheOption::PrivateScopePolicy(self.private_scope_policy));
        defaults
    }
}

fn parse_policy(raw: &str) -> Result<PrivateScopePolicy> {
    match raw.to_ascii_lowercase().as_str() {
        "bypass" => Ok(PrivateScopePolicy::Bypass),
        "unscoped" => Ok(PrivateScopePolicy::Unscoped),
        other => Err(CacheError::Config(format!(
            "{} must be 'bypass' or 'unscoped', got '{}'",
            ENV_PRIVATE_SCOPE, other
        ))),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(CacheError::Config(format!(
            "{} must be 'true' or 'false', got '{}'",
            name, other
        ))),
    }
}
