//! Configuration for the in-memory store

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for [`InMemoryStore`](crate::cache::InMemoryStore)
///
/// The default is unbounded: entries leave the store only through TTL expiry
/// (checked lazily on read) or explicit deletes. Setting `max_entries` turns on
/// least-recently-used eviction once the limit is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Maximum number of entries, `None` for unbounded
    pub max_entries: Option<usize>,

    /// Enable hit/miss/eviction counters
    pub enable_metrics: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            enable_metrics: true,
        }
    }
}

impl MemoryStoreConfig {
    /// Create a new builder for store configuration
    pub fn builder() -> MemoryStoreConfigBuilder {
        MemoryStoreConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(CacheError::Config(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether LRU bookkeeping is needed
    pub fn is_bounded(&self) -> bool {
        self.max_entries.is_some()
    }
}

/// Builder for store configuration
#[derive(Debug, Default)]
pub struct MemoryStoreConfigBuilder {
    max_entries: Option<usize>,
    enable_metrics: Option<bool>,
}

impl MemoryStoreConfigBuilder {
    /// Bound the store to `max` entries with LRU eviction
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the store configuration
    pub fn build(self) -> MemoryStoreConfig {
        let defaults = MemoryStoreConfig::default();

        MemoryStoreConfig {
            max_entries: self.max_entries.or(defaults.max_entries),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}
