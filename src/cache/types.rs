//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - string literal in one of the two documented formats
pub type CacheKey = String;

/// Cache value type - JSON text produced by the decorator
pub type CacheValue = String;

/// JSON object used for parent values and field arguments
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// How a field invocation is addressed in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKeyType {
    /// Keyed by the identity of the returned node: `Type.id`
    NodeId,

    /// Keyed by the parent node, the field and its arguments:
    /// `Parent{id}.field(args)`
    ParentField,
}

impl fmt::Display for CacheKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKeyType::NodeId => write!(f, "node-id"),
            CacheKeyType::ParentField => write!(f, "parent-field"),
        }
    }
}

/// Visibility of a cached value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheScope {
    /// Shared by every requester
    #[default]
    Public,

    /// Visible to a single session only
    Private,
}

/// Per-field caching policy supplied by the query engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheHint {
    /// Maximum age in seconds; `None` or `0` disables caching
    pub max_age: Option<u64>,

    /// Visibility scope
    pub scope: CacheScope,
}

impl CacheHint {
    /// Public hint with the given max-age
    pub fn public(max_age: u64) -> Self {
        Self {
            max_age: Some(max_age),
            scope: CacheScope::Public,
        }
    }

    /// Private hint with the given max-age
    pub fn private(max_age: u64) -> Self {
        Self {
            max_age: Some(max_age),
            scope: CacheScope::Private,
        }
    }

    /// Hint that never caches
    pub fn uncached() -> Self {
        Self::default()
    }

    /// TTL to write with, if the hint allows storing at all
    pub fn ttl_seconds(&self) -> Option<u64> {
        self.max_age.filter(|age| *age > 0)
    }
}

/// Statistics for the in-memory store
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Number of evictions due to the entry limit
    pub evictions_size: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,

    /// Number of explicit deletes
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.total_evictions()
        )
    }
}
