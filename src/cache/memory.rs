//! Process-local store with lazy TTL eviction

use crate::cache::{
    config::MemoryStoreConfig,
    entry::CacheEntry,
    store::KeyValueStore,
    types::{CacheKey, CacheStats, CacheValue},
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Source of the current time, injectable for tests
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// In-memory key-value store
///
/// This implementation provides:
/// - Thread-safe async access via RwLock
/// - Lazy TTL expiry: an expired entry is removed by the read that finds it
/// - Optional LRU eviction when `max_entries` is configured
///
/// Clones share the same backing map.
#[derive(Clone)]
pub struct InMemoryStore {
    config: MemoryStoreConfig,
    store: Arc<RwLock<MemoryStore>>,
    clock: Clock,
}

/// Internal storage
#[derive(Default)]
struct MemoryStore {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// Access order, least recent first; only maintained when bounded
    lru_queue: VecDeque<CacheKey>,

    stats: CacheStats,
}

impl InMemoryStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create a store with the given configuration
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        info!("Initializing in-memory field cache store with config: {:?}", config);

        Self {
            config,
            store: Arc::new(RwLock::new(MemoryStore::default())),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used for expiry decisions
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Check if a live key exists (without touching LRU order or stats)
    pub async fn contains_key(&self, key: &str) -> bool {
        let now = (self.clock)();
        let store = self.store.read().await;
        store
            .entries
            .get(key)
            .map(|entry| !entry.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = (self.clock)();
        let mut store = self.store.write().await;

        let expired: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(&mut store, key);
        }
        if self.config.enable_metrics {
            store.stats.evictions_ttl += expired.len() as u64;
        }

        if !expired.is_empty() {
            debug!("Purged {} expired entries", expired.len());
        }
        expired.len()
    }

    /// Clear all entries from the store
    pub async fn clear(&self) {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.stats.entries = 0;

        info!("Cleared {} entries from in-memory store", count);
    }

    /// Get store statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let mut stats = store.stats.clone();
        stats.entries = store.entries.len();
        stats
    }

    /// Number of stored entries, including expired ones not yet read
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let store = self.store.read().await;
        store.entries.is_empty()
    }

    fn remove_entry(&self, store: &mut MemoryStore, key: &str) -> Option<CacheEntry> {
        let entry = store.entries.remove(key)?;
        if self.config.is_bounded() {
            store.lru_queue.retain(|k| k != key);
        }
        Some(entry)
    }

    fn touch(&self, store: &mut MemoryStore, key: &str) {
        if self.config.is_bounded() {
            store.lru_queue.retain(|k| k != key);
            store.lru_queue.push_back(key.to_string());
        }
    }

    /// Make room for one new key
    fn evict_if_needed(&self, store: &mut MemoryStore) {
        let Some(max_entries) = self.config.max_entries else {
            return;
        };

        while store.entries.len() >= max_entries {
            let Some(key) = store.lru_queue.pop_front() else {
                break;
            };
            debug!("Evicting entry due to max_entries limit: {}", key);
            store.entries.remove(&key);
            if self.config.enable_metrics {
                store.stats.evictions_size += 1;
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let now = (self.clock)();
        let mut store = self.store.write().await;
        let metrics = self.config.enable_metrics;

        let Some(entry) = store.entries.get(key) else {
            if metrics {
                store.stats.misses += 1;
            }
            return Ok(None);
        };

        if entry.is_expired_at(now) {
            debug!("Cache entry expired: {}", key);
            self.remove_entry(&mut store, key);
            if metrics {
                store.stats.misses += 1;
                store.stats.evictions_ttl += 1;
            }
            return Ok(None);
        }

        let value = entry.value.clone();
        self.touch(&mut store, key);
        if metrics {
            store.stats.hits += 1;
        }

        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: CacheValue, ttl_seconds: u64) -> Result<()> {
        let entry = CacheEntry::created_at(value, Duration::from_secs(ttl_seconds), (self.clock)());
        let mut store = self.store.write().await;

        if !store.entries.contains_key(key) {
            self.evict_if_needed(&mut store);
        }
        store.entries.insert(key.to_string(), entry);
        self.touch(&mut store, key);

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;

        if self.remove_entry(&mut store, key).is_some() {
            if self.config.enable_metrics {
                store.stats.invalidations += 1;
            }
            debug!("Removed cache entry: {}", key);
        }

        Ok(())
    }
}
