//! Diagnostics emitted by the cache-aside decorator
//!
//! Each decision point of an invocation produces one [`CacheEvent`]. Events go
//! to the configured [`CacheEventSink`]; the default sink writes them to
//! `tracing` at the level returned by [`CacheEvent::level`].

use crate::cache::types::CacheKey;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn, Level};

/// One observable step of a cached field resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// No identity could be derived; resolved uncached
    SkipNoKey { field: String },

    /// Private hint without a session id; resolved uncached
    SkipNoSession { field: String },

    /// Private hint without a session id, cached without a session prefix
    UnscopedPrivate { field: String, key: CacheKey },

    /// Served from the store
    Hit { key: CacheKey },

    /// Not in the store (or a null entry that may not be served)
    Miss { key: CacheKey },

    /// Stored text could not be decoded; treated as a miss
    ParseError { key: CacheKey, error: String },

    /// Store read failed; treated as a miss
    StoreReadError { key: CacheKey, error: String },

    /// Result written back
    Stored { key: CacheKey, ttl_seconds: u64 },

    /// Result could not be encoded or written; ignored
    StoreWriteError { key: CacheKey, error: String },
}

impl CacheEvent {
    /// Severity used by the tracing sink
    pub fn level(&self) -> Level {
        match self {
            CacheEvent::SkipNoKey { .. }
            | CacheEvent::SkipNoSession { .. }
            | CacheEvent::UnscopedPrivate { .. } => Level::WARN,
            _ => Level::DEBUG,
        }
    }

    /// Key the event concerns, if one was derived
    pub fn key(&self) -> Option<&str> {
        match self {
            CacheEvent::SkipNoKey { .. } | CacheEvent::SkipNoSession { .. } => None,
            CacheEvent::UnscopedPrivate { key, .. }
            | CacheEvent::Hit { key }
            | CacheEvent::Miss { key }
            | CacheEvent::ParseError { key, .. }
            | CacheEvent::StoreReadError { key, .. }
            | CacheEvent::Stored { key, .. }
            | CacheEvent::StoreWriteError { key, .. } => Some(key),
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheEvent::SkipNoKey { field } => {
                write!(f, "skipping cache for field {}: no cache key", field)
            }
            CacheEvent::SkipNoSession { field } => write!(
                f,
                "skipping cache for field {}: private scope without session id",
                field
            ),
            CacheEvent::UnscopedPrivate { field, key } => write!(
                f,
                "caching private field {} without session scope: {}",
                field, key
            ),
            CacheEvent::Hit { key } => write!(f, "cache hit: {}", key),
            CacheEvent::Miss { key } => write!(f, "cache miss: {}", key),
            CacheEvent::ParseError { key, error } => {
                write!(f, "cache entry {} could not be decoded: {}", key, error)
            }
            CacheEvent::StoreReadError { key, error } => {
                write!(f, "cache read failed for {}: {}", key, error)
            }
            CacheEvent::Stored { key, ttl_seconds } => {
                write!(f, "cached {} for {}s", key, ttl_seconds)
            }
            CacheEvent::StoreWriteError { key, error } => {
                write!(f, "cache write failed for {}: {}", key, error)
            }
        }
    }
}

/// Receiver of cache events
pub trait CacheEventSink: Send + Sync {
    fn record(&self, event: &CacheEvent);
}

/// Sink handle shared by decorated resolvers
pub type SharedSink = Arc<dyn CacheEventSink>;

/// Default sink writing events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl CacheEventSink for TracingSink {
    fn record(&self, event: &CacheEvent) {
        if event.level() == Level::WARN {
            warn!("{}", event);
        } else {
            debug!("{}", event);
        }
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl CacheEventSink for NoopSink {
    fn record(&self, _event: &CacheEvent) {}
}
