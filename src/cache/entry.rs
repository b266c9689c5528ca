//! Cache entry with absolute expiry, owned by the in-memory store

use crate::cache::types::CacheValue;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored value and the instant it stops being served
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    /// Serialized value
    pub value: CacheValue,

    /// When the entry expires
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` after `now`
    pub fn created_at(value: CacheValue, ttl: Duration, now: DateTime<Utc>) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self { value, expires_at }
    }

    /// Check if the entry has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_entry_creation() {
        let now = Utc::now();
        let entry = CacheEntry::created_at("\"value\"".to_string(), Duration::from_secs(3600), now);
        assert_eq!(entry.value, "\"value\"");
        assert_eq!(entry.expires_at, now + chrono::Duration::hours(1));
        assert!(!entry.is_expired_at(now));
    }

    #[test]
    fn test_entry_expiration_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::created_at("1".to_string(), Duration::from_secs(10), now);

        assert!(!entry.is_expired_at(now));
        assert!(!entry.is_expired_at(now + chrono::Duration::seconds(9)));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(10)));
        assert!(entry.is_expired_at(now + chrono::Duration::seconds(15)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let now = Utc::now();
        let entry = CacheEntry::created_at("1".to_string(), Duration::from_secs(u64::MAX), now);
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!entry.is_expired_at(now));
    }
}
