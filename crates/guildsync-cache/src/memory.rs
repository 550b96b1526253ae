//! In-memory cache store with per-entry TTL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use guildsync_core::DirectoryResult;

use crate::store::CacheStore;

/// Internal entry wrapping a value with TTL metadata.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Cache statistics for health reporting.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total number of entries, live and expired.
    pub total_count: usize,
    /// Number of expired entries not yet purged.
    pub expired_count: usize,
}

/// In-memory TTL store.
///
/// All operations take one mutex, which is what makes
/// [`CacheStore::try_acquire_lock`] and [`CacheStore::incr`]
/// check-and-set rather than read-then-write. Expired entries are
/// dropped lazily on read and by [`MemoryStore::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn expiry(ttl: Duration) -> DateTime<Utc> {
        Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(0))
    }

    /// Removes all expired entries.
    pub async fn purge_expired(&self) {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Returns cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let entries = self.entries.lock().await;
        let total_count = entries.len();
        let expired_count = entries.values().filter(|e| e.is_expired(now)).count();
        CacheStats {
            total_count,
            expired_count,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> DirectoryResult<Option<String>> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DirectoryResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Self::expiry(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> DirectoryResult<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> DirectoryResult<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> DirectoryResult<bool> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(false),
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: Self::expiry(ttl),
                    },
                );
                Ok(true)
            }
        }
    }

    async fn release_lock(&self, key: &str) -> DirectoryResult<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, window: Duration) -> DirectoryResult<u64> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                let count = entry.value.parse::<u64>().unwrap_or(0) + 1;
                // The window is anchored at the first hit; incrementing
                // must not extend it.
                entry.value = count.to_string();
                Ok(count)
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: Self::expiry(window),
                    },
                );
                Ok(1)
            }
        }
    }
}
