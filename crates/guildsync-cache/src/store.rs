//! The cache/lock store contract.
//!
//! Everything above this layer shares one key space: directory response
//! caching, negative lookups, rate-limit snapshots, advisory sync locks
//! and loop-detection counters. The contract is deliberately small so a
//! networked backend (Redis-style) can implement it with single-key
//! atomic operations; no multi-key transactions are required.

use async_trait::async_trait;
use std::time::Duration;

use guildsync_core::DirectoryResult;

/// A TTL key→value store with advisory locks.
///
/// Values are serialized strings; expired entries read as absent.
///
/// Failure policy: the only error is `StoreUnavailable`, and every
/// caller treats it as a cache miss or an unlocked state (fail open).
/// Synchronization correctness is eventually consistent, so a degraded
/// store costs efficiency, never safety beyond an extra concurrent run.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a live entry.
    async fn get(&self, key: &str) -> DirectoryResult<Option<String>>;

    /// Writes an entry with a per-key TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> DirectoryResult<()>;

    /// Removes an entry. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> DirectoryResult<()>;

    /// Removes every entry whose key starts with `prefix`, returning how
    /// many were dropped. Used for bulk invalidation on unlink.
    async fn delete_prefix(&self, prefix: &str) -> DirectoryResult<u64>;

    /// Atomically acquires an advisory lock.
    ///
    /// Check-and-set semantics: returns `true` only for the caller that
    /// created the entry while no live entry existed. The lock expires
    /// on its own after `ttl`, so a crashed holder cannot wedge the key.
    async fn try_acquire_lock(&self, key: &str, ttl: Duration) -> DirectoryResult<bool>;

    /// Releases an advisory lock. Releasing an expired or foreign lock
    /// is a no-op.
    async fn release_lock(&self, key: &str) -> DirectoryResult<()>;

    /// Atomically increments a sliding-window counter.
    ///
    /// The first hit creates the entry with `window` as its TTL; later
    /// hits inside the window increment without extending it, so the
    /// count drops back to zero when the window expires. Returns the
    /// post-increment count.
    async fn incr(&self, key: &str, window: Duration) -> DirectoryResult<u64>;
}
