//! guildsync cache/lock store
//!
//! A generic key→value store with per-key TTL, advisory locks and
//! sliding-window counters. It is the one shared mutable resource in
//! guildsync: directory response caching, negative lookups, rate-limit
//! snapshots, sync locks and loop counters all live in this key space.
//!
//! The [`CacheStore`] trait is the contract; [`MemoryStore`] is the
//! in-process implementation. Networked backends implement the same
//! trait with single-key atomic operations (the lock primitive must be
//! a conditional write, never read-then-write).
//!
//! # Example
//!
//! ```
//! use guildsync_cache::{CacheStore, MemoryStore};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new();
//! store.set("greeting", "hello", Duration::from_secs(60)).await.unwrap();
//! assert_eq!(store.get("greeting").await.unwrap().as_deref(), Some("hello"));
//!
//! // Advisory locks are first-writer-wins.
//! assert!(store.try_acquire_lock("job", Duration::from_secs(5)).await.unwrap());
//! assert!(!store.try_acquire_lock("job", Duration::from_secs(5)).await.unwrap());
//! # }
//! ```

pub mod keys;
pub mod memory;
pub mod store;

pub use memory::{CacheStats, MemoryStore};
pub use store::CacheStore;
