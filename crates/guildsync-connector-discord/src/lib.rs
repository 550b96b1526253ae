//! Discord guild directory connector for guildsync
//!
//! This crate implements the `guildsync-core` [`guildsync_core::Directory`]
//! trait against a Discord-style guild REST API, with the quota and
//! failure handling bulk synchronization needs:
//!
//! - Cached GET responses with endpoint-class lifetimes (role lists
//!   long-lived, member records short, shorter still in sensitive flows)
//! - Negative caching of "member not found" lookups
//! - Quota tracking from `X-RateLimit-*` headers, shared across
//!   processes through the cache store
//! - A soft backpressure valve when the remaining quota is nearly gone
//! - Exponential backoff with jitter on transient failures, and
//!   server-directed waits (plus a safety buffer) on 429
//! - Request metrics with a 30-day daily rolling window
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use guildsync_cache::MemoryStore;
//! use guildsync_connector_discord::{DiscordConfig, DiscordCredentials, DiscordDirectory};
//! use guildsync_core::{Directory, GuildId, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiscordConfig::new(GuildId::new(197038439483310086));
//! let credentials = DiscordCredentials::new(std::env::var("BOT_TOKEN")?);
//! let directory = DiscordDirectory::new(config, credentials, Arc::new(MemoryStore::new()))?;
//!
//! let roles = directory.list_roles(false).await?;
//! println!("{} roles, most senior first", roles.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod directory;
mod guild_roles;
mod members;
mod messages;
mod metrics;
mod rate_limit;
mod rest_client;

// Re-exports
pub use config::{DiscordConfig, DiscordCredentials, RateLimitConfig};
pub use directory::DiscordDirectory;
pub use metrics::{ApiMetrics, DailyStats};
pub use rate_limit::{parse_retry_after, RateLimitSnapshot, RateLimitTracker, GLOBAL_BUCKET};
pub use rest_client::{CachePolicy, DiscordRestClient};
