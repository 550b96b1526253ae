//! Shared helpers for connector integration tests.

#![allow(dead_code)] // not every test binary exercises every helper

use std::sync::Arc;

use guildsync_cache::MemoryStore;
use guildsync_connector_discord::{
    DiscordConfig, DiscordCredentials, DiscordDirectory, RateLimitConfig,
};
use guildsync_core::GuildId;
use wiremock::MockServer;

/// The guild every test talks to.
pub const TEST_GUILD: u64 = 1;

/// Builds a connector pointed at the mock server, with fast test timings.
pub fn directory_for(server: &MockServer) -> DiscordDirectory {
    directory_with_store(server, Arc::new(MemoryStore::new()))
}

/// Builds a connector sharing the given store.
pub fn directory_with_store(server: &MockServer, store: Arc<MemoryStore>) -> DiscordDirectory {
    let config = DiscordConfig::new(GuildId::new(TEST_GUILD))
        .with_api_base(server.uri())
        .with_rate_limit(RateLimitConfig::for_testing());

    DiscordDirectory::new(config, DiscordCredentials::new("test-token"), store)
        .expect("test config should be valid")
}

/// A guild role as the API returns it.
pub fn role_json(id: u64, name: &str, position: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id.to_string(),
        "name": name,
        "position": position,
        "color": 0,
        "hoist": false,
        "managed": false,
        "mentionable": false
    })
}

/// A guild member as the API returns it.
pub fn member_json(user_id: u64, nick: Option<&str>, roles: &[u64]) -> serde_json::Value {
    serde_json::json!({
        "user": {
            "id": user_id.to_string(),
            "username": format!("user{user_id}")
        },
        "nick": nick,
        "roles": roles.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        "joined_at": "2024-03-01T12:00:00.000000+00:00"
    })
}

/// The standard 429 body the API sends alongside the Retry-After header.
pub fn rate_limited_json(retry_after: f64) -> serde_json::Value {
    serde_json::json!({
        "message": "You are being rate limited.",
        "retry_after": retry_after,
        "global": false
    })
}
