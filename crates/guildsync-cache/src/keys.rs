//! Canonical cache-key builders.
//!
//! Every layer that touches the shared store goes through these, so
//! writers, readers and invalidation agree on the namespace. Member-scoped
//! keys share the prefix returned by [`member_prefix`], which is what
//! unlink-time bulk invalidation deletes.

use guildsync_core::{GuildId, LocalUserId, UserId};

/// Key for the cached guild role list.
#[must_use]
pub fn guild_roles(guild: GuildId) -> String {
    format!("directory:{guild}:roles")
}

/// Key for a cached member record.
#[must_use]
pub fn member(guild: GuildId, user: UserId) -> String {
    format!("directory:{guild}:member:{user}:record")
}

/// Key for the negative "member not found" marker. Distinct from the
/// member record so a 404 and a transport error never collide.
#[must_use]
pub fn member_negative(guild: GuildId, user: UserId) -> String {
    format!("directory:{guild}:member:{user}:negative")
}

/// Prefix covering every member-scoped key for bulk invalidation.
///
/// Ends with the separator so user `7` never shadows user `71`.
#[must_use]
pub fn member_prefix(guild: GuildId, user: UserId) -> String {
    format!("directory:{guild}:member:{user}:")
}

/// Key for the shared rate-limit snapshot of a bucket.
#[must_use]
pub fn rate_limit(bucket: &str) -> String {
    format!("ratelimit:{bucket}")
}

/// Key for the short-lived cooldown marker written after a 429.
#[must_use]
pub fn rate_limit_cooldown(bucket: &str) -> String {
    format!("ratelimit:{bucket}:cooldown")
}

/// Key for the advisory sync lock of one (identity, direction) pair.
#[must_use]
pub fn sync_lock(direction: &str, local_id: LocalUserId) -> String {
    format!("sync:{direction}:{local_id}:lock")
}

/// Key for the loop-detection attempt counter of one (identity,
/// direction) pair.
#[must_use]
pub fn sync_attempts(direction: &str, local_id: LocalUserId) -> String {
    format!("sync:{direction}:{local_id}:attempts")
}

/// Prefix covering one identity's sync bookkeeping in one direction.
#[must_use]
pub fn sync_prefix(direction: &str, local_id: LocalUserId) -> String {
    format!("sync:{direction}:{local_id}:")
}
