//! Member lookups and role writes.
//!
//! A 404 on a member lookup is the expected "not a member" outcome and
//! is cached as a distinct negative marker, so repeated probes for a
//! non-member stay off the network. Any later successful lookup clears
//! the marker immediately.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use guildsync_cache::keys;
use guildsync_core::{DirectoryError, DirectoryMember, DirectoryResult, RoleId, UserId};

use crate::directory::DiscordDirectory;
use crate::rest_client::CachePolicy;

/// Wire shape of a guild member response.
#[derive(Debug, Deserialize)]
struct WireMember {
    user: WireUser,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<RoleId>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: UserId,
}

impl From<WireMember> for DirectoryMember {
    fn from(wire: WireMember) -> Self {
        Self {
            user_id: wire.user.id,
            nick: wire.nick,
            roles: wire.roles,
        }
    }
}

impl DiscordDirectory {
    fn member_path(&self, user_id: UserId) -> String {
        format!(
            "/guilds/{}/members/{}",
            self.client().config().guild_id,
            user_id
        )
    }

    /// Fetches a member record.
    ///
    /// `sensitive` marks interactive flows (checkout-style): the request
    /// gets the shorter timeout and a materially shorter cache lifetime
    /// so a stale record cannot block a transaction.
    #[instrument(skip(self))]
    pub async fn fetch_member(
        &self,
        user_id: UserId,
        force: bool,
        sensitive: bool,
    ) -> DirectoryResult<DirectoryMember> {
        let config = self.client().config();
        let guild_id = config.guild_id;
        let store = self.client().store();
        let negative_key = keys::member_negative(guild_id, user_id);

        if !force {
            match store.get(&negative_key).await {
                Ok(Some(_)) => {
                    debug!(user_id = %user_id, "Negative cache hit, member known absent");
                    return Err(DirectoryError::not_found(
                        "member",
                        Some(user_id.to_string()),
                    ));
                }
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Negative cache read failed, probing"),
            }
        }

        let ttl = if sensitive {
            Duration::from_secs(config.sensitive_member_cache_ttl_secs)
        } else {
            Duration::from_secs(config.member_cache_ttl_secs)
        };
        let negative_ttl = Duration::from_secs(config.negative_cache_ttl_secs);

        let result = self
            .client()
            .get_json::<WireMember>(
                &self.member_path(user_id),
                Some(CachePolicy {
                    key: keys::member(guild_id, user_id),
                    ttl,
                }),
                force,
                sensitive,
            )
            .await;

        match result {
            Ok(wire) => {
                // A member exists; the absence marker is now a lie.
                let _ = store.delete(&negative_key).await;
                Ok(wire.into())
            }
            Err(e) if e.is_not_found() => {
                let _ = store.set(&negative_key, "1", negative_ttl).await;
                Err(DirectoryError::not_found(
                    "member",
                    Some(user_id.to_string()),
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the user is a member, preferring cached records over a
    /// fresh probe.
    #[instrument(skip(self))]
    pub async fn check_member(
        &self,
        user_id: UserId,
        force: bool,
        sensitive: bool,
    ) -> DirectoryResult<bool> {
        match self.fetch_member(user_id, force, sensitive).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replaces the member's full role set with one bulk call.
    ///
    /// Never issues incremental add/remove calls; the single write both
    /// minimizes API traffic and shrinks the race window against other
    /// writers.
    #[instrument(skip(self, roles), fields(role_count = roles.len()))]
    pub async fn replace_member_roles(
        &self,
        user_id: UserId,
        roles: Vec<RoleId>,
    ) -> DirectoryResult<()> {
        let guild_id = self.client().config().guild_id;

        let body = serde_json::json!({ "roles": roles });
        self.client()
            .patch_json(&self.member_path(user_id), &body)
            .await?;

        // The cached record (and any absence marker) is stale now.
        let _ = self
            .client()
            .store()
            .delete_prefix(&keys::member_prefix(guild_id, user_id))
            .await;

        Ok(())
    }
}
