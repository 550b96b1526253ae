//! Guild role list retrieval.

use std::time::Duration;
use tracing::instrument;

use guildsync_cache::keys;
use guildsync_core::{DirectoryResult, DirectoryRole};

use crate::directory::DiscordDirectory;
use crate::rest_client::CachePolicy;

impl DiscordDirectory {
    /// Fetches all roles defined on the guild, sorted by descending
    /// hierarchy position. The priority resolver depends on this order.
    #[instrument(skip(self))]
    pub async fn fetch_roles(&self, force: bool) -> DirectoryResult<Vec<DirectoryRole>> {
        let config = self.client().config();
        let path = format!("/guilds/{}/roles", config.guild_id);

        let mut roles: Vec<DirectoryRole> = self
            .client()
            .get_json(
                &path,
                Some(CachePolicy {
                    key: keys::guild_roles(config.guild_id),
                    ttl: Duration::from_secs(config.role_cache_ttl_secs),
                }),
                force,
                false,
            )
            .await?;

        roles.sort_by(|a, b| b.position.cmp(&a.position));
        Ok(roles)
    }
}
