//! The connector object and its [`Directory`] implementation.

use async_trait::async_trait;
use std::sync::Arc;

use guildsync_cache::CacheStore;
use guildsync_core::{
    ChannelId, Directory, DirectoryMember, DirectoryResult, DirectoryRole, Message, RoleId, UserId,
};

use crate::config::{DiscordConfig, DiscordCredentials};
use crate::metrics::ApiMetrics;
use crate::rest_client::DiscordRestClient;

/// Directory connector for a single guild.
///
/// Construct one per guild and share it; all state (HTTP pool, rate
/// limit tracker, metrics) lives behind the embedded client.
pub struct DiscordDirectory {
    client: DiscordRestClient,
}

impl DiscordDirectory {
    /// Creates a connector.
    ///
    /// # Errors
    ///
    /// Returns [`guildsync_core::DirectoryError::Misconfigured`] when
    /// the configuration is invalid.
    pub fn new(
        config: DiscordConfig,
        credentials: DiscordCredentials,
        store: Arc<dyn CacheStore>,
    ) -> DirectoryResult<Self> {
        Ok(Self {
            client: DiscordRestClient::new(config, credentials, store)?,
        })
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &DiscordRestClient {
        &self.client
    }

    /// Returns a snapshot of request metrics.
    pub async fn metrics(&self) -> ApiMetrics {
        self.client.metrics().await
    }
}

#[async_trait]
impl Directory for DiscordDirectory {
    async fn list_roles(&self, force: bool) -> DirectoryResult<Vec<DirectoryRole>> {
        self.fetch_roles(force).await
    }

    async fn get_member(&self, user_id: UserId, force: bool) -> DirectoryResult<DirectoryMember> {
        self.fetch_member(user_id, force, false).await
    }

    async fn get_member_roles(&self, user_id: UserId, force: bool) -> DirectoryResult<Vec<RoleId>> {
        self.fetch_member(user_id, force, false)
            .await
            .map(|member| member.roles)
    }

    async fn is_member(
        &self,
        user_id: UserId,
        force: bool,
        sensitive: bool,
    ) -> DirectoryResult<bool> {
        self.check_member(user_id, force, sensitive).await
    }

    async fn set_member_roles(&self, user_id: UserId, roles: Vec<RoleId>) -> DirectoryResult<()> {
        self.replace_member_roles(user_id, roles).await
    }

    async fn post_message(&self, channel: ChannelId, message: &Message) -> DirectoryResult<()> {
        self.send_message(channel, message).await
    }
}
