//! The boundary facade.
//!
//! Surrounding functionality (OAuth handlers, role-change hooks,
//! checkout and notification collaborators, bulk-action UIs) calls into
//! the core exclusively through [`GuildSync`]. Everything is injected
//! through the builder; there is no global state.

use std::sync::Arc;

use guildsync_cache::{keys, CacheStore};
use guildsync_core::{
    ChannelId, Directory, DirectoryResult, GuildId, IdentityLinkStore, LinkError, LocalRoleStore,
    LocalUserId, Message, RoleId, UserId,
};
use tracing::{debug, info};

use crate::batch::{BatchProgress, BatchRunner, BatchSummary};
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::outcome::{SyncDirection, SyncOutcome};
use crate::settings::SyncSettings;

/// The assembled core: engine, batch runner and read surface.
pub struct GuildSync {
    guild_id: GuildId,
    engine: Arc<SyncEngine>,
    batch: BatchRunner,
    directory: Arc<dyn Directory>,
    store: Arc<dyn CacheStore>,
    links: Arc<dyn IdentityLinkStore>,
}

impl GuildSync {
    /// Starts building a service.
    #[must_use]
    pub fn builder() -> GuildSyncBuilder {
        GuildSyncBuilder::default()
    }

    /// Returns the engine, for hosts that need direction-level access.
    #[must_use]
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Links a local account to a directory account. Called by the
    /// OAuth collaborator after a successful handshake; the caller
    /// usually follows up with a forced [`Self::sync_external_to_local`].
    pub async fn link_identity(
        &self,
        local_id: LocalUserId,
        external_id: UserId,
    ) -> Result<(), LinkError> {
        self.links.link(local_id, external_id).await?;
        info!(user = %local_id, external = %external_id, "Linked identity");
        Ok(())
    }

    /// Removes a link and drops every cache entry that described the
    /// identity, so a later re-link starts from a clean slate.
    pub async fn unlink_identity(&self, local_id: LocalUserId) -> SyncResult<()> {
        let Some(external_id) = self.links.unlink(local_id).await? else {
            debug!(user = %local_id, "Unlink requested for an unlinked account");
            return Ok(());
        };

        // Cached member state, the negative marker, and both directions'
        // sync bookkeeping are all stale once the link is gone. Failures
        // here are tolerable: every entry is TTL-bounded anyway.
        let member_prefix = keys::member_prefix(self.guild_id, external_id);
        let _ = self.store.delete_prefix(&member_prefix).await;
        for direction in [SyncDirection::ToLocal, SyncDirection::ToExternal] {
            let _ = self
                .store
                .delete_prefix(&keys::sync_prefix(direction.key_name(), local_id))
                .await;
        }

        info!(user = %local_id, external = %external_id, "Unlinked identity");
        Ok(())
    }

    /// Direction A entry point, for login/event handlers and "sync now"
    /// actions.
    pub async fn sync_external_to_local(
        &self,
        local_id: LocalUserId,
        force: bool,
    ) -> SyncResult<SyncOutcome> {
        self.engine.sync_to_local(local_id, force).await
    }

    /// Direction B entry point, for local role-change hooks.
    pub async fn sync_local_to_external(
        &self,
        local_id: LocalUserId,
        local_role: &str,
        previous_roles: &[String],
        force: bool,
    ) -> SyncResult<SyncOutcome> {
        self.engine
            .sync_to_external(local_id, local_role, previous_roles, force)
            .await
    }

    /// Read-only membership check for display and checkout
    /// collaborators. `sensitive` requests the short cache lifetime and
    /// timeout used inside transactions.
    pub async fn is_member(
        &self,
        external_id: UserId,
        force: bool,
        sensitive: bool,
    ) -> DirectoryResult<bool> {
        self.directory.is_member(external_id, force, sensitive).await
    }

    /// Read-only role lookup for display collaborators.
    pub async fn get_member_roles(&self, external_id: UserId) -> DirectoryResult<Vec<RoleId>> {
        self.directory.get_member_roles(external_id, false).await
    }

    /// One resumable page of a bulk run. See [`BatchRunner::run_batch`].
    pub async fn run_batch(
        &self,
        direction: SyncDirection,
        batch_size: Option<usize>,
        offset: usize,
    ) -> SyncResult<BatchProgress> {
        self.batch.run_batch(direction, batch_size, offset).await
    }

    /// A full bulk sweep. See [`BatchRunner::run_all`].
    pub async fn run_all(&self, direction: SyncDirection) -> SyncResult<BatchSummary> {
        self.batch.run_all(direction).await
    }

    /// One-way notification surface for order/post collaborators.
    pub async fn post_message(&self, channel: ChannelId, message: &Message) -> DirectoryResult<()> {
        self.directory.post_message(channel, message).await
    }
}

/// Builder for [`GuildSync`].
#[derive(Default)]
pub struct GuildSyncBuilder {
    guild_id: Option<GuildId>,
    directory: Option<Arc<dyn Directory>>,
    store: Option<Arc<dyn CacheStore>>,
    links: Option<Arc<dyn IdentityLinkStore>>,
    roles: Option<Arc<dyn LocalRoleStore>>,
    settings: Option<SyncSettings>,
}

impl GuildSyncBuilder {
    /// Sets the guild whose cache namespace the service owns.
    #[must_use]
    pub fn guild_id(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Sets the directory connector.
    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Sets the shared cache/lock store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the identity-link store.
    #[must_use]
    pub fn links(mut self, links: Arc<dyn IdentityLinkStore>) -> Self {
        self.links = Some(links);
        self
    }

    /// Sets the local role store.
    #[must_use]
    pub fn roles(mut self, roles: Arc<dyn LocalRoleStore>) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Sets the engine settings.
    #[must_use]
    pub fn settings(mut self, settings: SyncSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Assembles the service.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when a collaborator is missing or
    /// the settings fail validation.
    pub fn build(self) -> SyncResult<GuildSync> {
        let missing = |what: &str| SyncError::Config {
            message: format!("{what} is required"),
        };

        let guild_id = self.guild_id.ok_or_else(|| missing("guild_id"))?;
        let directory = self.directory.ok_or_else(|| missing("directory"))?;
        let store = self.store.ok_or_else(|| missing("store"))?;
        let links = self.links.ok_or_else(|| missing("links"))?;
        let roles = self.roles.ok_or_else(|| missing("roles"))?;
        let settings = self.settings.ok_or_else(|| missing("settings"))?;

        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&directory),
            Arc::clone(&store),
            Arc::clone(&links),
            Arc::clone(&roles),
            settings,
        )?);

        let batch = BatchRunner::new(Arc::clone(&engine), Arc::clone(&links), roles);

        Ok(GuildSync {
            guild_id,
            engine,
            batch,
            directory,
            store,
            links,
        })
    }
}
