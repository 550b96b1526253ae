//! In-memory implementations of the local store traits.
//!
//! These serve tests and single-process embedded deployments; production
//! hosts usually bind the traits to their own database.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::ids::{LocalUserId, UserId};
use crate::traits::{IdentityLink, IdentityLinkStore, LinkError, LocalRoleStore, RoleStoreError};

/// In-memory identity-link store.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<LocalUserId, UserId>>,
}

impl MemoryLinkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityLinkStore for MemoryLinkStore {
    async fn link(&self, local_id: LocalUserId, external_id: UserId) -> Result<(), LinkError> {
        let mut links = self.links.write().await;

        if links.contains_key(&local_id) {
            return Err(LinkError::AlreadyLinked {
                message: format!("local account {local_id} already holds a link"),
            });
        }
        if links.values().any(|&existing| existing == external_id) {
            return Err(LinkError::AlreadyLinked {
                message: format!("external account {external_id} is already linked"),
            });
        }

        links.insert(local_id, external_id);
        Ok(())
    }

    async fn unlink(&self, local_id: LocalUserId) -> Result<Option<UserId>, LinkError> {
        let mut links = self.links.write().await;
        Ok(links.remove(&local_id))
    }

    async fn external_id(&self, local_id: LocalUserId) -> Result<Option<UserId>, LinkError> {
        let links = self.links.read().await;
        Ok(links.get(&local_id).copied())
    }

    async fn local_id(&self, external_id: UserId) -> Result<Option<LocalUserId>, LinkError> {
        let links = self.links.read().await;
        Ok(links
            .iter()
            .find(|(_, &ext)| ext == external_id)
            .map(|(&local, _)| local))
    }

    async fn links(&self, offset: usize, limit: usize) -> Result<Vec<IdentityLink>, LinkError> {
        let links = self.links.read().await;
        let mut all: Vec<IdentityLink> = links
            .iter()
            .map(|(&local_id, &external_id)| IdentityLink {
                local_id,
                external_id,
            })
            .collect();
        // Stable order so offset-based pagination never skips or repeats.
        all.sort_by_key(|link| *link.local_id.as_uuid());
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self) -> Result<usize, LinkError> {
        let links = self.links.read().await;
        Ok(links.len())
    }
}

/// In-memory local role store.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    roles: RwLock<HashMap<LocalUserId, String>>,
}

impl MemoryRoleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalRoleStore for MemoryRoleStore {
    async fn current_role(&self, local_id: LocalUserId) -> Result<Option<String>, RoleStoreError> {
        let roles = self.roles.read().await;
        Ok(roles.get(&local_id).cloned())
    }

    async fn set_role(&self, local_id: LocalUserId, role: &str) -> Result<(), RoleStoreError> {
        let mut roles = self.roles.write().await;
        roles.insert(local_id, role.to_string());
        Ok(())
    }
}
