//! Store traits for the local half of synchronization.
//!
//! The engine reads and writes local state only through these seams, so
//! host applications can bind them to whatever persistence they already
//! run. In-memory implementations live in [`crate::memory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{LocalUserId, UserId};

/// The association between a local account and a directory account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityLink {
    /// The local account.
    pub local_id: LocalUserId,
    /// The directory account.
    pub external_id: UserId,
}

/// Errors from the identity-link store.
#[derive(Debug, Error)]
pub enum LinkError {
    /// One side of the requested link is already linked.
    #[error("already linked: {message}")]
    AlreadyLinked { message: String },

    /// The backing store is unreachable.
    #[error("link store unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors from the local role store.
#[derive(Debug, Error)]
#[error("role store unavailable: {message}")]
pub struct RoleStoreError {
    pub message: String,
}

/// Persistence for identity links.
///
/// Implementations must enforce that an external ID maps to at most one
/// active local ID, and that a local ID holds at most one link.
#[async_trait]
pub trait IdentityLinkStore: Send + Sync {
    /// Creates a link. Fails with [`LinkError::AlreadyLinked`] when
    /// either side is already linked.
    async fn link(&self, local_id: LocalUserId, external_id: UserId) -> Result<(), LinkError>;

    /// Removes the link for a local account, returning the external ID
    /// it pointed at, if any.
    async fn unlink(&self, local_id: LocalUserId) -> Result<Option<UserId>, LinkError>;

    /// Resolves the external ID linked to a local account.
    async fn external_id(&self, local_id: LocalUserId) -> Result<Option<UserId>, LinkError>;

    /// Resolves the local ID linked to an external account.
    async fn local_id(&self, external_id: UserId) -> Result<Option<LocalUserId>, LinkError>;

    /// A stable page of links for batch processing.
    async fn links(&self, offset: usize, limit: usize) -> Result<Vec<IdentityLink>, LinkError>;

    /// Total number of active links.
    async fn count(&self) -> Result<usize, LinkError>;
}

/// Read/write access to the membership role held locally.
#[async_trait]
pub trait LocalRoleStore: Send + Sync {
    /// The role the account currently holds, if any.
    async fn current_role(&self, local_id: LocalUserId) -> Result<Option<String>, RoleStoreError>;

    /// Assigns the role, replacing any previous one.
    async fn set_role(&self, local_id: LocalUserId, role: &str) -> Result<(), RoleStoreError>;
}
