//! Directory model and the trait seam between the sync engine and the
//! connector that talks to the external service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryResult;
use crate::ids::{ChannelId, RoleId, UserId};

/// A role defined on the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRole {
    /// Role ID.
    pub id: RoleId,
    /// Display name.
    pub name: String,
    /// Hierarchy position; higher means more senior.
    pub position: i64,
}

/// A member record on the directory service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMember {
    /// The member's user ID.
    pub user_id: UserId,
    /// Guild-local nickname, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    /// Role IDs currently assigned to the member.
    pub roles: Vec<RoleId>,
}

/// A rich embed attached to an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    /// Embed title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Embed body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accent color as a 24-bit RGB integer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

/// An outbound notification message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Plain-text content.
    pub content: String,
    /// Rich embeds, if any.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embeds: Vec<Embed>,
}

impl Message {
    /// Creates a plain-text message with no embeds.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embeds: Vec::new(),
        }
    }
}

/// Read/write access to the external directory service.
///
/// The sync engine only sees this trait; the production implementation is
/// the rate-limited REST connector, while tests substitute an in-memory
/// fake. `force` bypasses cached reads; `sensitive` requests the shorter
/// cache lifetime and timeout used in latency-sensitive interactive flows
/// such as checkout.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Lists all roles defined on the directory, sorted by descending
    /// hierarchy position. The priority resolver depends on this order.
    async fn list_roles(&self, force: bool) -> DirectoryResult<Vec<DirectoryRole>>;

    /// Fetches a member record. Absence is `Err(NotFound)`, which
    /// implementations cache as a distinct negative result.
    async fn get_member(&self, user_id: UserId, force: bool) -> DirectoryResult<DirectoryMember>;

    /// Fetches the role IDs currently assigned to a member.
    async fn get_member_roles(&self, user_id: UserId, force: bool) -> DirectoryResult<Vec<RoleId>>;

    /// Whether the user is currently a member of the guild.
    async fn is_member(&self, user_id: UserId, force: bool, sensitive: bool)
        -> DirectoryResult<bool>;

    /// Replaces the member's full role set in a single bulk call.
    async fn set_member_roles(&self, user_id: UserId, roles: Vec<RoleId>) -> DirectoryResult<()>;

    /// Posts a one-way notification message. Carries no sync semantics.
    async fn post_message(&self, channel: ChannelId, message: &Message) -> DirectoryResult<()>;
}
