//! guildsync Core Library
//!
//! Shared types and traits for guildsync.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`LocalUserId`, snowflake types)
//! - [`directory`] - Directory model and the [`Directory`] trait seam
//! - [`mapping`] - Administrator role mapping with priority resolution
//! - [`traits`] - Local store seams (`IdentityLinkStore`, `LocalRoleStore`)
//! - [`memory`] - In-memory store implementations
//! - [`error`] - The directory error taxonomy (`DirectoryError`)
//!
//! # Example
//!
//! ```
//! use guildsync_core::{LocalUserId, MappingTable, PriorityPolicy, RoleId, RoleMapping};
//!
//! let table = MappingTable::new(vec![RoleMapping {
//!     directory_role: RoleId::new(41771983423143936),
//!     local_role: "member".to_string(),
//! }])
//! .expect("valid mapping");
//!
//! assert_eq!(
//!     table.local_role_for(RoleId::new(41771983423143936)),
//!     Some("member")
//! );
//! ```

pub mod directory;
pub mod error;
pub mod ids;
pub mod mapping;
pub mod memory;
pub mod traits;

// Re-export main types for convenient access
pub use directory::{Directory, DirectoryMember, DirectoryRole, Embed, Message};
pub use error::{DirectoryError, DirectoryResult};
pub use ids::{ChannelId, GuildId, LocalUserId, ParseIdError, RoleId, UserId};
pub use mapping::{MappingTable, PriorityPolicy, ResolvedRole, RoleMapping};
pub use memory::{MemoryLinkStore, MemoryRoleStore};
pub use traits::{IdentityLink, IdentityLinkStore, LinkError, LocalRoleStore, RoleStoreError};
