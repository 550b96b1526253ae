//! Role mapping between directory roles and local membership roles.
//!
//! The mapping table is administrator-owned configuration: an ordered
//! list of (directory role → local role) rows. Several directory roles
//! may map to the same local role; the inverted index for the
//! local-to-external direction is derived on demand.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::directory::DirectoryRole;
use crate::ids::RoleId;

/// A single administrator-configured mapping row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMapping {
    /// The directory-side role.
    pub directory_role: RoleId,
    /// The local role it grants.
    pub local_role: String,
}

/// How to pick the winning local role when a member holds several mapped
/// directory roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityPolicy {
    /// The candidate whose source directory role has the greatest
    /// hierarchy position wins.
    HighestPosition,
    /// The candidate whose mapping row appears first in administrator
    /// order wins.
    FirstMatch,
}

impl std::fmt::Display for PriorityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighestPosition => write!(f, "highest_position"),
            Self::FirstMatch => write!(f, "first_match"),
        }
    }
}

impl std::str::FromStr for PriorityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "highest_position" => Ok(Self::HighestPosition),
            "first_match" => Ok(Self::FirstMatch),
            _ => Err(format!("Invalid priority policy: {s}")),
        }
    }
}

/// The winning candidate produced by [`MappingTable::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    /// The local role to assign.
    pub local_role: String,
    /// The directory role that produced the win.
    pub source_role: RoleId,
    /// The source role's hierarchy position (0 when unknown).
    pub position: i64,
}

/// Validated, ordered mapping table.
///
/// Construction rejects malformed rows (empty local role names,
/// duplicate directory-role entries) so downstream code never has to
/// second-guess the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RoleMapping>", into = "Vec<RoleMapping>")]
pub struct MappingTable {
    rows: Vec<RoleMapping>,
}

impl MappingTable {
    /// Builds a table from administrator-ordered rows.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending row when a local role name
    /// is empty or a directory role appears twice.
    pub fn new(rows: Vec<RoleMapping>) -> Result<Self, String> {
        let mut seen = HashSet::new();
        for row in &rows {
            if row.local_role.trim().is_empty() {
                return Err(format!(
                    "mapping for directory role {} has an empty local role",
                    row.directory_role
                ));
            }
            if !seen.insert(row.directory_role) {
                return Err(format!(
                    "directory role {} is mapped more than once",
                    row.directory_role
                ));
            }
        }
        Ok(Self { rows })
    }

    /// The administrator-ordered rows.
    #[must_use]
    pub fn rows(&self) -> &[RoleMapping] {
        &self.rows
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up the local role mapped from a directory role.
    #[must_use]
    pub fn local_role_for(&self, role_id: RoleId) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.directory_role == role_id)
            .map(|r| r.local_role.as_str())
    }

    /// Inverted index: all directory roles mapped from a local role, in
    /// administrator order.
    #[must_use]
    pub fn directory_roles_for(&self, local_role: &str) -> Vec<RoleId> {
        self.rows
            .iter()
            .filter(|r| r.local_role == local_role)
            .map(|r| r.directory_role)
            .collect()
    }

    /// Intersects the roles a member holds with the table and picks the
    /// winner per the configured policy.
    ///
    /// `directory_roles` supplies hierarchy positions; a held role absent
    /// from it resolves with position 0. Returns `None` when no held role
    /// is mapped.
    #[must_use]
    pub fn resolve(
        &self,
        held: &[RoleId],
        directory_roles: &[DirectoryRole],
        policy: PriorityPolicy,
    ) -> Option<ResolvedRole> {
        let position_of = |id: RoleId| {
            directory_roles
                .iter()
                .find(|r| r.id == id)
                .map_or(0, |r| r.position)
        };

        let mut candidates = self
            .rows
            .iter()
            .filter(|row| held.contains(&row.directory_role))
            .map(|row| ResolvedRole {
                local_role: row.local_role.clone(),
                source_role: row.directory_role,
                position: position_of(row.directory_role),
            });

        match policy {
            PriorityPolicy::FirstMatch => candidates.next(),
            // Ties resolve to the earlier mapping row, since max_by_key
            // returns the last maximum and we compare strictly.
            PriorityPolicy::HighestPosition => {
                candidates.fold(None, |best: Option<ResolvedRole>, candidate| match best {
                    Some(b) if b.position >= candidate.position => Some(b),
                    _ => Some(candidate),
                })
            }
        }
    }
}

impl TryFrom<Vec<RoleMapping>> for MappingTable {
    type Error = String;

    fn try_from(rows: Vec<RoleMapping>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<MappingTable> for Vec<RoleMapping> {
    fn from(table: MappingTable) -> Self {
        table.rows
    }
}
