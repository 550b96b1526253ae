//! Strongly Typed Identifiers
//!
//! This module provides type-safe identifier types for guildsync.
//! Using the newtype pattern, these types prevent accidental misuse of
//! different ID types at compile time.
//!
//! Two families exist: [`LocalUserId`] wraps a UUID and identifies an
//! account in the local membership store, while the snowflake types
//! ([`UserId`], [`RoleId`], [`ChannelId`], [`GuildId`]) wrap the 64-bit
//! identifiers the directory service hands out. Snowflakes serialize as
//! decimal strings, matching the wire format.
//!
//! # Example
//!
//! ```
//! use guildsync_core::{LocalUserId, UserId};
//!
//! let local = LocalUserId::new();
//! let external: UserId = "81384788765712384".parse().unwrap();
//!
//! // Type safety: cannot pass UserId where LocalUserId is expected
//! fn requires_local(id: LocalUserId) -> String {
//!     id.to_string()
//! }
//!
//! let _ = requires_local(local);
//! // requires_local(external); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// The underlying parse error message
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed UUID-backed ID type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        message: e.to_string(),
                    })
            }
        }
    };
}

/// Macro to define a strongly-typed snowflake ID type.
///
/// Snowflakes are 64-bit integers on the wire but are serialized as
/// decimal strings so JSON consumers never truncate them.
macro_rules! define_snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Creates an ID from a raw snowflake value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw snowflake value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<u64>().map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    message: e.to_string(),
                })
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                struct SnowflakeVisitor;

                impl serde::de::Visitor<'_> for SnowflakeVisitor {
                    type Value = u64;

                    fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                        f.write_str("a snowflake as a string or integer")
                    }

                    fn visit_str<E: serde::de::Error>(
                        self,
                        v: &str,
                    ) -> std::result::Result<Self::Value, E> {
                        v.parse::<u64>().map_err(E::custom)
                    }

                    fn visit_u64<E: serde::de::Error>(
                        self,
                        v: u64,
                    ) -> std::result::Result<Self::Value, E> {
                        Ok(v)
                    }
                }

                deserializer.deserialize_any(SnowflakeVisitor).map(Self)
            }
        }
    };
}

define_id!(
    /// Strongly typed identifier for accounts in the local membership store.
    ///
    /// # Example
    ///
    /// ```
    /// use guildsync_core::LocalUserId;
    ///
    /// let id = LocalUserId::new();
    /// println!("Local user: {}", id);
    ///
    /// // Parse from string
    /// let id: LocalUserId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
    /// ```
    LocalUserId
);

define_snowflake!(
    /// Strongly typed identifier for a user account on the directory service.
    UserId
);

define_snowflake!(
    /// Strongly typed identifier for a role defined on the directory service.
    RoleId
);

define_snowflake!(
    /// Strongly typed identifier for a message channel on the directory service.
    ChannelId
);

define_snowflake!(
    /// Strongly typed identifier for a guild (community) on the directory service.
    GuildId
);
