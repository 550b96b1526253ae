//! Sync outcomes.
//!
//! Skips are first-class outcomes, not errors: batch callers tally them
//! separately, and interactive callers render the specific reason since
//! "skipped" and "failed" call for different follow-up.

use serde::{Deserialize, Serialize};

/// The two synchronization directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// External directory roles drive the local role.
    ToLocal,
    /// The local role drives external directory roles.
    ToExternal,
}

impl SyncDirection {
    /// The stable name used in lock and counter keys.
    #[must_use]
    pub fn key_name(self) -> &'static str {
        match self {
            Self::ToLocal => "to_local",
            Self::ToExternal => "to_external",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::ToLocal => Self::ToExternal,
            Self::ToExternal => Self::ToLocal,
        }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key_name())
    }
}

/// Why a run changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpReason {
    /// The target already holds the resolved state.
    AlreadyCurrent,
    /// No mapping row applies to the identity. A legitimate outcome,
    /// not an error.
    NoMappingApplicable,
    /// The identity is not present on the directory yet.
    NotYetMember,
    /// The current local role is protected and bidirectional delegation
    /// is off, so the external-driven change was deliberately dropped.
    ProtectedRole,
}

/// Why a run was refused before doing any work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another run holds the (identity, direction) lock.
    AlreadyInProgress,
    /// The sliding-window attempt counter hit its ceiling.
    LoopSuspected {
        /// Attempts observed inside the window.
        attempts: u64,
    },
    /// A one-shot delegation token suppressed the return trip.
    ReturnTripSuppressed,
}

/// Result of one synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A role change was written.
    Applied {
        /// The local role (direction A) or the driving local role
        /// (direction B) the write converged on.
        role: String,
    },
    /// Nothing needed changing.
    NoOp {
        reason: NoOpReason,
    },
    /// The run was refused before fetching anything.
    Skipped {
        reason: SkipReason,
    },
}

impl SyncOutcome {
    /// Whether the run completed (applied or no-op).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }

    /// Whether the run wrote a change.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Whether the run was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_key_names_are_stable() {
        assert_eq!(SyncDirection::ToLocal.key_name(), "to_local");
        assert_eq!(SyncDirection::ToExternal.key_name(), "to_external");
        assert_eq!(SyncDirection::ToLocal.to_string(), "to_local");
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(SyncDirection::ToLocal.opposite(), SyncDirection::ToExternal);
        assert_eq!(SyncDirection::ToExternal.opposite(), SyncDirection::ToLocal);
    }

    #[test]
    fn test_outcome_classification() {
        let applied = SyncOutcome::Applied {
            role: "vip".to_string(),
        };
        assert!(applied.is_applied());
        assert!(applied.is_complete());

        let noop = SyncOutcome::NoOp {
            reason: NoOpReason::AlreadyCurrent,
        };
        assert!(!noop.is_applied());
        assert!(noop.is_complete());

        let skipped = SyncOutcome::Skipped {
            reason: SkipReason::AlreadyInProgress,
        };
        assert!(skipped.is_skipped());
        assert!(!skipped.is_complete());
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = SyncOutcome::Skipped {
            reason: SkipReason::LoopSuspected { attempts: 4 },
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"skipped\""));
        assert!(json.contains("\"attempts\":4"));
    }
}
