//! Engine settings.
//!
//! Administrator-owned configuration consumed read-only by the engine:
//! the mapping table, the priority policy, feature flags, batch pacing
//! and the loop-detection bounds. Validated once at load; the engine
//! never re-checks at use time.

use serde::{Deserialize, Serialize};

use guildsync_core::{MappingTable, PriorityPolicy};

use crate::schedule::SyncCadence;

/// Validated engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Administrator role mapping, in priority order.
    pub mappings: MappingTable,
    /// How to pick a winner when several mapped roles are held.
    #[serde(default = "default_priority")]
    pub priority: PriorityPolicy,
    /// Whether the engine may delegate between directions.
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
    /// Whether protected local roles block external-driven downgrades.
    #[serde(default = "default_protect_admins")]
    pub protect_admins: bool,
    /// Local roles that protection covers.
    #[serde(default = "default_protected_roles")]
    pub protected_roles: Vec<String>,
    /// Identities per batch in bulk runs (default: 25).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between identities within a batch, in milliseconds
    /// (default: 350).
    #[serde(default = "default_member_pause_ms")]
    pub member_pause_ms: u64,
    /// Pause between batches, in milliseconds (default: 4000).
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
    /// Attempts per identity/direction allowed inside one window before
    /// a feedback loop is suspected (default: 3).
    #[serde(default = "default_loop_ceiling")]
    pub loop_ceiling: u64,
    /// Width of the loop-detection window in seconds (default: 60).
    #[serde(default = "default_loop_window_secs")]
    pub loop_window_secs: u64,
    /// Advisory sync lock lifetime in seconds (default: 15).
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    /// Background full-sync cadence.
    #[serde(default)]
    pub cadence: SyncCadence,
}

fn default_priority() -> PriorityPolicy {
    PriorityPolicy::HighestPosition
}

fn default_bidirectional() -> bool {
    true
}

fn default_protect_admins() -> bool {
    true
}

fn default_protected_roles() -> Vec<String> {
    vec!["admin".to_string()]
}

fn default_batch_size() -> usize {
    25
}

fn default_member_pause_ms() -> u64 {
    350
}

fn default_batch_pause_ms() -> u64 {
    4000
}

fn default_loop_ceiling() -> u64 {
    3
}

fn default_loop_window_secs() -> u64 {
    60
}

fn default_lock_ttl_secs() -> u64 {
    15
}

impl SyncSettings {
    /// Creates settings with defaults around a mapping table.
    #[must_use]
    pub fn new(mappings: MappingTable) -> Self {
        Self {
            mappings,
            priority: default_priority(),
            bidirectional: default_bidirectional(),
            protect_admins: default_protect_admins(),
            protected_roles: default_protected_roles(),
            batch_size: default_batch_size(),
            member_pause_ms: default_member_pause_ms(),
            batch_pause_ms: default_batch_pause_ms(),
            loop_ceiling: default_loop_ceiling(),
            loop_window_secs: default_loop_window_secs(),
            lock_ttl_secs: default_lock_ttl_secs(),
            cadence: SyncCadence::default(),
        }
    }

    /// Overrides the priority policy.
    #[must_use]
    pub fn with_priority(mut self, priority: PriorityPolicy) -> Self {
        self.priority = priority;
        self
    }

    /// Enables or disables bidirectional delegation.
    #[must_use]
    pub fn with_bidirectional(mut self, enabled: bool) -> Self {
        self.bidirectional = enabled;
        self
    }

    /// Enables or disables protected-role handling.
    #[must_use]
    pub fn with_admin_protection(mut self, enabled: bool) -> Self {
        self.protect_admins = enabled;
        self
    }

    /// Creates settings tuned for tests (no pacing, short windows).
    #[must_use]
    pub fn for_testing(mappings: MappingTable) -> Self {
        Self {
            member_pause_ms: 0,
            batch_pause_ms: 0,
            batch_size: 3,
            lock_ttl_secs: 5,
            ..Self::new(mappings)
        }
    }

    /// Whether a local role is protected.
    #[must_use]
    pub fn is_protected(&self, role: &str) -> bool {
        self.protect_admins && self.protected_roles.iter().any(|r| r == role)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.loop_ceiling == 0 {
            return Err("loop_ceiling must be > 0".to_string());
        }
        if self.loop_window_secs == 0 {
            return Err("loop_window_secs must be > 0".to_string());
        }
        if self.lock_ttl_secs == 0 {
            return Err("lock_ttl_secs must be > 0".to_string());
        }
        if self.protect_admins && self.protected_roles.is_empty() {
            return Err("protect_admins requires at least one protected role".to_string());
        }
        Ok(())
    }
}
