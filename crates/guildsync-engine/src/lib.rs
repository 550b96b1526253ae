//! guildsync Role Synchronization Engine
//!
//! Keeps membership-role assignments consistent, in both directions,
//! between a local identity/role store and an external guild directory:
//!
//! - **Direction A (`to_local`)**: the identity's directory roles are
//!   intersected with the administrator mapping table and the winning
//!   local role (by hierarchy position or mapping order) is applied,
//!   unless the current local role is protected.
//! - **Direction B (`to_external`)**: the local role is projected onto
//!   the directory with exactly one bulk role replace per change.
//!
//! Every run is guarded by a store-backed advisory lock (concurrent
//! triggers against the same identity serialize; the loser reports
//! "skipped", not an error) and by a sliding-window attempt counter
//! that breaks feedback loops between the two directions. Cross-
//! direction handoffs carry a one-shot token that suppresses the
//! immediate return trip.
//!
//! The [`BatchRunner`] drives either direction across the entire link
//! table in paced, resumable batches; [`SyncCadence`] supplies the
//! schedule math for background sweeps; [`GuildSync`] is the single
//! facade the surrounding application calls.

pub mod batch;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod schedule;
pub mod service;
pub mod settings;

// Re-exports
pub use batch::{BatchProgress, BatchRunner, BatchSummary};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use outcome::{NoOpReason, SkipReason, SyncDirection, SyncOutcome};
pub use schedule::SyncCadence;
pub use service::{GuildSync, GuildSyncBuilder};
pub use settings::SyncSettings;
