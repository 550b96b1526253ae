//! Engine error types.

use thiserror::Error;

use guildsync_core::{DirectoryError, LinkError, LocalUserId, RoleStoreError};

/// Result type alias using [`SyncError`].
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a synchronization run.
///
/// Lock contention and loop suspicion are NOT errors; they surface as
/// [`crate::outcome::SyncOutcome::Skipped`] so callers tally them apart
/// from failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The identity has no directory link.
    #[error("local account {local_id} is not linked to a directory account")]
    NotLinked { local_id: LocalUserId },

    /// The directory call failed after internal retries.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The link store failed.
    #[error(transparent)]
    Links(#[from] LinkError),

    /// The local role store failed.
    #[error(transparent)]
    Roles(#[from] RoleStoreError),

    /// The engine was built with invalid settings.
    #[error("configuration error: {message}")]
    Config { message: String },
}
