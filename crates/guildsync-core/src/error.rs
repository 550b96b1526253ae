//! Error Types
//!
//! Error definitions for directory access with transient/permanent
//! classification for retry logic. Expected "not found" outcomes are a
//! first-class variant, since callers routinely branch on them rather
//! than treating them as failures.

use thiserror::Error;

/// Result type alias using [`DirectoryError`].
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur when interacting with the directory service.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Network-level transport failure (connection reset, DNS, TLS).
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Request exceeded its deadline.
    #[error("request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Rate limit exceeded and retries exhausted.
    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Requested resource was not found.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// The type of resource that was not found (e.g., "member", "role")
        resource: String,
        /// Optional identifier of the resource
        id: Option<String>,
    },

    /// Credential rejected by the directory service.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Invalid or incomplete configuration (missing credential, guild id).
    #[error("misconfigured: {message}")]
    Misconfigured { message: String },

    /// Directory API returned an error response.
    #[error("directory API error {status}: {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Maximum retry attempts exceeded.
    #[error("maximum retries ({attempts}) exceeded")]
    MaxRetriesExceeded { attempts: u32 },

    /// The cache/lock store is unreachable. Callers treat this as a cache
    /// miss or an unlocked state (fail open), never as fatal.
    #[error("cache store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Shorthand for a [`DirectoryError::Network`] without a source.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`DirectoryError::NotFound`].
    #[must_use]
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Whether the error is transient and worth retrying.
    ///
    /// Network failures, timeouts and 5xx-class API responses are
    /// retryable; everything else is permanent for the current call.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Whether the error is the expected member-absent outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
