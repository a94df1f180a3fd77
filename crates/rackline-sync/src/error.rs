//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Sync Error Categories                           │
//! │                                                                     │
//! │  ┌─────────────────┐  ┌──────────────────┐  ┌────────────────────┐  │
//! │  │  Configuration  │  │   Submission     │  │     Storage        │  │
//! │  │                 │  │                  │  │                    │  │
//! │  │  InvalidConfig  │  │  SubmissionFailed│  │  DatabaseError     │  │
//! │  │  MissingDeviceId│  │  RetriesExhausted│  │  Serialization     │  │
//! │  │  InvalidUrl     │  │                  │  │                    │  │
//! │  └─────────────────┘  └──────────────────┘  └────────────────────┘  │
//! │                                                                     │
//! │  SubmissionFailed is internal to the synchronizer: a single remote  │
//! │  attempt failed, recovered by retry/backoff, never shown to the     │
//! │  user. Only RetriesExhausted surfaces outward, and even then the    │
//! │  transaction stays queued ("will retry"), never dropped.            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Missing device ID (required for sync).
    #[error("Device ID not configured. Run initial setup first.")]
    MissingDeviceId,

    /// Invalid remote or health-check URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Submission Errors
    // =========================================================================
    /// A single remote submission attempt failed (network, timeout, or
    /// remote rejection). Recovered locally via retry/backoff.
    #[error("Submission failed for transaction {id}: {reason}")]
    SubmissionFailed { id: String, reason: String },

    /// Retries exhausted for a transaction. The transaction remains queued
    /// with status `failed` and stays eligible for future retries.
    #[error("Retries exhausted for transaction {id} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        id: String,
        attempts: u32,
        last_error: String,
    },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local queue operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Failed to serialize a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal sync engine error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<rackline_db::DbError> for SyncError {
    fn from(err: rackline_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if this error is recoverable and the operation can be
    /// retried (network-class failures), false for configuration and
    /// programming errors.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::SubmissionFailed { .. } | SyncError::RetriesExhausted { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingDeviceId
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let attempt = SyncError::SubmissionFailed {
            id: "tx-1".into(),
            reason: "connection refused".into(),
        };
        assert!(attempt.is_retryable());

        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
        assert!(!SyncError::MissingDeviceId.is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(SyncError::MissingDeviceId.is_config_error());
        assert!(SyncError::InvalidUrl("nope".into()).is_config_error());
        assert!(!SyncError::DatabaseError("locked".into()).is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::RetriesExhausted {
            id: "tx-abc".into(),
            attempts: 3,
            last_error: "503 Service Unavailable".into(),
        };
        assert!(err.to_string().contains("tx-abc"));
        assert!(err.to_string().contains("3 attempts"));
    }
}
