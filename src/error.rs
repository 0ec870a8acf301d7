//! Error types for TierVault
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TierError
pub type Result<T> = std::result::Result<T, TierError>;

/// Unified error type for TierVault operations
#[derive(Debug, Error)]
pub enum TierError {
    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    /// Malformed input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Absent from both tiers, or missing identifiers on delete
    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    /// A store rejected or failed an operation
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TierError {
    /// True for failures that originate in a storage backend.
    ///
    /// These surface to callers as server errors and are worth retrying.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            TierError::Backend(_) | TierError::Io(_) | TierError::Serialization(_)
        )
    }
}
