//! Stratum Error - Unified Error Types
//!
//! Error handling for all Stratum operations. Catalog-level failures
//! (`NotFound`, `Conflict`, `Schema`) abort a call and propagate unchanged;
//! transport failures (`Backend`, `Timeout`) propagate without retry.
//! Row-level malformation is never an error — it is folded into the
//! ingestion report by the stores.
//!
//! Key Features:
//! - Domain-specific error variants for precise error handling
//! - Retryable error detection for callers that retry externally
//! - User vs system error classification
//!
//! @version 0.1.0
//! @author Stratum Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all Stratum operations.
#[derive(Error, Debug)]
pub enum StratumError {
    /// Unknown property or entity id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate catalog id (by construct, not by value row).
    #[error("already exists: {0}")]
    Conflict(String),

    /// Unsupported dimension width, or a write to a backend lacking the
    /// type's measurement schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// Connection or transport failure against a storage backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend round-trip exceeded an externally imposed deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Payload (de)serialization failure on the publish path.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for Stratum operations.
pub type Result<T> = std::result::Result<T, StratumError>;

// =============================================================================
// Error Classification
// =============================================================================

impl StratumError {
    /// Returns true if the operation can be safely retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StratumError::Backend(_) | StratumError::Timeout(_))
    }

    /// Returns true if this is a user error (vs system error).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StratumError::NotFound(_) | StratumError::Conflict(_) | StratumError::Schema(_)
        )
    }
}

impl From<serde_json::Error> for StratumError {
    fn from(err: serde_json::Error) -> Self {
        StratumError::Serialization(err.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
