//! Unified error types for the TutorHub domain crates.

use thiserror::Error;

/// Result type alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors originating in the local database layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No connection could be checked out of the pool.
    #[error("Connection pool error: {0}")]
    PoolUnavailable(String),

    /// Anything else the storage layer cannot express more precisely.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors surfaced by TutorHub components.
#[derive(Debug, Error)]
pub enum Error {
    /// Local database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Remote document store error. `status` is the HTTP status when one
    /// was received; transport failures carry `None`.
    #[error("Remote store error ({status:?}): {message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// No authenticated tenant, or the tenant's credentials were rejected.
    #[error("No authenticated tenant")]
    Unauthenticated,

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Invalid or unexpected data encountered outside the database.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a remote error from an HTTP status and message.
    pub fn remote(status: impl Into<Option<u16>>, message: impl Into<String>) -> Self {
        Self::Remote {
            status: status.into(),
            message: message.into(),
        }
    }

    /// True when the error means the tenant's credentials are no longer
    /// valid and the whole sync cycle must stop rather than retry records.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Remote {
                status: Some(status),
                ..
            } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}
