//! Storage-layer error types.

use thiserror::Error;
use tutorhub_core::errors::{DatabaseError, Error as CoreError};

/// Errors raised inside the SQLite layer, folded into the core error at the
/// crate boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error(transparent)]
    Domain(CoreError),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Domain(inner) => inner,
            StorageError::Diesel(e) => {
                CoreError::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::Pool(e) => {
                CoreError::Database(DatabaseError::PoolUnavailable(e.to_string()))
            }
        }
    }
}
