//! Error types for dk-db

use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Store connection failed: {0}")]
    ConnectionError(String),

    /// Store call failed outside of script evaluation (D002)
    #[error("[D002] Store operation failed: {0}")]
    ExecutionError(String),

    /// Not implemented (D003)
    #[error("[D003] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D004)
    #[error("[D004] Store mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D005)
    #[error("[D005] Internal store error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for DbError {
    fn from(err: mongodb::error::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
