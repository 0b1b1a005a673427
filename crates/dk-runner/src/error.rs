//! Error types for dk-runner

use dk_core::CoreError;
use dk_db::DbError;
use thiserror::Error;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Configuration, credentials, or filesystem error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Store error outside of script evaluation
    #[error(transparent)]
    Db(#[from] DbError),

    /// R001: Database could not be connected to
    #[error("[R001] Failed to connect to database '{database}': {source}")]
    ConnectionFailed {
        database: String,
        #[source]
        source: DbError,
    },

    /// R002: Ledger collection could not be read
    #[error("[R002] Failed to read ledger '{collection}' of database '{database}': {source}")]
    LedgerRead {
        database: String,
        collection: String,
        #[source]
        source: DbError,
    },

    /// R003: Database could not be dropped
    #[error("[R003] Failed to drop database '{database}': {source}")]
    DropFailed {
        database: String,
        #[source]
        source: DbError,
    },
}

/// Result type alias for RunnerError
pub type RunnerResult<T> = Result<T, RunnerError>;
