//! Store trait definitions

use crate::error::DbResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dk_core::ResolvedConnection;
use std::sync::Arc;

/// Result of evaluating a script on the store.
///
/// A store that runs the script and reports an error returns `Failed`;
/// a call that never got an answer (lost connection, poisoned lock) is an
/// `Err` from [`DocumentStore::eval`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalResult {
    Ok,
    Failed {
        message: String,
        cause: Option<String>,
    },
}

/// A ledger entry as written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDocument {
    /// Field holding the script name
    pub identity_field: String,
    pub identity: String,
    pub applied_at: DateTime<Utc>,
    pub checksum: String,
}

/// Handle on one target database.
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Evaluate script text server-side as a single unit.
    ///
    /// Dropping the returned future before it completes must leave the
    /// script uncommitted, or at least stop it as soon as the backend allows.
    async fn eval(&self, script: &str) -> DbResult<EvalResult>;

    /// String values of `field` across all documents of `collection`.
    ///
    /// `None` when the collection does not exist.
    async fn field_values(&self, collection: &str, field: &str)
        -> DbResult<Option<Vec<String>>>;

    /// Insert one ledger entry, creating the collection if needed
    async fn insert_ledger_entry(&self, collection: &str, entry: &LedgerDocument)
        -> DbResult<()>;

    /// Drop the whole database
    async fn drop_database(&self) -> DbResult<()>;

    /// Name of the database this handle targets
    fn database_name(&self) -> &str;

    /// Store type identifier for logging
    fn store_type(&self) -> &'static str;
}

/// Opens store handles from resolved connection settings.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, connection: &ResolvedConnection) -> DbResult<Arc<dyn DocumentStore>>;
}
