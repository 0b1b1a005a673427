//! In-memory store doubles for runner tests

use async_trait::async_trait;
use dk_core::ResolvedConnection;
use dk_db::{DbError, DbResult, DocumentStore, EvalResult, LedgerDocument, StoreConnector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store that interprets markers in the script body:
/// `FAIL` reports an error, `FAULT` breaks the call, `SLEEP` hangs.
pub(crate) struct FakeStore {
    name: String,
    evaluated: Mutex<Vec<String>>,
    ledger: Mutex<Vec<LedgerDocument>>,
    fail_ledger_writes: AtomicBool,
    dropped: AtomicBool,
}

impl FakeStore {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            evaluated: Mutex::new(Vec::new()),
            ledger: Mutex::new(Vec::new()),
            fail_ledger_writes: AtomicBool::new(false),
            dropped: AtomicBool::new(false),
        }
    }

    /// Pre-populate the ledger
    pub(crate) fn with_applied(self, names: &[&str]) -> Self {
        {
            let mut ledger = self.ledger.lock().unwrap();
            for name in names {
                ledger.push(LedgerDocument {
                    identity_field: "name".to_string(),
                    identity: name.to_string(),
                    applied_at: chrono::Utc::now(),
                    checksum: String::new(),
                });
            }
        }
        self
    }

    pub(crate) fn fail_ledger_writes(&self, fail: bool) {
        self.fail_ledger_writes.store(fail, Ordering::SeqCst);
    }

    /// Bodies sent to `eval`, in order
    pub(crate) fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap().clone()
    }

    pub(crate) fn ledger(&self) -> Vec<LedgerDocument> {
        self.ledger.lock().unwrap().clone()
    }

    pub(crate) fn was_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn eval(&self, script: &str) -> DbResult<EvalResult> {
        self.evaluated.lock().unwrap().push(script.to_string());
        if script.contains("SLEEP") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if script.contains("FAULT") {
            return Err(DbError::ConnectionError("connection reset".to_string()));
        }
        if script.contains("FAIL") {
            return Ok(EvalResult::Failed {
                message: "ReferenceError: boom is not defined".to_string(),
                cause: Some("JSInterpreterFailure (139)".to_string()),
            });
        }
        Ok(EvalResult::Ok)
    }

    async fn field_values(
        &self,
        collection: &str,
        field: &str,
    ) -> DbResult<Option<Vec<String>>> {
        let ledger = self.ledger.lock().unwrap();
        if collection != "appliedUpdates" || ledger.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            ledger
                .iter()
                .filter(|d| d.identity_field == field)
                .map(|d| d.identity.clone())
                .collect(),
        ))
    }

    async fn insert_ledger_entry(
        &self,
        _collection: &str,
        entry: &LedgerDocument,
    ) -> DbResult<()> {
        if self.fail_ledger_writes.load(Ordering::SeqCst) {
            return Err(DbError::ExecutionError("write concern error".to_string()));
        }
        self.ledger.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn drop_database(&self) -> DbResult<()> {
        self.dropped.store(true, Ordering::SeqCst);
        self.ledger.lock().unwrap().clear();
        Ok(())
    }

    fn database_name(&self) -> &str {
        &self.name
    }

    fn store_type(&self) -> &'static str {
        "fake"
    }
}

/// Connector handing out registered [`FakeStore`]s by database name.
#[derive(Default)]
pub(crate) struct FakeConnector {
    stores: HashMap<String, Arc<FakeStore>>,
    unreachable: HashSet<String>,
    connects: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub(crate) fn with_store(mut self, store: Arc<FakeStore>) -> Self {
        self.stores.insert(store.name.clone(), store);
        self
    }

    pub(crate) fn unreachable(mut self, database: &str) -> Self {
        self.unreachable.insert(database.to_string());
        self
    }

    /// Databases connected to, in order
    pub(crate) fn connects(&self) -> Vec<String> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreConnector for FakeConnector {
    async fn connect(&self, connection: &ResolvedConnection) -> DbResult<Arc<dyn DocumentStore>> {
        self.connects
            .lock()
            .unwrap()
            .push(connection.database.clone());
        if self.unreachable.contains(&connection.database) {
            return Err(DbError::ConnectionError(format!(
                "{}: connection refused",
                connection.hostname
            )));
        }
        let store = self
            .stores
            .get(&connection.database)
            .cloned()
            .ok_or_else(|| DbError::Internal(format!("no store for {}", connection.database)))?;
        Ok(store)
    }
}
