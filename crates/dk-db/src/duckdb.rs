//! DuckDB store backend
//!
//! Maps the document-store model onto one DuckDB file: each configured
//! database is a schema, each collection a table, and `eval` runs the
//! script as a batch of SQL statements with that schema selected.

use crate::error::{DbError, DbResult};
use crate::traits::{DocumentStore, EvalResult, LedgerDocument};
use async_trait::async_trait;
use duckdb::{Connection, InterruptHandle};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared DuckDB connection
pub type SharedConnection = Arc<Mutex<Connection>>;

/// DuckDB store bound to one schema
pub struct DuckDbStore {
    conn: SharedConnection,
    interrupt: Arc<InterruptHandle>,
    schema: String,
}

/// Interrupts the running statement if an `eval` future is dropped before
/// its blocking task reports back (e.g. when a timeout fires).
struct CancelOnDrop {
    interrupt: Arc<InterruptHandle>,
    cancelled: Arc<AtomicBool>,
    armed: bool,
}

impl CancelOnDrop {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.cancelled.store(true, Ordering::SeqCst);
            self.interrupt.interrupt();
        }
    }
}

/// Quote an identifier for use in SQL
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for use in SQL
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn failed(err: &duckdb::Error) -> EvalResult {
    let (message, cause) = split_error_kind(&err.to_string());
    EvalResult::Failed { message, cause }
}

/// Split DuckDB's `"<Kind> Error: <detail>"` messages into (detail, kind).
fn split_error_kind(msg: &str) -> (String, Option<String>) {
    match msg.split_once(": ") {
        Some((kind, detail)) if kind.ends_with(" Error") => {
            (detail.to_string(), Some(kind.to_string()))
        }
        _ => (msg.to_string(), None),
    }
}

impl DuckDbStore {
    /// Open a DuckDB file (or `:memory:`) and bind to `schema`.
    pub fn open(path: &str, schema: &str) -> DbResult<Self> {
        Ok(Self::with_connection(open_connection(path)?, schema))
    }

    /// Create a store on a fresh in-memory database
    pub fn in_memory(schema: &str) -> DbResult<Self> {
        Self::open(":memory:", schema)
    }

    /// Bind an existing connection to `schema`
    pub fn with_connection(conn: SharedConnection, schema: &str) -> Self {
        let interrupt = conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .interrupt_handle();
        Self {
            conn,
            interrupt,
            schema: schema.to_string(),
        }
    }

    /// The connection this store runs on
    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }

    /// Run `body` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, body: F) -> DbResult<T>
    where
        F: FnOnce(&Connection, &str) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let schema = self.schema.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
            body(&guard, &schema)
        })
        .await
        .map_err(|e| DbError::Internal(format!("blocking task failed: {}", e)))?
    }
}

/// Open a raw connection (handles the `:memory:` special case)
pub fn open_connection(path: &str) -> DbResult<SharedConnection> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open(Path::new(path))
    }
    .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path)))?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn ensure_schema(conn: &Connection, schema: &str) -> DbResult<()> {
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        quote_ident(schema)
    ))?;
    Ok(())
}

fn column_exists(conn: &Connection, schema: &str, table: &str, column: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.columns \
         WHERE table_schema = ? AND table_name = ? AND column_name = ?",
        duckdb::params![schema, table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn table_exists(conn: &Connection, schema: &str, table: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = ? AND table_name = ?",
        duckdb::params![schema, table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[async_trait]
impl DocumentStore for DuckDbStore {
    /// Runs the script in one transaction. If the call is abandoned the
    /// running statement is interrupted and nothing is committed.
    async fn eval(&self, script: &str) -> DbResult<EvalResult> {
        let script = script.to_string();
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop {
            interrupt: Arc::clone(&self.interrupt),
            cancelled: Arc::clone(&cancelled),
            armed: true,
        };

        let result = self
            .blocking(move |conn, schema| {
                ensure_schema(conn, schema)?;
                conn.execute_batch(&format!("SET schema = {}", quote_literal(schema)))?;
                conn.execute_batch("BEGIN TRANSACTION")?;

                let outcome = match conn.execute_batch(&script) {
                    Ok(()) if cancelled.load(Ordering::SeqCst) => EvalResult::Failed {
                        message: "cancelled before commit".to_string(),
                        cause: None,
                    },
                    Ok(()) => match conn.execute_batch("COMMIT") {
                        Ok(()) => return Ok(EvalResult::Ok),
                        Err(e) => failed(&e),
                    },
                    Err(e) => failed(&e),
                };
                // A failed COMMIT has already ended the transaction
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    log::debug!("rollback after failed script: {}", e);
                }
                Ok(outcome)
            })
            .await;

        guard.disarm();
        result
    }

    async fn field_values(
        &self,
        collection: &str,
        field: &str,
    ) -> DbResult<Option<Vec<String>>> {
        let collection = collection.to_string();
        let field = field.to_string();
        self.blocking(move |conn, schema| {
            if !table_exists(conn, schema, &collection)? {
                return Ok(None);
            }
            // A collection whose entries never carried the field holds no names
            if !column_exists(conn, schema, &collection, &field)? {
                return Ok(Some(Vec::new()));
            }

            let sql = format!(
                "SELECT CAST({field} AS VARCHAR) FROM {schema}.{table} WHERE {field} IS NOT NULL",
                field = quote_ident(&field),
                schema = quote_ident(schema),
                table = quote_ident(&collection),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut values = Vec::new();
            for value in rows {
                values.push(value?);
            }
            Ok(Some(values))
        })
        .await
    }

    async fn insert_ledger_entry(
        &self,
        collection: &str,
        entry: &LedgerDocument,
    ) -> DbResult<()> {
        let collection = collection.to_string();
        let entry = entry.clone();
        self.blocking(move |conn, schema| {
            ensure_schema(conn, schema)?;
            let table = format!("{}.{}", quote_ident(schema), quote_ident(&collection));
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} ({field} VARCHAR NOT NULL, \"appliedAt\" TIMESTAMP, \"checksum\" VARCHAR)",
                table = table,
                field = quote_ident(&entry.identity_field),
            ))?;
            conn.execute(
                &format!(
                    "INSERT INTO {table} ({field}, \"appliedAt\", \"checksum\") VALUES (?, CAST(? AS TIMESTAMP), ?)",
                    table = table,
                    field = quote_ident(&entry.identity_field),
                ),
                duckdb::params![
                    entry.identity,
                    entry.applied_at.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
                    entry.checksum,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn drop_database(&self) -> DbResult<()> {
        self.blocking(|conn, schema| {
            conn.execute_batch(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                quote_ident(schema)
            ))?;
            Ok(())
        })
        .await
    }

    fn database_name(&self) -> &str {
        &self.schema
    }

    fn store_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
