//! Backend selection

use crate::duckdb::{open_connection, DuckDbStore, SharedConnection};
use crate::error::{DbError, DbResult};
use crate::traits::{DocumentStore, StoreConnector};
use async_trait::async_trait;
use dk_core::{ResolvedConnection, StoreKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Connector that opens the backend named in the connection settings.
///
/// DuckDB files are opened once per connector and shared by every database
/// (schema) configured on them, since a file can only be opened once per
/// process.
#[derive(Default)]
pub struct BackendConnector {
    duckdb_files: Mutex<HashMap<String, SharedConnection>>,
}

impl BackendConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn duckdb_connection(&self, path: &str) -> DbResult<SharedConnection> {
        let mut files = self
            .duckdb_files
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        if let Some(conn) = files.get(path) {
            return Ok(Arc::clone(conn));
        }
        let conn = open_connection(path)?;
        files.insert(path.to_string(), Arc::clone(&conn));
        Ok(conn)
    }
}

#[async_trait]
impl StoreConnector for BackendConnector {
    async fn connect(&self, connection: &ResolvedConnection) -> DbResult<Arc<dyn DocumentStore>> {
        match connection.backend {
            StoreKind::DuckDb => {
                if connection.auth.is_some() {
                    log::debug!(
                        "duckdb store for '{}' ignores credentials",
                        connection.database
                    );
                }
                let conn = self.duckdb_connection(&connection.hostname)?;
                Ok(Arc::new(DuckDbStore::with_connection(
                    conn,
                    &connection.database,
                )))
            }
            StoreKind::MongoDb => connect_mongo(connection),
        }
    }
}

#[cfg(feature = "mongodb")]
fn connect_mongo(connection: &ResolvedConnection) -> DbResult<Arc<dyn DocumentStore>> {
    Ok(Arc::new(crate::mongo::MongoStore::connect(connection)?))
}

#[cfg(not(feature = "mongodb"))]
fn connect_mongo(_connection: &ResolvedConnection) -> DbResult<Arc<dyn DocumentStore>> {
    Err(DbError::NotImplemented {
        backend: "mongodb".to_string(),
        feature: "this build (rebuild with the `mongodb` feature)".to_string(),
    })
}
