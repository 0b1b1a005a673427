//! MongoDB store backend
//!
//! Scripts are evaluated server-side with the `eval` command. Servers that
//! no longer support `eval` answer with a command error, which surfaces as an
//! [`EvalResult::Failed`] for every script.

use crate::error::{DbError, DbResult};
use crate::traits::{DocumentStore, EvalResult, LedgerDocument};
use async_trait::async_trait;
use dk_core::ResolvedConnection;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Database};
use std::time::Duration;

/// MongoDB store bound to one database
pub struct MongoStore {
    db: Database,
    name: String,
}

impl MongoStore {
    /// Build a client for `connection` and bind to its database.
    ///
    /// The driver connects lazily; a bad address shows up on the first call.
    pub fn connect(connection: &ResolvedConnection) -> DbResult<Self> {
        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: connection.hostname.clone(),
            port: connection.port,
        }];
        options.app_name = connection.options.app_name.clone();
        options.connect_timeout = connection
            .options
            .connect_timeout_ms
            .map(Duration::from_millis);
        options.server_selection_timeout = connection
            .options
            .server_selection_timeout_ms
            .map(Duration::from_millis);
        options.max_pool_size = connection.options.max_pool_size;
        options.direct_connection = connection.options.direct_connection;

        if let Some(auth) = &connection.auth {
            let mut credential = Credential::default();
            credential.username = Some(auth.username.clone());
            credential.password = Some(auth.password.clone());
            credential.source = Some(
                connection
                    .options
                    .auth_source
                    .clone()
                    .unwrap_or_else(|| connection.database.clone()),
            );
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        Ok(Self {
            db: client.database(&connection.database),
            name: connection.database.clone(),
        })
    }

    async fn collection_exists(&self, collection: &str) -> DbResult<bool> {
        let names = self.db.list_collection_names().await?;
        Ok(names.iter().any(|n| n == collection))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn eval(&self, script: &str) -> DbResult<EvalResult> {
        match self.db.run_command(doc! { "eval": script }).await {
            Ok(_) => Ok(EvalResult::Ok),
            Err(e) => match e.kind.as_ref() {
                ErrorKind::Command(command) => Ok(EvalResult::Failed {
                    message: command.message.clone(),
                    cause: Some(format!("{} ({})", command.code_name, command.code)),
                }),
                _ => Err(e.into()),
            },
        }
    }

    async fn field_values(
        &self,
        collection: &str,
        field: &str,
    ) -> DbResult<Option<Vec<String>>> {
        if !self.collection_exists(collection).await? {
            return Ok(None);
        }

        let mut projection = Document::new();
        projection.insert(field, 1);

        let mut cursor = self
            .db
            .collection::<Document>(collection)
            .find(doc! {})
            .projection(projection)
            .await?;

        let mut values = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Ok(value) = document.get_str(field) {
                values.push(value.to_string());
            }
        }
        Ok(Some(values))
    }

    async fn insert_ledger_entry(
        &self,
        collection: &str,
        entry: &LedgerDocument,
    ) -> DbResult<()> {
        let mut document = Document::new();
        document.insert(entry.identity_field.as_str(), entry.identity.as_str());
        document.insert(
            "appliedAt",
            bson::DateTime::from_millis(entry.applied_at.timestamp_millis()),
        );
        document.insert("checksum", entry.checksum.as_str());

        self.db
            .collection::<Document>(collection)
            .insert_one(document)
            .await?;
        Ok(())
    }

    async fn drop_database(&self) -> DbResult<()> {
        self.db.drop().await?;
        Ok(())
    }

    fn database_name(&self) -> &str {
        &self.name
    }

    fn store_type(&self) -> &'static str {
        "mongodb"
    }
}
