//! Applied-script ledger
//!
//! The ledger is a collection in the target database holding one entry per
//! script that ran successfully. Entries are written after the script, not in
//! the same transaction, so a crash between the two re-runs the script on the
//! next invocation.

use chrono::{DateTime, Utc};
use dk_core::{LoadedScript, ScriptName};
use dk_db::{DbResult, DocumentStore, LedgerDocument};
use std::collections::BTreeSet;

/// Ledger collection of one database
pub struct Ledger<'a> {
    store: &'a dyn DocumentStore,
    collection: &'a str,
    field: &'a str,
}

impl<'a> Ledger<'a> {
    /// `field` is the entry field holding the script file name.
    pub fn new(store: &'a dyn DocumentStore, collection: &'a str, field: &'a str) -> Self {
        Self {
            store,
            collection,
            field,
        }
    }

    /// Names of every script recorded as applied.
    ///
    /// A missing collection means nothing has been applied yet.
    pub async fn list_applied(&self) -> DbResult<BTreeSet<ScriptName>> {
        let values = self
            .store
            .field_values(self.collection, self.field)
            .await?
            .unwrap_or_default();
        Ok(values.into_iter().filter_map(ScriptName::try_new).collect())
    }

    /// Record `script` as applied at `applied_at`.
    pub async fn record_applied(
        &self,
        script: &LoadedScript,
        applied_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let entry = LedgerDocument {
            identity_field: self.field.to_string(),
            identity: script.name().to_string(),
            applied_at,
            checksum: script.checksum.clone(),
        };
        self.store.insert_ledger_entry(self.collection, &entry).await?;
        log::debug!(
            "recorded '{}' in {}.{}",
            script.name(),
            self.store.database_name(),
            self.collection
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
