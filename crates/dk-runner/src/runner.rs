//! Migration runner
//!
//! Walks the selected databases in configuration order and, for each, the
//! requested phases in run order. Every script of a phase ends up as one
//! [`ScriptEvent`] in the phase report; the ledger and the aggregate file are
//! both driven from those outcomes and never look at each other.

use crate::error::{RunnerError, RunnerResult};
use crate::executor::{ScriptExecutor, ScriptOutcome};
use crate::ledger::Ledger;
use chrono::Utc;
use dk_core::scanner::phase_dir;
use dk_core::{
    aggregate_path, scan_phase, AggregateWriter, Config, ConnectionFailurePolicy,
    CredentialStore, DatabaseConfig, Phase, PhaseReport, ResolvedConnection, RunReport,
    ScriptEvent, ScriptName, ScriptStatus, SkippedDatabase,
};
use dk_db::{DocumentStore, StoreConnector};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Behavior toggles for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Send scripts to the store. When false nothing is executed or recorded,
    /// but aggregate files are still written.
    pub execute_scripts: bool,
    pub trim_trailing_whitespace: bool,
    pub script_timeout: Option<Duration>,
    /// Phases filtered by and recorded in the ledger
    pub ledger_phases: Vec<Phase>,
    pub on_connection_error: ConnectionFailurePolicy,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            execute_scripts: config.execute_scripts,
            trim_trailing_whitespace: config.trim_trailing_whitespace,
            script_timeout: config.script_timeout(),
            ledger_phases: config.ledger_phases.clone(),
            on_connection_error: config.on_connection_error,
        }
    }

    fn is_ledger_phase(&self, phase: Phase) -> bool {
        self.ledger_phases.contains(&phase)
    }
}

/// Applied and pending scripts of one (database, phase) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStatus {
    pub database: String,
    pub phase: Phase,
    pub ledger_gated: bool,
    pub applied: Vec<ScriptName>,
    pub pending: Vec<ScriptName>,
}

/// Result of a status check
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub phases: Vec<PhaseStatus>,
    pub skipped_databases: Vec<SkippedDatabase>,
}

/// A selected database with its connection settings resolved
struct Target<'c> {
    db: &'c DatabaseConfig,
    connection: ResolvedConnection,
}

/// Runs change scripts against the configured databases
pub struct MigrationRunner<'a> {
    config: &'a Config,
    scripts_root: PathBuf,
    output_dir: PathBuf,
    options: RunOptions,
    executor: ScriptExecutor,
    connector: &'a dyn StoreConnector,
}

impl<'a> MigrationRunner<'a> {
    /// `root` is the project directory that relative paths in `config` are
    /// resolved against.
    pub fn new(
        config: &'a Config,
        root: &Path,
        options: RunOptions,
        connector: &'a dyn StoreConnector,
    ) -> Self {
        let executor = ScriptExecutor::new(options.execute_scripts, options.script_timeout);
        Self {
            config,
            scripts_root: config.scripts_dir_absolute(root),
            output_dir: config.output_dir_absolute(root),
            options,
            executor,
            connector,
        }
    }

    /// Aggregate file of one (database, phase) pair
    pub fn aggregate_path(&self, database: &str, phase: Phase) -> PathBuf {
        aggregate_path(
            &self.output_dir,
            self.config.output_name(),
            database,
            phase,
            &self.config.script_extension,
        )
    }

    /// Resolve every configured database, then keep the ones `filter` selects.
    ///
    /// Resolution covers all databases, selected or not, so a broken entry
    /// stops the run before any store is touched.
    fn targets(
        &self,
        credentials: &CredentialStore,
        filter: Option<&[String]>,
    ) -> RunnerResult<Vec<Target<'a>>> {
        let config = self.config;
        let mut connections: Vec<Option<ResolvedConnection>> = config
            .resolve_connections(credentials)?
            .into_iter()
            .map(Some)
            .collect();
        let selected = config.select_databases(filter)?;

        Ok(selected
            .into_iter()
            .filter_map(|index| {
                connections[index].take().map(|connection| Target {
                    db: &config.databases[index],
                    connection,
                })
            })
            .collect())
    }

    async fn connect(
        &self,
        target: &Target<'_>,
        skipped: &mut Vec<SkippedDatabase>,
    ) -> RunnerResult<Option<Arc<dyn DocumentStore>>> {
        let database = &target.connection.database;
        match self.connector.connect(&target.connection).await {
            Ok(store) => {
                log::info!(
                    "connected to {} database '{}' at {}",
                    store.store_type(),
                    database,
                    target.connection.hostname
                );
                Ok(Some(store))
            }
            Err(source) => match self.options.on_connection_error {
                ConnectionFailurePolicy::Abort => Err(RunnerError::ConnectionFailed {
                    database: database.clone(),
                    source,
                }),
                ConnectionFailurePolicy::Skip => {
                    log::error!("skipping database '{}': {}", database, source);
                    skipped.push(SkippedDatabase {
                        database: database.clone(),
                        error: source.to_string(),
                    });
                    Ok(None)
                }
            },
        }
    }

    /// Apply the scripts of `phases` to every selected database.
    ///
    /// Only pre-check failures are returned as errors. Anything that stops
    /// the run once stores have been touched is recorded on the report,
    /// which still lists every phase processed up to that point.
    pub async fn run(
        &self,
        credentials: &CredentialStore,
        phases: &[Phase],
        filter: Option<&[String]>,
    ) -> RunnerResult<RunReport> {
        let targets = self.targets(credentials, filter)?;
        let phases = Phase::in_run_order(phases);
        let mut report = RunReport::new(self.options.execute_scripts);

        if let Err(e) = self.run_targets(&targets, &phases, &mut report).await {
            log::error!("run stopped: {}", e);
            report.error = Some(e.to_string());
        }

        report.mark_finished();
        Ok(report)
    }

    async fn run_targets(
        &self,
        targets: &[Target<'_>],
        phases: &[Phase],
        report: &mut RunReport,
    ) -> RunnerResult<()> {
        for target in targets {
            let Some(store) = self.connect(target, &mut report.skipped_databases).await? else {
                continue;
            };
            for &phase in phases {
                let mut phase_report = self.phase_report(target.db, phase);
                let result = self
                    .apply_phase(store.as_ref(), target.db, &mut phase_report)
                    .await;
                report.phases.push(phase_report);
                result?;
            }
        }
        Ok(())
    }

    fn phase_report(&self, db: &DatabaseConfig, phase: Phase) -> PhaseReport {
        PhaseReport::new(
            &db.connection.database,
            phase,
            self.options.is_ledger_phase(phase),
        )
    }

    /// Apply one phase of one database.
    ///
    /// Script failures are recorded in the returned report. Filesystem errors
    /// and ledger read failures end the phase with an error; the aggregate
    /// file then holds the scripts appended up to that point.
    pub async fn run_phase(
        &self,
        store: &dyn DocumentStore,
        db: &DatabaseConfig,
        phase: Phase,
    ) -> RunnerResult<PhaseReport> {
        let mut report = self.phase_report(db, phase);
        self.apply_phase(store, db, &mut report).await?;
        Ok(report)
    }

    async fn apply_phase(
        &self,
        store: &dyn DocumentStore,
        db: &DatabaseConfig,
        report: &mut PhaseReport,
    ) -> RunnerResult<()> {
        let database = db.connection.database.as_str();
        let phase = report.phase;
        let gated = report.ledger_gated;

        log::info!("database '{}': {} phase", database, phase);
        let scripts = scan_phase(
            &self.scripts_root,
            database,
            phase,
            &self.config.script_extension,
        )?;
        let dir = phase_dir(&self.scripts_root, database, phase);
        if !dir.exists() {
            return Ok(());
        }

        let ledger = Ledger::new(store, &db.updates_collection, &db.updates_name_field);
        let applied = if gated {
            ledger
                .list_applied()
                .await
                .map_err(|source| RunnerError::LedgerRead {
                    database: database.to_string(),
                    collection: db.updates_collection.clone(),
                    source,
                })?
        } else {
            BTreeSet::new()
        };

        let mut writer = AggregateWriter::create(&self.aggregate_path(database, phase))?;
        log::info!("  executing scripts in: {}", dir.display());

        for file in scripts {
            if applied.contains(&file.name) {
                log::info!("    script '{}' ignored. Already applied.", file.name);
                report.events.push(ScriptEvent::already_applied(file.name));
                continue;
            }

            let script = file.load(self.options.trim_trailing_whitespace)?;
            let outcome = self.executor.execute(store, &script).await;
            let mut event = ScriptEvent {
                script: script.name().clone(),
                status: ScriptStatus::Applied,
                checksum: Some(script.checksum.clone()),
                duration_ms: outcome.elapsed().as_millis() as u64,
                error: None,
            };

            if gated && matches!(outcome, ScriptOutcome::Applied { .. }) {
                if let Err(e) = ledger.record_applied(&script, Utc::now()).await {
                    log::warn!(
                        "    script '{}' applied but not recorded in '{}': {}",
                        script.name(),
                        db.updates_collection,
                        e
                    );
                    event.error = Some(format!("ledger write failed: {}", e));
                }
            }
            let appendable = outcome.is_appendable();
            match outcome {
                ScriptOutcome::Applied { .. } => {}
                ScriptOutcome::Skipped => event.status = ScriptStatus::Skipped,
                ScriptOutcome::Failed { message, cause, .. } => {
                    event.status = ScriptStatus::Failed;
                    event.error = Some(match cause {
                        Some(cause) => format!("{} ({})", message, cause),
                        None => message,
                    });
                }
            }
            // Pushed before the append so a write error still reports the script
            report.events.push(event);
            if appendable {
                writer.append(script.name(), &script.body)?;
            }
        }

        report.aggregate_path = Some(writer.finish()?);
        Ok(())
    }

    /// Compare the scripts on disk with each ledger without executing anything.
    pub async fn status(
        &self,
        credentials: &CredentialStore,
        phases: &[Phase],
        filter: Option<&[String]>,
    ) -> RunnerResult<StatusReport> {
        let targets = self.targets(credentials, filter)?;
        let phases = Phase::in_run_order(phases);
        let mut status = StatusReport::default();

        for target in &targets {
            let Some(store) = self.connect(target, &mut status.skipped_databases).await? else {
                continue;
            };
            let db = target.db;
            let database = db.connection.database.as_str();
            let ledger = Ledger::new(
                store.as_ref(),
                &db.updates_collection,
                &db.updates_name_field,
            );

            for &phase in &phases {
                let gated = self.options.is_ledger_phase(phase);
                let scripts = scan_phase(
                    &self.scripts_root,
                    database,
                    phase,
                    &self.config.script_extension,
                )?;
                let applied = if gated && !scripts.is_empty() {
                    ledger
                        .list_applied()
                        .await
                        .map_err(|source| RunnerError::LedgerRead {
                            database: database.to_string(),
                            collection: db.updates_collection.clone(),
                            source,
                        })?
                } else {
                    BTreeSet::new()
                };

                let (done, pending): (Vec<_>, Vec<_>) = scripts
                    .into_iter()
                    .map(|f| f.name)
                    .partition(|name| applied.contains(name));
                status.phases.push(PhaseStatus {
                    database: database.to_string(),
                    phase,
                    ledger_gated: gated,
                    applied: done,
                    pending,
                });
            }
        }

        Ok(status)
    }

    /// Drop every selected database. Returns the names of those dropped.
    pub async fn drop(
        &self,
        credentials: &CredentialStore,
        filter: Option<&[String]>,
    ) -> RunnerResult<Vec<String>> {
        let targets = self.targets(credentials, filter)?;
        let mut skipped = Vec::new();
        let mut dropped = Vec::new();

        for target in &targets {
            let Some(store) = self.connect(target, &mut skipped).await? else {
                continue;
            };
            let database = store.database_name().to_string();
            store
                .drop_database()
                .await
                .map_err(|source| RunnerError::DropFailed {
                    database: database.clone(),
                    source,
                })?;
            log::info!("dropped database '{}'", database);
            dropped.push(database);
        }

        Ok(dropped)
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
