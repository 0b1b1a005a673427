//! Run reports
//!
//! The runner turns every per-script outcome into a [`ScriptEvent`]. The
//! events of one (database, phase) pair form a [`PhaseReport`]; all phase
//! reports of a run form a [`RunReport`], which the CLI saves next to the
//! aggregate files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::phase::Phase;
use crate::script_name::ScriptName;

/// Report of one run across all selected databases and phases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    pub status: RunStatus,

    /// Whether scripts were sent to the stores (false for dry runs)
    pub execute_scripts: bool,

    pub phases: Vec<PhaseReport>,

    /// Databases left out because they could not be connected to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_databases: Vec<SkippedDatabase>,

    /// Error that stopped the run before every phase was processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    /// Every attempted script succeeded
    Completed,
    /// At least one script failed, a database was skipped, or the run
    /// stopped early
    Failed,
}

/// Events for one (database, phase) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub database: String,
    pub phase: Phase,

    /// Whether the ledger filtered and recorded this phase's scripts
    pub ledger_gated: bool,

    /// Aggregate file written for this phase, if the phase directory existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_path: Option<PathBuf>,

    pub events: Vec<ScriptEvent>,
}

/// Outcome of one script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub script: ScriptName,
    pub status: ScriptStatus,

    /// Checksum of the body that was sent (absent for already-applied scripts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-script status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    /// Executed successfully
    Applied,
    /// Store reported an error, or the call faulted or timed out
    Failed,
    /// Not sent because script execution is switched off
    Skipped,
    /// Filtered out by the ledger
    AlreadyApplied,
}

/// A database that was not processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDatabase {
    pub database: String,
    pub error: String,
}

impl ScriptEvent {
    pub fn already_applied(script: ScriptName) -> Self {
        Self {
            script,
            status: ScriptStatus::AlreadyApplied,
            checksum: None,
            duration_ms: 0,
            error: None,
        }
    }
}

impl PhaseReport {
    pub fn new(database: &str, phase: Phase, ledger_gated: bool) -> Self {
        Self {
            database: database.to_string(),
            phase,
            ledger_gated,
            aggregate_path: None,
            events: Vec::new(),
        }
    }

    /// Count events with the given status
    pub fn count(&self, status: ScriptStatus) -> usize {
        self.events.iter().filter(|e| e.status == status).count()
    }

    /// Names of scripts with the given status, in processing order
    pub fn scripts_with(&self, status: ScriptStatus) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.script.as_str())
            .collect()
    }
}

impl RunReport {
    pub fn new(execute_scripts: bool) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            execute_scripts,
            phases: Vec::new(),
            skipped_databases: Vec::new(),
            error: None,
        }
    }

    /// Mark the run as finished and derive its status
    pub fn mark_finished(&mut self) {
        let any_failed = self
            .phases
            .iter()
            .any(|p| p.count(ScriptStatus::Failed) > 0);
        let stopped = self.error.is_some();
        self.status = if any_failed || stopped || !self.skipped_databases.is_empty() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        self.finished_at = Some(Utc::now());
    }

    /// Find the report for one (database, phase) pair
    pub fn phase(&self, database: &str, phase: Phase) -> Option<&PhaseReport> {
        self.phases
            .iter()
            .find(|p| p.database == database && p.phase == phase)
    }

    /// Get summary statistics
    pub fn summary(&self) -> RunSummary {
        let events = self.phases.iter().flat_map(|p| p.events.iter());
        let mut summary = RunSummary::default();
        for event in events {
            match event.status {
                ScriptStatus::Applied => summary.applied += 1,
                ScriptStatus::Failed => summary.failed += 1,
                ScriptStatus::Skipped => summary.skipped += 1,
                ScriptStatus::AlreadyApplied => summary.already_applied += 1,
            }
            summary.total_duration_ms += event.duration_ms;
        }
        summary
    }

    /// Load a report from a file path
    pub fn load(path: &Path) -> CoreResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let report: RunReport = serde_json::from_str(&content)?;
        Ok(Some(report))
    }

    /// Save the report to a file path atomically
    ///
    /// Uses write-to-temp-then-rename pattern to prevent corruption
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json).map_err(|e| CoreError::io(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| CoreError::io(path, e))?;

        Ok(())
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
    pub already_applied: usize,
    pub total_duration_ms: u64,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptStatus::Applied => write!(f, "applied"),
            ScriptStatus::Failed => write!(f, "failed"),
            ScriptStatus::Skipped => write!(f, "skipped"),
            ScriptStatus::AlreadyApplied => write!(f, "already applied"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn event(name: &str, status: ScriptStatus, duration_ms: u64) -> ScriptEvent {
        ScriptEvent {
            script: ScriptName::new(name),
            status,
            checksum: Some("abc".to_string()),
            duration_ms,
            error: None,
        }
    }

    fn sample_report() -> RunReport {
        let mut report = RunReport::new(true);
        let mut update = PhaseReport::new("app", Phase::Update, true);
        update
            .events
            .push(ScriptEvent::already_applied(ScriptName::new("001.js")));
        update.events.push(event("002.js", ScriptStatus::Applied, 1500));
        update.events.push(event("003.js", ScriptStatus::Failed, 20));
        report.phases.push(update);

        let mut create = PhaseReport::new("app", Phase::Create, false);
        create.events.push(event("001.js", ScriptStatus::Applied, 500));
        report.phases.push(create);
        report
    }

    #[test]
    fn test_run_report_new() {
        let report = RunReport::new(false);
        assert_eq!(report.run_id.len(), 8);
        assert_eq!(report.status, RunStatus::Running);
        assert!(!report.execute_scripts);
        assert!(report.finished_at.is_none());
    }

    #[test]
    fn test_summary() {
        let summary = sample_report().summary();
        assert_eq!(
            summary,
            RunSummary {
                applied: 2,
                failed: 1,
                skipped: 0,
                already_applied: 1,
                total_duration_ms: 2020,
            }
        );
    }

    #[test]
    fn test_mark_finished_failed_when_a_script_failed() {
        let mut report = sample_report();
        report.mark_finished();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_mark_finished_failed_when_database_skipped() {
        let mut report = RunReport::new(true);
        report.skipped_databases.push(SkippedDatabase {
            database: "app".to_string(),
            error: "connection refused".to_string(),
        });
        report.mark_finished();
        assert_eq!(report.status, RunStatus::Failed);
    }

    #[test]
    fn test_mark_finished_failed_when_run_stopped() {
        let mut report = RunReport::new(true);
        let mut phase = PhaseReport::new("app", Phase::Update, true);
        phase.events.push(event("001.js", ScriptStatus::Applied, 1));
        report.phases.push(phase);
        report.error = Some("[C001] Failed to read file".to_string());
        report.mark_finished();
        assert_eq!(report.status, RunStatus::Failed);
    }

    #[test]
    fn test_mark_finished_completed() {
        let mut report = RunReport::new(true);
        let mut phase = PhaseReport::new("app", Phase::Update, true);
        phase.events.push(event("001.js", ScriptStatus::Applied, 1));
        report.phases.push(phase);
        report.mark_finished();
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[test]
    fn test_phase_lookup_and_filters() {
        let report = sample_report();
        let update = report.phase("app", Phase::Update).unwrap();
        assert_eq!(update.scripts_with(ScriptStatus::Applied), vec!["002.js"]);
        assert_eq!(update.count(ScriptStatus::AlreadyApplied), 1);
        assert!(report.phase("app", Phase::Populate).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        let mut report = sample_report();
        report.mark_finished();
        report.save(&path).unwrap();

        let loaded = RunReport::load(&path).unwrap().unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.phases.len(), 2);
        assert_eq!(loaded.status, RunStatus::Failed);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempdir().unwrap();
        assert!(RunReport::load(&dir.path().join("none.json"))
            .unwrap()
            .is_none());
    }
}
