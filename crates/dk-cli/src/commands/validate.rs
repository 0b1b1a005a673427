//! Validate command implementation

use anyhow::Result;
use dk_core::scanner::phase_dir;
use dk_core::{scan_phase, Config, CredentialStore, Phase};
use std::collections::HashSet;
use std::path::Path;

use crate::cli::{GlobalArgs, ValidateArgs};
use crate::commands::common::{load_credentials, load_project, ExitCode};

/// Validation result severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single validation issue
struct ValidationIssue {
    severity: Severity,
    code: &'static str,
    message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Collect validation issues
#[derive(Default)]
struct ValidationContext {
    issues: Vec<ValidationIssue>,
}

impl ValidationContext {
    fn error(&mut self, code: &'static str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            code,
            message: message.into(),
        });
    }

    fn warning(&mut self, code: &'static str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            code,
            message: message.into(),
        });
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    }
}

/// Execute the validate command
pub(crate) async fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let mut ctx = ValidationContext::default();

    match load_credentials(&project, global) {
        Ok(credentials) => check_connections(&project.config, &credentials, &mut ctx),
        Err(e) => ctx.error("V001", format!("{:#}", e)),
    }
    check_scripts(&project.config, &project.root, &mut ctx);

    for issue in &ctx.issues {
        println!("{}", issue);
    }

    let errors = ctx.count(Severity::Error);
    let warnings = ctx.count(Severity::Warning);
    println!();
    println!(
        "{}: {} error(s), {} warning(s)",
        project.config.name, errors, warnings
    );

    if errors > 0 || (args.strict && warnings > 0) {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn check_connections(config: &Config, credentials: &CredentialStore, ctx: &mut ValidationContext) {
    for (index, db) in config.databases.iter().enumerate() {
        let settings = &db.connection;
        if let Err(e) =
            dk_core::credentials::resolve_connection(&db.label(index), settings, credentials)
        {
            ctx.error("V002", e.to_string());
        }
    }
}

fn check_scripts(config: &Config, root: &Path, ctx: &mut ValidationContext) {
    let scripts_root = config.scripts_dir_absolute(root);
    if !scripts_root.is_dir() {
        ctx.warning(
            "W001",
            format!("Script directory {} does not exist", scripts_root.display()),
        );
        return;
    }

    let mut known = HashSet::new();
    for db in &config.databases {
        let database = db.connection.database.as_str();
        known.insert(database.to_string());

        let mut found = 0;
        for phase in Phase::ALL {
            let dir = phase_dir(&scripts_root, database, phase);
            if !dir.exists() {
                continue;
            }
            match scan_phase(&scripts_root, database, phase, &config.script_extension) {
                Ok(scripts) => {
                    found += scripts.len();
                    let entries = std::fs::read_dir(&dir).map(|d| d.count()).unwrap_or(0);
                    if entries > scripts.len() {
                        ctx.warning(
                            "W002",
                            format!(
                                "{}: {} entries ignored (not '{}' files)",
                                dir.display(),
                                entries - scripts.len(),
                                config.script_extension
                            ),
                        );
                    }
                }
                Err(e) => ctx.error("V003", e.to_string()),
            }
        }
        if found == 0 {
            ctx.warning(
                "W003",
                format!("No scripts found for database '{}'", database),
            );
        }
    }

    // Directories that no configured database will ever read
    if let Ok(entries) = std::fs::read_dir(&scripts_root) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && !known.contains(&name) {
                ctx.warning(
                    "W004",
                    format!(
                        "Directory {} does not match any configured database",
                        entry.path().display()
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
