//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dk_core::{Config, CredentialStore};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: main.rs turns this into a process exit code, not a message.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A loaded project: its root directory and parsed configuration.
pub(crate) struct ProjectContext {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

/// Load the project configuration honoring `--project-dir` and `--config`.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<ProjectContext> {
    let root = PathBuf::from(&global.project_dir);
    let config = match &global.config {
        Some(path) => Config::load(Path::new(path)),
        None => Config::load_from_dir(&root),
    }
    .with_context(|| format!("Failed to load project at {}", root.display()))?;

    Ok(ProjectContext { root, config })
}

/// Load the credentials file, if one is configured.
///
/// Priority: `--credentials` / `DOCKET_CREDENTIALS`, then `credentials_file`.
pub(crate) fn load_credentials(
    project: &ProjectContext,
    global: &GlobalArgs,
) -> Result<CredentialStore> {
    let path = project
        .config
        .resolve_credentials_path(&project.root, global.credentials.as_deref());
    if let Some(path) = &path {
        log::debug!("using credentials from {}", path.display());
    }
    CredentialStore::load_optional(path.as_deref()).context("Failed to load credentials")
}

/// Databases named by `--database` / `DOCKET_DATABASE`, or `None` for all.
pub(crate) fn database_filter(global: &GlobalArgs) -> Option<Vec<String>> {
    Config::resolve_database_filter(global.database.as_deref())
}

/// Format a millisecond duration for summaries.
pub(crate) fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}
