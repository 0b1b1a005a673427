//! Run command implementation

use anyhow::{Context, Result};
use dk_core::{RunReport, RunStatus, ScriptStatus};
use dk_db::BackendConnector;
use dk_runner::{MigrationRunner, RunOptions};
use std::path::PathBuf;

use crate::cli::{selected_phases, GlobalArgs, RunArgs};
use crate::commands::common::{
    database_filter, format_duration_ms, load_credentials, load_project, ExitCode,
};

/// Execute the run command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let credentials = load_credentials(&project, global)?;
    let config = &project.config;

    let mut options = RunOptions::from_config(config);
    if args.dry_run {
        options.execute_scripts = false;
    }
    if !options.execute_scripts {
        println!("Script execution disabled: writing aggregate files only\n");
    }

    let phases = selected_phases(&args.phase);
    let filter = database_filter(global);
    let connector = BackendConnector::new();
    let runner = MigrationRunner::new(config, &project.root, options, &connector);

    let report = runner
        .run(&credentials, &phases, filter.as_deref())
        .await
        .context("Run aborted")?;

    print_report(&report);

    let report_path = args
        .report
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            config
                .output_dir_absolute(&project.root)
                .join(format!("{}.report.json", config.output_name()))
        });
    report
        .save(&report_path)
        .with_context(|| format!("Failed to save run report to {}", report_path.display()))?;
    log::debug!("run report written to {}", report_path.display());

    if report.status == RunStatus::Failed {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn status_label(status: ScriptStatus) -> &'static str {
    match status {
        ScriptStatus::Applied => "OK",
        ScriptStatus::Failed => "FAIL",
        ScriptStatus::Skipped => "SKIP",
        ScriptStatus::AlreadyApplied => "DONE",
    }
}

fn print_report(report: &RunReport) {
    for phase in &report.phases {
        if phase.events.is_empty() && phase.aggregate_path.is_none() {
            continue;
        }
        println!("{} / {}", phase.database, phase.phase);
        for event in &phase.events {
            match &event.error {
                Some(error) => println!(
                    "  [{}] {} ({}) {}",
                    status_label(event.status),
                    event.script,
                    format_duration_ms(event.duration_ms),
                    error
                ),
                None => println!(
                    "  [{}] {} ({})",
                    status_label(event.status),
                    event.script,
                    format_duration_ms(event.duration_ms)
                ),
            }
        }
        if let Some(path) = &phase.aggregate_path {
            println!("  -> {}", path.display());
        }
    }

    for skipped in &report.skipped_databases {
        println!("{}: skipped ({})", skipped.database, skipped.error);
    }
    if let Some(error) = &report.error {
        eprintln!("Run stopped: {}", error);
    }

    let summary = report.summary();
    println!();
    println!(
        "Run {} {}: {} applied, {} failed, {} skipped, {} already applied in {}",
        report.run_id,
        report.status,
        summary.applied,
        summary.failed,
        summary.skipped,
        summary.already_applied,
        format_duration_ms(summary.total_duration_ms)
    );
}
