//! Status command implementation

use anyhow::{Context, Result};
use dk_db::BackendConnector;
use dk_runner::{MigrationRunner, RunOptions, StatusReport};
use serde_json::json;

use crate::cli::{selected_phases, GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{database_filter, load_credentials, load_project};

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let credentials = load_credentials(&project, global)?;
    let config = &project.config;

    let connector = BackendConnector::new();
    let runner = MigrationRunner::new(
        config,
        &project.root,
        RunOptions::from_config(config),
        &connector,
    );
    let filter = database_filter(global);
    let status = runner
        .status(&credentials, &selected_phases(&args.phase), filter.as_deref())
        .await
        .context("Status check failed")?;

    match args.output {
        StatusOutput::Table => print_table(&status),
        StatusOutput::Json => {
            let json = status_json(&status);
            println!(
                "{}",
                serde_json::to_string_pretty(&json).context("Failed to serialize status")?
            );
        }
    }
    Ok(())
}

fn print_table(status: &StatusReport) {
    let mut pending_total = 0;
    for phase in &status.phases {
        let gate = if phase.ledger_gated { "" } else { " (always runs)" };
        println!(
            "{} / {}{}: {} applied, {} pending",
            phase.database,
            phase.phase,
            gate,
            phase.applied.len(),
            phase.pending.len()
        );
        for name in &phase.pending {
            println!("  pending  {}", name);
        }
        pending_total += phase.pending.len();
    }
    for skipped in &status.skipped_databases {
        println!("{}: unreachable ({})", skipped.database, skipped.error);
    }
    println!();
    println!("{} script(s) pending", pending_total);
}

fn status_json(status: &StatusReport) -> serde_json::Value {
    let phases: Vec<_> = status
        .phases
        .iter()
        .map(|p| {
            json!({
                "database": p.database,
                "phase": p.phase,
                "ledger_gated": p.ledger_gated,
                "applied": p.applied,
                "pending": p.pending,
            })
        })
        .collect();
    let skipped: Vec<_> = status
        .skipped_databases
        .iter()
        .map(|s| json!({ "database": s.database, "error": s.error }))
        .collect();
    json!({ "phases": phases, "skipped_databases": skipped })
}
