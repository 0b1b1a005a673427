//! Drop command implementation

use anyhow::{Context, Result};
use dk_db::BackendConnector;
use dk_runner::{MigrationRunner, RunOptions};

use crate::cli::{DropArgs, GlobalArgs};
use crate::commands::common::{database_filter, load_credentials, load_project, ExitCode};

/// Execute the drop command
pub(crate) async fn execute(args: &DropArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let config = &project.config;

    if !args.yes {
        let names: Vec<&str> = config
            .databases
            .iter()
            .map(|db| db.connection.database.as_str())
            .collect();
        eprintln!("Refusing to drop {} without --yes", names.join(", "));
        return Err(ExitCode(2).into());
    }

    let credentials = load_credentials(&project, global)?;
    let connector = BackendConnector::new();
    let runner = MigrationRunner::new(
        config,
        &project.root,
        RunOptions::from_config(config),
        &connector,
    );
    let filter = database_filter(global);
    let dropped = runner
        .drop(&credentials, filter.as_deref())
        .await
        .context("Drop failed")?;

    for name in &dropped {
        println!("Dropped {}", name);
    }
    Ok(())
}
