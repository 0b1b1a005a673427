//! Docket CLI - applies versioned change scripts to document databases

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{drop, run, status, validate};

/// Route `log` records from the library crates to stderr.
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
        cli::Commands::Validate(args) => validate::execute(args, &cli.global).await,
        cli::Commands::Drop(args) => drop::execute(args, &cli.global).await,
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match dispatch(&cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
                return std::process::ExitCode::from(*code as u8);
            }
            eprintln!("Error: {:#}", err);
            std::process::ExitCode::FAILURE
        }
    }
}
