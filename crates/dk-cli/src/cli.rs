//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use dk_core::Phase;

/// Docket - applies versioned change scripts to document databases
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Credentials file (overrides DOCKET_CREDENTIALS and credentials_file)
    #[arg(long, global = true)]
    pub credentials: Option<String>,

    /// Only process these databases (comma-separated, overrides DOCKET_DATABASE)
    #[arg(short, long, global = true)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending change scripts and write the aggregate files
    Run(RunArgs),

    /// Show applied and pending scripts without executing anything
    Status(StatusArgs),

    /// Check the configuration, credentials, and script directories
    Validate(ValidateArgs),

    /// Drop the configured databases
    Drop(DropArgs),
}

/// Phase selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseArg {
    Create,
    Update,
    Populate,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Create => Phase::Create,
            PhaseArg::Update => Phase::Update,
            PhaseArg::Populate => Phase::Populate,
        }
    }
}

/// Resolve `--phase` values, defaulting to every phase.
pub fn selected_phases(args: &[PhaseArg]) -> Vec<Phase> {
    if args.is_empty() {
        Phase::ALL.to_vec()
    } else {
        args.iter().copied().map(Phase::from).collect()
    }
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Phases to run (comma-separated, default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub phase: Vec<PhaseArg>,

    /// Write the aggregate files without sending scripts to the store
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run report here instead of next to the aggregate files
    #[arg(long)]
    pub report: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Phases to check (comma-separated, default: all)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub phase: Vec<PhaseArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the drop command
#[derive(Args, Debug)]
pub struct DropArgs {
    /// Confirm dropping the databases
    #[arg(long)]
    pub yes: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
