//! dk-runner - Migration runner for Docket
//!
//! This crate applies change scripts to the configured databases: it filters
//! them against each database's ledger, executes what is left, records the
//! successes, and writes the aggregate output files.

pub mod error;
pub mod executor;
pub mod ledger;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{RunnerError, RunnerResult};
pub use executor::{ScriptExecutor, ScriptOutcome};
pub use ledger::Ledger;
pub use runner::{MigrationRunner, PhaseStatus, RunOptions, StatusReport};
