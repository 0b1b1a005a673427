//! dk-core - Core library for Docket
//!
//! This crate provides configuration parsing, credential resolution, script
//! discovery, the aggregate output writer, and run reports shared by the
//! runner and the CLI.

pub mod aggregate;
pub mod config;
pub mod credentials;
pub mod error;
mod newtype_string;
pub mod phase;
pub mod report;
pub mod scanner;
pub mod script;
pub mod script_name;

pub use aggregate::{aggregate_path, AggregateWriter};
pub use config::{
    Config, ConnectionFailurePolicy, ConnectionOptions, ConnectionSettings, DatabaseConfig,
    StoreKind,
};
pub use credentials::{Auth, CredentialStore, Credentials, ResolvedConnection};
pub use error::{CoreError, CoreResult};
pub use phase::Phase;
pub use report::{
    PhaseReport, RunReport, RunStatus, RunSummary, ScriptEvent, ScriptStatus, SkippedDatabase,
};
pub use scanner::scan_phase;
pub use script::{compute_checksum, LoadedScript, ScriptFile};
pub use script_name::ScriptName;
