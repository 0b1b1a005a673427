//! Configuration types and parsing for docket.yml

use crate::credentials::{resolve_connection, CredentialStore, ResolvedConnection};
use crate::error::{CoreError, CoreResult};
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the credentials file.
pub const CREDENTIALS_ENV: &str = "DOCKET_CREDENTIALS";

/// Environment variable restricting a run to a comma-separated set of databases.
pub const DATABASE_ENV: &str = "DOCKET_DATABASE";

/// Main project configuration from docket.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name, also the default aggregate output base name
    pub name: String,

    /// Root of the script tree: `<scripts_dir>/<database>/<phase>/`
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Directory receiving the aggregate files and the run report
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Base name of the aggregate files (defaults to `name`)
    #[serde(default)]
    pub output_name: Option<String>,

    /// Only files ending with this suffix are treated as scripts
    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    /// When false, scripts are only assembled into the aggregate files
    #[serde(default = "default_true")]
    pub execute_scripts: bool,

    /// Strip trailing whitespace from every script line before use
    #[serde(default)]
    pub trim_trailing_whitespace: bool,

    /// Per-script execution timeout in seconds
    #[serde(default)]
    pub script_timeout_secs: Option<u64>,

    /// Phases whose scripts are checked against, and recorded in, the ledger
    #[serde(default = "default_ledger_phases")]
    pub ledger_phases: Vec<Phase>,

    /// What to do when a database cannot be connected to
    #[serde(default)]
    pub on_connection_error: ConnectionFailurePolicy,

    /// Credentials file used to resolve `server_id` references
    #[serde(default)]
    pub credentials_file: Option<String>,

    /// Target databases, processed in order
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
}

/// One logical target database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// How to reach the database
    pub connection: ConnectionSettings,

    /// Collection holding the applied-script ledger
    #[serde(default = "default_updates_collection")]
    pub updates_collection: String,

    /// Field of a ledger entry that stores the script name
    #[serde(default = "default_updates_name_field")]
    pub updates_name_field: String,
}

impl DatabaseConfig {
    /// Label used in messages about this entry, e.g. `databases[0] (app)`.
    pub fn label(&self, index: usize) -> String {
        format!("databases[{}] ({})", index, self.connection.database)
    }
}

/// Store backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Embedded DuckDB file; `hostname` is the file path
    #[default]
    DuckDb,
    /// MongoDB server
    MongoDb,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::DuckDb => write!(f, "duckdb"),
            StoreKind::MongoDb => write!(f, "mongodb"),
        }
    }
}

/// Connection settings for one database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSettings {
    #[serde(rename = "type", default)]
    pub backend: StoreKind,

    /// Server host name (DuckDB: database file path or `:memory:`)
    #[serde(default)]
    pub hostname: Option<String>,

    /// Port, when not the store default
    #[serde(default)]
    pub port: Option<u16>,

    /// Database name (DuckDB: schema name)
    pub database: String,

    /// Entry in the credentials file to take username/password from
    #[serde(default)]
    pub server_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Store-specific connection options
    #[serde(default)]
    pub options: ConnectionOptions,
}

/// Optional store connection options. Backends ignore what they do not use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionOptions {
    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default)]
    pub server_selection_timeout_ms: Option<u64>,

    #[serde(default)]
    pub max_pool_size: Option<u32>,

    /// Database to authenticate against (MongoDB defaults to the target database)
    #[serde(default)]
    pub auth_source: Option<String>,

    #[serde(default)]
    pub direct_connection: Option<bool>,
}

/// Behavior when a configured database cannot be connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionFailurePolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Log and continue with the next database
    Skip,
}

fn default_true() -> bool {
    true
}

fn default_scripts_dir() -> String {
    "scripts".to_string()
}

fn default_output_dir() -> String {
    "target/docket".to_string()
}

fn default_script_extension() -> String {
    ".js".to_string()
}

fn default_ledger_phases() -> Vec<Phase> {
    vec![Phase::Update]
}

fn default_updates_collection() -> String {
    "appliedUpdates".to_string()
}

fn default_updates_name_field() -> String {
    "name".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::YamlParse {
                path: path.display().to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for docket.yml or docket.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("docket.yml");
        let yaml_path = dir.join("docket.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.script_extension.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "script_extension cannot be empty".to_string(),
            });
        }

        if self.script_timeout_secs == Some(0) {
            return Err(CoreError::ConfigInvalid {
                message: "script_timeout_secs must be greater than zero".to_string(),
            });
        }

        if self.databases.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one entry in 'databases' is required".to_string(),
            });
        }

        // Aggregate files are keyed by database name, so names must not collide
        let mut seen = HashSet::new();
        for (index, db) in self.databases.iter().enumerate() {
            let name = db.connection.database.as_str();
            if name.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("databases[{}]: database name cannot be empty", index),
                });
            }
            // The name is used verbatim as a directory and file name component
            if name != name.trim() {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{}: database name cannot start or end with whitespace",
                        db.label(index)
                    ),
                });
            }
            if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{}: database name must be a single path component",
                        db.label(index)
                    ),
                });
            }
            if !seen.insert(name) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Duplicate database name '{}'", name),
                });
            }
            if db.updates_collection.is_empty() || db.updates_name_field.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!(
                        "{}: updates_collection and updates_name_field cannot be empty",
                        db.label(index)
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the absolute script root
    pub fn scripts_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.scripts_dir)
    }

    /// Get the absolute output directory
    pub fn output_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir)
    }

    /// Base name of the aggregate files
    pub fn output_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(&self.name)
    }

    /// Per-script timeout, if configured
    pub fn script_timeout(&self) -> Option<Duration> {
        self.script_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve the credentials file.
    ///
    /// Priority: CLI flag > `DOCKET_CREDENTIALS` > `credentials_file`.
    /// Relative config paths are taken from the project root.
    pub fn resolve_credentials_path(&self, root: &Path, cli: Option<&str>) -> Option<PathBuf> {
        cli.map(PathBuf::from)
            .or_else(|| std::env::var(CREDENTIALS_ENV).ok().map(PathBuf::from))
            .or_else(|| self.credentials_file.as_ref().map(|p| root.join(p)))
    }

    /// Resolve the database filter.
    ///
    /// Priority: CLI flag > `DOCKET_DATABASE`. `None` means all databases.
    pub fn resolve_database_filter(cli: Option<&str>) -> Option<Vec<String>> {
        let raw = cli
            .map(String::from)
            .or_else(|| std::env::var(DATABASE_ENV).ok())?;
        let names: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }

    /// Resolve every database's connection settings up front.
    ///
    /// Fails on the first entry whose credential reference does not resolve
    /// or that has no hostname, before anything is connected to.
    pub fn resolve_connections(
        &self,
        credentials: &CredentialStore,
    ) -> CoreResult<Vec<ResolvedConnection>> {
        self.databases
            .iter()
            .enumerate()
            .map(|(index, db)| resolve_connection(&db.label(index), &db.connection, credentials))
            .collect()
    }

    /// Indexes of the databases selected by `filter`, in configuration order.
    pub fn select_databases(&self, filter: Option<&[String]>) -> CoreResult<Vec<usize>> {
        let Some(names) = filter else {
            return Ok((0..self.databases.len()).collect());
        };

        for name in names {
            if !self
                .databases
                .iter()
                .any(|db| &db.connection.database == name)
            {
                return Err(CoreError::ConfigInvalid {
                    message: format!("Unknown database '{}' in database filter", name),
                });
            }
        }

        Ok(self
            .databases
            .iter()
            .enumerate()
            .filter(|(_, db)| names.contains(&db.connection.database))
            .map(|(index, _)| index)
            .collect())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
