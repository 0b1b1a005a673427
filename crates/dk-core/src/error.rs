//! Error types for dk-core

use thiserror::Error;

/// Core error type for Docket
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: A database entry cannot be connected to as configured
    #[error("[C003] [connectionSettings] {entry}: {reason}")]
    ConnectionSettingsInvalid { entry: String, reason: String },

    /// C004: Credential reference does not resolve
    #[error("[C004] [connectionSettings] {entry}: Server ID: {server_id} not found!")]
    CredentialNotFound { entry: String, server_id: String },

    /// C005: Credentials file not found
    #[error("[C005] Credentials file not found: {path}")]
    CredentialsFileNotFound { path: String },

    /// C006: Script path exists but is not a directory
    #[error("[C006] {path} is not a directory")]
    NotADirectory { path: String },

    /// C007: Script file vanished or is not a regular file
    #[error("[C007] {path} is not a file")]
    NotAFile { path: String },

    /// C008: Unknown phase name
    #[error("[C008] Unknown phase '{name}': expected one of create, update, populate")]
    UnknownPhase { name: String },

    /// C009: IO error with file path context
    #[error("[C009] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C010: YAML parse error
    #[error("[C010] Failed to parse {path}: {source}")]
    YamlParse {
        path: String,
        source: serde_yaml::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
