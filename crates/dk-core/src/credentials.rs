//! Credential resolution
//!
//! A database entry names its credentials in one of three ways: a reference
//! to an entry in the credentials file (`server_id`), an inline
//! username/password pair, or nothing at all. The reference wins when both a
//! reference and an inline pair are present. Resolution happens once, before
//! any connection is opened, and produces a [`ResolvedConnection`].

use crate::config::{ConnectionOptions, ConnectionSettings, StoreKind};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How a database entry authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Look up username/password in the credentials file
    ByReference(String),
    /// Username/password written in docket.yml
    Inline { username: String, password: String },
    /// Connect without authenticating
    Anonymous,
}

impl ConnectionSettings {
    /// Classify the credential fields of this entry.
    pub fn credentials(&self) -> Credentials {
        if let Some(id) = self.server_id.as_deref().filter(|s| !s.is_empty()) {
            return Credentials::ByReference(id.to_string());
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Credentials::Inline {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Credentials::Anonymous,
        }
    }
}

/// Username/password used to authenticate a connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One entry of the credentials file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerCredential {
    pub id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Host used when the database entry leaves `hostname` empty
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// Named credentials loaded from a YAML file:
///
/// ```yaml
/// servers:
///   - id: prod-mongo
///     username: deploy
///     password: s3cret
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialStore {
    #[serde(default)]
    pub servers: Vec<ServerCredential>,
}

impl CredentialStore {
    /// A store with no entries; every reference fails to resolve.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a credentials file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::CredentialsFileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::YamlParse {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Load the file at `path`, or return an empty store when there is none.
    pub fn load_optional(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::empty()),
        }
    }

    /// Find an entry by id
    pub fn get(&self, id: &str) -> Option<&ServerCredential> {
        self.servers.iter().find(|s| s.id == id)
    }
}

/// Connection settings with credentials resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub backend: StoreKind,
    pub hostname: String,
    pub port: Option<u16>,
    pub database: String,
    pub auth: Option<Auth>,
    pub options: ConnectionOptions,
}

/// Resolve one entry's connection settings against the credentials file.
///
/// `entry` labels the configuration entry in error messages.
pub fn resolve_connection(
    entry: &str,
    settings: &ConnectionSettings,
    credentials: &CredentialStore,
) -> CoreResult<ResolvedConnection> {
    let configured_host = settings
        .hostname
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty());

    let (auth, fallback_host, fallback_port) = match settings.credentials() {
        Credentials::ByReference(id) => {
            let server = credentials
                .get(&id)
                .ok_or_else(|| CoreError::CredentialNotFound {
                    entry: entry.to_string(),
                    server_id: id.clone(),
                })?;
            // An entry without both halves authenticates anonymously
            let auth = match (&server.username, &server.password) {
                (Some(u), Some(p)) => Some(Auth {
                    username: u.clone(),
                    password: p.clone(),
                }),
                _ => None,
            };
            (auth, server.hostname.clone(), server.port)
        }
        Credentials::Inline { username, password } => {
            (Some(Auth { username, password }), None, None)
        }
        Credentials::Anonymous => (None, None, None),
    };

    let hostname = match configured_host {
        Some(h) => h.to_string(),
        None => fallback_host
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| CoreError::ConnectionSettingsInvalid {
                entry: entry.to_string(),
                reason: "No hostname defined!".to_string(),
            })?,
    };

    Ok(ResolvedConnection {
        backend: settings.backend,
        hostname,
        port: settings.port.or(fallback_port),
        database: settings.database.clone(),
        auth,
        options: settings.options.clone(),
    })
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
