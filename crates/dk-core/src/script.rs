//! Change script representation

use crate::error::{CoreError, CoreResult};
use crate::script_name::ScriptName;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// A script discovered in a phase directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptFile {
    /// File name, extension included
    pub name: ScriptName,

    /// Path to the file
    pub path: PathBuf,

    /// Position in the scanner's ordering, starting at 0
    pub order: usize,
}

/// A script with its body read from disk
#[derive(Debug, Clone)]
pub struct LoadedScript {
    pub file: ScriptFile,

    /// Normalized script text, sent to the store and written to the aggregate file
    pub body: String,

    /// SHA-256 of `body`
    pub checksum: String,
}

impl LoadedScript {
    pub fn name(&self) -> &ScriptName {
        &self.file.name
    }
}

impl ScriptFile {
    /// Read the script body.
    ///
    /// Every line is terminated with `\n` (CRLF becomes LF). With
    /// `trim_trailing_whitespace` each line also loses its trailing
    /// whitespace; otherwise lines are kept byte-for-byte.
    pub fn load(&self, trim_trailing_whitespace: bool) -> CoreResult<LoadedScript> {
        if !self.path.is_file() {
            return Err(CoreError::NotAFile {
                path: self.path.display().to_string(),
            });
        }

        let raw = std::fs::read_to_string(&self.path).map_err(|e| CoreError::io(&self.path, e))?;
        let body = normalize_body(&raw, trim_trailing_whitespace);
        let checksum = compute_checksum(&body);

        Ok(LoadedScript {
            file: self.clone(),
            body,
            checksum,
        })
    }
}

/// Hex SHA-256 of a script body, as stored in ledger entries and reports.
pub fn compute_checksum(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

/// Rebuild a script body line by line.
pub fn normalize_body(raw: &str, trim_trailing_whitespace: bool) -> String {
    let mut body = String::with_capacity(raw.len() + 1);
    for line in raw.lines() {
        if trim_trailing_whitespace {
            body.push_str(line.trim_end());
        } else {
            body.push_str(line);
        }
        body.push('\n');
    }
    body
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
