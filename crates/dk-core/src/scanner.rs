//! Script discovery within a phase directory

use crate::error::{CoreError, CoreResult};
use crate::phase::Phase;
use crate::script::ScriptFile;
use crate::script_name::ScriptName;
use std::path::{Path, PathBuf};

/// Directory holding one database's scripts for one phase.
pub fn phase_dir(scripts_root: &Path, database: &str, phase: Phase) -> PathBuf {
    scripts_root.join(database).join(phase.as_str())
}

/// List the scripts of `<scripts_root>/<database>/<phase>` in apply order.
///
/// A missing directory means there is nothing to do and yields an empty
/// list. Only immediate regular files whose name ends with `extension` are
/// returned, sorted by the bytes of their names.
pub fn scan_phase(
    scripts_root: &Path,
    database: &str,
    phase: Phase,
    extension: &str,
) -> CoreResult<Vec<ScriptFile>> {
    let dir = phase_dir(scripts_root, database, phase);

    if !dir.exists() {
        log::info!("  no scripts found at: {}", dir.display());
        return Ok(Vec::new());
    }

    if !dir.is_dir() {
        return Err(CoreError::NotADirectory {
            path: dir.display().to_string(),
        });
    }

    let mut found: Vec<(ScriptName, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(|e| CoreError::io(&dir, e))? {
        let entry = entry.map_err(|e| CoreError::io(&dir, e))?;
        let path = entry.path();

        if !path.is_file() {
            log::debug!("    skipping non-file entry {}", path.display());
            continue;
        }

        let Some(file_name) = entry.file_name().to_str().map(String::from) else {
            log::warn!("    skipping {}: file name is not valid UTF-8", path.display());
            continue;
        };

        if !file_name.ends_with(extension) {
            log::info!(
                "    file '{}' ignored. Doesn't end with '{}'",
                file_name,
                extension
            );
            continue;
        }

        if let Some(name) = ScriptName::try_new(file_name) {
            found.push((name, path));
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(found
        .into_iter()
        .enumerate()
        .map(|(order, (name, path))| ScriptFile { name, path, order })
        .collect())
}

#[cfg(test)]
#[path = "scanner_test.rs"]
mod tests;
