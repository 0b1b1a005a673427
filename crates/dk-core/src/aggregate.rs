//! Aggregate output file
//!
//! One file per (database, phase), rebuilt on every run, holding the text of
//! every script the run applied (or, in dry-run mode, would have applied),
//! each preceded by a three-line banner:
//!
//! ```text
//! //
//! // -------------------- 001-init.js
//! //
//! print(1);
//! ```

use crate::error::{CoreError, CoreResult};
use crate::phase::Phase;
use crate::script_name::ScriptName;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const BANNER_RULE: &str = "// -------------------- ";

/// `<output_dir>/<output_name>.<database>.<phase><extension>`
pub fn aggregate_path(
    output_dir: &Path,
    output_name: &str,
    database: &str,
    phase: Phase,
    extension: &str,
) -> PathBuf {
    output_dir.join(format!(
        "{}.{}.{}{}",
        output_name, database, phase, extension
    ))
}

/// Writer for one aggregate file. Dropping it closes the file.
#[derive(Debug)]
pub struct AggregateWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AggregateWriter {
    /// Start a fresh aggregate file at `path`, replacing any previous one.
    pub fn create(path: &Path) -> CoreResult<Self> {
        if path.exists() {
            log::info!("  deleting: {}", path.display());
            std::fs::remove_file(path).map_err(|e| CoreError::io(path, e))?;
        }

        if let Some(parent) = path.parent() {
            log::debug!("  creating dir: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        log::info!("  creating: {}", path.display());
        let file = File::create(path).map_err(|e| CoreError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Append one script with its banner, then flush.
    pub fn append(&mut self, name: &ScriptName, body: &str) -> CoreResult<()> {
        let result = write!(self.writer, "//\n{}{}\n//\n{}", BANNER_RULE, name, body)
            .and_then(|()| self.writer.flush());
        result.map_err(|e| CoreError::io(&self.path, e))
    }

    /// Flush and close the file, returning its path.
    pub fn finish(mut self) -> CoreResult<PathBuf> {
        self.writer
            .flush()
            .map_err(|e| CoreError::io(&self.path, e))?;
        Ok(self.path)
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
