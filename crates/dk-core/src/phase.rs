//! Migration phases

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named stage of migration.
///
/// Each phase maps to a subdirectory of a database's script directory and to
/// its own aggregate output file. Phases never influence each other's
/// ordering or filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Create,
    Update,
    Populate,
}

impl Phase {
    /// All phases in the order a run processes them.
    pub const ALL: [Phase; 3] = [Phase::Create, Phase::Update, Phase::Populate];

    /// Directory name (and output-file suffix) for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Update => "update",
            Phase::Populate => "populate",
        }
    }

    /// Return the requested phases deduplicated and in run order.
    pub fn in_run_order(requested: &[Phase]) -> Vec<Phase> {
        Phase::ALL
            .into_iter()
            .filter(|p| requested.contains(p))
            .collect()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Phase::Create),
            "update" => Ok(Phase::Update),
            "populate" => Ok(Phase::Populate),
            _ => Err(CoreError::UnknownPhase {
                name: s.to_string(),
            }),
        }
    }
}
