//! Script execution

use dk_core::LoadedScript;
use dk_db::{DocumentStore, EvalResult};
use std::time::{Duration, Instant};

/// What happened to one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The store ran the script without error
    Applied { elapsed: Duration },

    /// The store reported an error, or the call itself failed
    Failed {
        message: String,
        cause: Option<String>,
        elapsed: Duration,
    },

    /// Script execution is disabled; nothing was sent
    Skipped,
}

impl ScriptOutcome {
    /// Whether the script belongs in the aggregate file
    pub fn is_appendable(&self) -> bool {
        !matches!(self, ScriptOutcome::Failed { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ScriptOutcome::Applied { elapsed } | ScriptOutcome::Failed { elapsed, .. } => *elapsed,
            ScriptOutcome::Skipped => Duration::ZERO,
        }
    }
}

/// Sends scripts to a store one at a time
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    execute_scripts: bool,
    timeout: Option<Duration>,
}

impl ScriptExecutor {
    pub fn new(execute_scripts: bool, timeout: Option<Duration>) -> Self {
        Self {
            execute_scripts,
            timeout,
        }
    }

    /// Run one script against `store`.
    ///
    /// Never returns an error: store failures, faults, and timeouts all
    /// become [`ScriptOutcome::Failed`] so the caller can move on to the next
    /// script. On timeout the `eval` future is dropped; stores must abandon
    /// the script without committing it when that happens.
    pub async fn execute(&self, store: &dyn DocumentStore, script: &LoadedScript) -> ScriptOutcome {
        let name = script.name();
        if !self.execute_scripts {
            log::info!("    script '{}' not executed (execution disabled)", name);
            return ScriptOutcome::Skipped;
        }

        log::info!("    executing script: {}", name);
        let start = Instant::now();
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, store.eval(&script.body)).await {
                Ok(result) => result,
                Err(_) => {
                    let elapsed = start.elapsed();
                    log::error!(
                        "    error executing {}: timed out after {} second(s)",
                        name,
                        limit.as_secs()
                    );
                    return ScriptOutcome::Failed {
                        message: format!("timed out after {} second(s)", limit.as_secs()),
                        cause: None,
                        elapsed,
                    };
                }
            },
            None => store.eval(&script.body).await,
        };
        let elapsed = start.elapsed();

        match result {
            Ok(EvalResult::Ok) => {
                log::info!("    {} executed successfully", name);
                log::info!(
                    "    script '{}' completed execution in {:.3} second(s)",
                    name,
                    elapsed.as_secs_f64()
                );
                ScriptOutcome::Applied { elapsed }
            }
            Ok(EvalResult::Failed { message, cause }) => {
                match &cause {
                    Some(cause) => log::warn!("Error executing {}: {} ({})", name, message, cause),
                    None => log::warn!("Error executing {}: {}", name, message),
                }
                ScriptOutcome::Failed {
                    message,
                    cause,
                    elapsed,
                }
            }
            Err(e) => {
                log::error!("    error executing {}: {}", name, e);
                ScriptOutcome::Failed {
                    message: e.to_string(),
                    cause: None,
                    elapsed,
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
