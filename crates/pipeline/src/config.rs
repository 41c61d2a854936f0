use std::time::Duration;

use genflow_core::GenerationError;

/// Default dry-run delay in milliseconds.
pub const DEFAULT_DRY_RUN_DELAY_MS: u64 = 1500;

/// Orchestrator behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Replace the remote call with a synthesized result.
    pub dry_run: bool,
    /// Fixed wait before a dry run commits.
    pub dry_run_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            dry_run_delay: Duration::from_millis(DEFAULT_DRY_RUN_DELAY_MS),
        }
    }
}

impl OrchestratorConfig {
    /// Enabled dry run with the default delay.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn with_dry_run_delay(mut self, delay: Duration) -> Self {
        self.dry_run_delay = delay;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `GENFLOW_DRY_RUN`          | `false` |
    /// | `GENFLOW_DRY_RUN_DELAY_MS` | `1500`  |
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GenerationError> {
        let dry_run = match lookup("GENFLOW_DRY_RUN") {
            Some(raw) => parse_bool("GENFLOW_DRY_RUN", &raw)?,
            None => false,
        };

        let dry_run_delay = match lookup("GENFLOW_DRY_RUN_DELAY_MS") {
            Some(raw) => raw.trim().parse().map(Duration::from_millis).map_err(|_| {
                GenerationError::Config(format!(
                    "GENFLOW_DRY_RUN_DELAY_MS must be a number, got '{raw}'"
                ))
            })?,
            None => Duration::from_millis(DEFAULT_DRY_RUN_DELAY_MS),
        };

        Ok(Self {
            dry_run,
            dry_run_delay,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, GenerationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(GenerationError::Config(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}
