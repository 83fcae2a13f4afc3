//! Orchestrator configuration.
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! overrides. Binaries apply their command-line flags last.
//!
//! ```toml
//! agent_timeout_secs = 30
//! log_json = false
//! log_level = "info"
//!
//! [store]
//! backend = "surreal"
//! url = "ws://localhost:8000"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{OrchestratorError, Result};

pub const ENV_AGENT_TIMEOUT: &str = "CLAIMFLOW_AGENT_TIMEOUT_SECS";
pub const ENV_LOG_FORMAT: &str = "CLAIMFLOW_LOG_FORMAT";
pub const ENV_SURREALDB_URL: &str = "SURREALDB_URL";

const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOCAL_PATH: &str = ".claimflow/db";

/// Where orchestrator state lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local; lost on exit.
    Memory,
    /// Remote SurrealDB endpoint (`ws://`, `wss://`, `http://`).
    Surreal { url: String },
    /// Embedded SurrealKV database on disk.
    Local { path: PathBuf },
}

impl StoreConfig {
    /// `.claimflow/db` under the working directory.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(DEFAULT_LOCAL_PATH)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Local {
            path: Self::default_local_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on a single agent execution.
    pub agent_timeout_secs: u64,
    pub log_json: bool,
    pub log_level: String,
    pub store: StoreConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_timeout_secs: DEFAULT_AGENT_TIMEOUT_SECS,
            log_json: false,
            log_level: "info".to_string(),
            store: StoreConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Configuration(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| OrchestratorError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_AGENT_TIMEOUT) {
            self.agent_timeout_secs = raw.trim().parse().map_err(|_| {
                OrchestratorError::Configuration(format!(
                    "{ENV_AGENT_TIMEOUT} must be a whole number of seconds, got {raw:?}"
                ))
            })?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log_json = format.eq_ignore_ascii_case("json");
        }
        if let Some(url) = lookup(ENV_SURREALDB_URL) {
            if !url.is_empty() {
                self.store = StoreConfig::Surreal { url };
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_timeout_secs == 0 {
            return Err(OrchestratorError::Configuration(
                "agent_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }
}
