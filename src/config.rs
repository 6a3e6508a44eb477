//! Solver configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SolverError};
use crate::models::RecognitionHints;

pub(crate) const DEFAULT_BASE_URL: &str = "http://antigate.com";

/// Immutable settings for a [`SolverClient`](crate::SolverClient).
///
/// Every field except `api_key` has a serde default, so a minimal JSON
/// config is just `{"api_key": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Service endpoint, without the `/in.php` or `/res.php` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub api_key: String,

    /// Delay between status queries, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Total polling budget, in seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub hints: RecognitionHints,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_max_wait_secs() -> u64 {
    120
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl SolverConfig {
    /// Config with the given key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            hints: RecognitionHints::default(),
        }
    }

    /// Load and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SolverConfig = serde_json::from_str(&raw)
            .map_err(|e| SolverError::Config(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the polling loop relies on.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SolverError::Config("API key is empty".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(SolverError::Config(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SolverError::Config(
                "request timeout must be greater than zero".into(),
            ));
        }
        if self.max_wait_secs < self.poll_interval_secs {
            return Err(SolverError::Config(format!(
                "max wait ({}s) is shorter than the poll interval ({}s)",
                self.max_wait_secs, self.poll_interval_secs
            )));
        }
        self.hints.validate()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
