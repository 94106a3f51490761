//! Relay configuration file.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable that overrides `log_level`.
pub const LOG_LEVEL_ENV: &str = "RELAY_LOG_LEVEL";

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write-path tuning shared by the coordinator-backed sinks.
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
}

/// Serialisable retry and timeout settings for the write coordinator.
///
/// Durations are whole milliseconds so config files stay plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Attempts per write, including the first. Zero behaves as one.
    pub max_retries: u32,
    /// Base backoff; attempt `i` waits `retry_timeout_ms * (i + 1)` before retrying.
    pub retry_timeout_ms: u64,
    /// Per-attempt timeout enforced by the backend call.
    pub timeout_ms: u64,
    /// Replaces the computed join budget when set.
    pub budget_override_ms: Option<u64>,
    /// Write entries sharing a derived key sequentially.
    pub group_by_key: bool,
    /// Bound the whole batch by one deadline instead of re-arming per result.
    pub shared_deadline: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_timeout_ms: 10,
            timeout_ms: 1000,
            budget_override_ms: None,
            group_by_key: false,
            shared_deadline: false,
        }
    }
}

impl CoordinatorSettings {
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn budget_override(&self) -> Option<Duration> {
        self.budget_override_ms.map(Duration::from_millis)
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            coordinator: CoordinatorSettings::default(),
        }
    }
}

impl RelayConfig {
    /// Defaults, then environment overrides.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Loads `path` if it exists (defaults otherwise), then applies
    /// environment overrides.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a specific file without overrides.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.log_level.trim().is_empty() {
            return Err(CoreError::Config("log_level must not be empty".to_string()));
        }
        if self.coordinator.budget_override_ms == Some(0) {
            return Err(CoreError::Config(
                "coordinator.budget_override_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var(LOG_LEVEL_ENV) {
            if !log_level.trim().is_empty() {
                self.log_level = log_level;
            }
        }
    }
}
