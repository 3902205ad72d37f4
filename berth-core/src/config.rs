//! Configuration management.

use crate::error::{BerthError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Docker endpoint (`unix://…`, `tcp://…`); local defaults when unset
    pub docker_host: Option<String>,
    /// Deadline for a single platform call
    pub platform_timeout_secs: u64,
    /// Extra attempts for transient failures on reads and teardown calls
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Grace period the engine gives a container to stop before killing it
    pub stop_timeout_secs: u64,
    /// Run per-field definition checks before provisioning
    pub strict_validation: bool,
    /// Base directory for relative bind-mount sources
    pub project_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            platform_timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
            stop_timeout_secs: 10,
            strict_validation: true,
            project_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Default configuration file location: `<config dir>/berth/config.json`.
    pub fn config_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("berth").join("config.json")
    }

    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let config = if path.exists() { Self::load_from(&path)? } else { Self::default() };
        config.with_env_overrides()
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BerthError::Io { path: path.to_path_buf(), source: e })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| BerthError::InvalidConfig {
            reason: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BERTH_DOCKER_HOST`, `BERTH_PLATFORM_TIMEOUT_SECS` and `BERTH_LOG_LEVEL`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup("BERTH_DOCKER_HOST") {
            self.docker_host = Some(host);
        }
        if let Some(secs) = lookup("BERTH_PLATFORM_TIMEOUT_SECS") {
            self.platform_timeout_secs = secs.parse().map_err(|_| BerthError::InvalidConfig {
                reason: format!("BERTH_PLATFORM_TIMEOUT_SECS must be an integer, got '{}'", secs),
            })?;
        }
        if let Some(level) = lookup("BERTH_LOG_LEVEL") {
            self.log_level = level;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.platform_timeout_secs == 0 {
            return Err(BerthError::InvalidConfig {
                reason: "platform_timeout_secs must be greater than zero".to_string(),
            });
        }
        // A stop call waits out the grace period, so it has to fit the call deadline.
        if self.stop_timeout_secs >= self.platform_timeout_secs {
            return Err(BerthError::InvalidConfig {
                reason: format!(
                    "stop_timeout_secs ({}) must be less than platform_timeout_secs ({})",
                    self.stop_timeout_secs, self.platform_timeout_secs
                ),
            });
        }
        Ok(())
    }
}
