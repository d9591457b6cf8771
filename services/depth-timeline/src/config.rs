//! Engine configuration
//!
//! Loaded from TOML by the host or built in code. Every field has a default
//! matching the viewer's out-of-the-box behavior: a 1 ms tick, a fetch every
//! 1000 ticks, ten levels per side and unbounded history.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors raised while loading or validating a [`TimelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Scheduler granularity in milliseconds.
    pub tick_ms: u64,
    /// Fetch fires once the elapsed counter exceeds this many ticks.
    pub interval_ticks: u64,
    /// Levels kept per side for every ladder.
    pub depth: usize,
    /// Retain at most this many snapshots; `None` keeps everything.
    pub history_capacity: Option<usize>,
    /// Start with polling suspended.
    pub start_suspended: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1,
            interval_ticks: 1000,
            depth: 10,
            history_capacity: None,
            start_suspended: false,
        }
    }
}

impl TimelineConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            tick_ms = config.tick_ms,
            interval_ticks = config.interval_ticks,
            depth = config.depth,
            "Timeline config loaded"
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be greater than 0".to_string()));
        }
        if self.depth == 0 {
            return Err(ConfigError::Invalid("depth must be greater than 0".to_string()));
        }
        if self.history_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "history_capacity must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}
