//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use crate::orchestrator::{Mode, OrchestratorConfig, DEFAULT_RESULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure.
///
/// # Example
///
/// ```
/// use weft_runtime::config::WeftConfig;
///
/// let config = WeftConfig::default();
/// assert!(!config.debug);
/// assert_eq!(config.build.result_timeout_ms, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeftConfig {
    /// Enable debug logging.
    pub debug: bool,

    /// Build settings.
    pub build: BuildConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

impl WeftConfig {
    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Values from `other` override values in `self` only if they
    /// differ from the default.
    pub fn merge(&mut self, other: &Self) {
        if other.debug {
            self.debug = true;
        }
        self.build.merge(&other.build);
        self.logging.merge(&other.logging);
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    /// Wait for a structured result after the engine returns, in
    /// milliseconds.
    pub result_timeout_ms: u64,

    /// Worker count. Defaults to available parallelism.
    pub workers: Option<usize>,

    /// Cache directory, relative to the working root.
    pub cache_dir: Option<String>,

    /// Build mode.
    pub mode: Option<Mode>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            result_timeout_ms: u64::try_from(DEFAULT_RESULT_TIMEOUT.as_millis()).unwrap_or(100),
            workers: None,
            cache_dir: None,
            mode: None,
        }
    }
}

impl BuildConfig {
    fn merge(&mut self, other: &Self) {
        let default = Self::default();

        if other.result_timeout_ms != default.result_timeout_ms {
            self.result_timeout_ms = other.result_timeout_ms;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.cache_dir.is_some() {
            self.cache_dir.clone_from(&other.cache_dir);
        }
        if other.mode.is_some() {
            self.mode = other.mode;
        }
    }

    /// Orchestrator settings for this section.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            result_timeout: Duration::from_millis(self.result_timeout_ms),
            workers: self.workers,
            cache_dir: self.cache_dir.clone(),
            mode: self.mode,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    fn merge(&mut self, other: &Self) {
        if other.level != Self::default().level {
            self.level.clone_from(&other.level);
        }
    }
}
