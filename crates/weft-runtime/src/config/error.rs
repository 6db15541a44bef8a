//! Configuration errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ConfigError::Unreadable`] | `CONFIG_UNREADABLE` | No |
//! | [`ConfigError::Malformed`] | `CONFIG_MALFORMED` | No |
//! | [`ConfigError::InvalidEnv`] | `CONFIG_INVALID_ENV` | No |
//!
//! None are recoverable: the user has to fix the file or the variable.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use weft_types::ErrorCode;

/// File layer a config error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `~/.weft/config.toml` or the `--config` override.
    Global,
    /// `<project>/.weft/config.toml`.
    Project,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Project => f.write_str("project"),
        }
    }
}

/// Failure while layering configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {layer} config {}: {source}", .path.display())]
    Unreadable {
        layer: ConfigLayer,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file is not valid TOML for [`WeftConfig`](super::WeftConfig).
    #[error("{layer} config {} is invalid: {source}", .path.display())]
    Malformed {
        layer: ConfigLayer,
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A `WEFT_*` variable holds a value of the wrong shape.
    #[error("{var}={value:?} is invalid: expected {expected}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid_env(
        var: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidEnv {
            var,
            value: value.into(),
            expected,
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unreadable { .. } => "CONFIG_UNREADABLE",
            Self::Malformed { .. } => "CONFIG_MALFORMED",
            Self::InvalidEnv { .. } => "CONFIG_INVALID_ENV",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
