//! Configuration management with hierarchical layering.
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────┐
//! │  1. CLI flags (ConfigResolver)          │
//! ├─────────────────────────────────────────┤
//! │  2. Environment Variables (WEFT_*)      │
//! ├─────────────────────────────────────────┤
//! │  3. Project Config (.weft/config.toml)  │
//! ├─────────────────────────────────────────┤
//! │  4. Global Config (~/.weft/config.toml) │
//! ├─────────────────────────────────────────┤
//! │  5. Default Values                      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `WEFT_DEBUG` | `debug` | bool |
//! | `WEFT_WORKERS` | `build.workers` | usize |
//! | `WEFT_RESULT_TIMEOUT_MS` | `build.result_timeout_ms` | u64 |
//! | `WEFT_CACHE_DIR` | `build.cache_dir` | String |
//! | `WEFT_MODE` | `build.mode` | `development` / `production` |
//! | `WEFT_LOG` | `logging.level` | String |
//!
//! # Example Configuration
//!
//! ```toml
//! debug = false
//!
//! [build]
//! result_timeout_ms = 100
//! workers = 4
//! cache_dir = ".weft-cache"
//! mode = "development"
//!
//! [logging]
//! level = "warn"
//! ```

mod error;
mod loader;
mod resolver;
mod types;

pub use error::{ConfigError, ConfigLayer};
pub use loader::ConfigLoader;
pub use resolver::{ConfigResolver, NoOpResolver};
pub use types::{BuildConfig, LoggingConfig, WeftConfig};

/// Default global config directory.
#[must_use]
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".weft")
}

/// Default global config file path.
#[must_use]
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".weft";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
