//! Configuration loader with hierarchical merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Global config (`~/.weft/config.toml`)
//! 3. Project config (`.weft/config.toml`)
//! 4. Environment variables (`WEFT_*`)
//!
//! Each layer overrides the previous.

use super::{
    default_config_path, ConfigError, ConfigLayer, WeftConfig, PROJECT_CONFIG_DIR,
    PROJECT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

macro_rules! parse_env_bool {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = parse_bool(&val)
                .ok_or_else(|| ConfigError::invalid_env($var, val.as_str(), "a boolean"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```ignore
/// use weft_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root("/path/to/project")
///     .skip_env_vars()
///     .load()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    global_config_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    skip_env: bool,
    skip_global: bool,
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom global config path.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Sets the project root directory.
    ///
    /// Project config is loaded from `<project_root>/.weft/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips global config loading.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file exists but cannot be
    /// parsed, or an environment variable has an invalid value.
    /// Missing config files are ignored.
    pub fn load(&self) -> Result<WeftConfig, ConfigError> {
        let mut config = WeftConfig::default();

        if !self.skip_global {
            let global_path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);
            if let Some(global) = load_file(ConfigLayer::Global, &global_path)? {
                debug!(path = %global_path.display(), "loaded global config");
                config.merge(&global);
            }
        }

        if !self.skip_project {
            if let Some(root) = &self.project_root {
                let path = root.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILE);
                if let Some(project) = load_file(ConfigLayer::Project, &path)? {
                    debug!(path = %path.display(), "loaded project config");
                    config.merge(&project);
                }
            }
        }

        if !self.skip_env {
            apply_env_vars(&mut config)?;
        }

        Ok(config)
    }
}

fn load_file(layer: ConfigLayer, path: &Path) -> Result<Option<WeftConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        layer,
        path: path.to_path_buf(),
        source,
    })?;
    let config = WeftConfig::from_toml(&content).map_err(|source| ConfigError::Malformed {
        layer,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

fn apply_env_vars(config: &mut WeftConfig) -> Result<(), ConfigError> {
    parse_env_bool!(config.debug, "WEFT_DEBUG");

    if let Some(workers) = parse_env::<usize>("WEFT_WORKERS", "a positive integer")? {
        config.build.workers = Some(workers);
    }
    if let Some(ms) = parse_env::<u64>("WEFT_RESULT_TIMEOUT_MS", "milliseconds")? {
        config.build.result_timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("WEFT_CACHE_DIR") {
        config.build.cache_dir = Some(val);
    }
    if let Ok(val) = std::env::var("WEFT_MODE") {
        let mode = val.parse().map_err(|_| {
            ConfigError::invalid_env("WEFT_MODE", val.as_str(), "development or production")
        })?;
        config.build.mode = Some(mode);
    }
    if let Ok(val) = std::env::var("WEFT_LOG") {
        config.logging.level = val;
    }

    Ok(())
}

fn parse_env<T: FromStr>(
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid_env(name, val.as_str(), expected)),
        Err(_) => Ok(None),
    }
}

/// Parses a boolean from string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off"
/// (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Mode;
    use tempfile::TempDir;
    use weft_types::ErrorCode;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap();
        assert_eq!(config, WeftConfig::default());
    }

    #[test]
    fn load_project_overrides_global() {
        let global_temp = TempDir::new().unwrap();
        let project_temp = TempDir::new().unwrap();
        let weft_dir = project_temp.path().join(".weft");
        std::fs::create_dir_all(&weft_dir).unwrap();

        let global_path = create_config_file(
            global_temp.path(),
            r#"
debug = true

[build]
workers = 2
mode = "development"
"#,
        );
        create_config_file(
            &weft_dir,
            r#"
[build]
mode = "production"
"#,
        );

        let config = ConfigLoader::new()
            .with_global_config(&global_path)
            .with_project_root(project_temp.path())
            .skip_env_vars()
            .load()
            .unwrap();

        assert!(config.debug);
        assert_eq!(config.build.workers, Some(2));
        assert_eq!(config.build.mode, Some(Mode::Production));
    }

    #[test]
    fn missing_config_files_ok() {
        let config = ConfigLoader::new()
            .with_global_config("/nonexistent/path/config.toml")
            .with_project_root("/nonexistent/project")
            .skip_env_vars()
            .load()
            .unwrap();
        assert_eq!(config, WeftConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), "[build\nworkers = ");
        let err = ConfigLoader::new()
            .with_global_config(&path)
            .skip_project_config()
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Malformed {
                layer: ConfigLayer::Global,
                ..
            }
        ));
    }

    #[test]
    fn malformed_project_file_names_its_layer() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(PROJECT_CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(PROJECT_CONFIG_FILE), "debug = \"sometimes\"").unwrap();

        let err = ConfigLoader::new()
            .with_project_root(temp.path())
            .skip_global_config()
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_MALFORMED");
        assert!(err.to_string().starts_with("project config "));
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn env_var_override() {
        // Modifies process env; the variables are unique to this test.
        std::env::set_var("WEFT_DEBUG", "yes");
        std::env::set_var("WEFT_WORKERS", "3");
        std::env::set_var("WEFT_RESULT_TIMEOUT_MS", "250");
        std::env::set_var("WEFT_MODE", "prod");

        let result = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .load();

        std::env::set_var("WEFT_WORKERS", "many");
        let invalid = ConfigLoader::new()
            .skip_global_config()
            .skip_project_config()
            .load();

        for var in ["WEFT_DEBUG", "WEFT_WORKERS", "WEFT_RESULT_TIMEOUT_MS", "WEFT_MODE"] {
            std::env::remove_var(var);
        }

        let config = result.unwrap();
        assert!(config.debug);
        assert_eq!(config.build.workers, Some(3));
        assert_eq!(config.build.result_timeout_ms, 250);
        assert_eq!(config.build.mode, Some(Mode::Production));
        assert!(matches!(
            invalid,
            Err(ConfigError::InvalidEnv { var: "WEFT_WORKERS", ref value, .. }) if value == "many"
        ));
    }
}
