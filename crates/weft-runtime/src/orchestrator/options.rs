//! Caller options and their resolution into engine options.
//!
//! # Defaults
//!
//! | Option | Default |
//! |--------|---------|
//! | `mode` | `development` |
//! | `minify` | `mode == production` |
//! | `scope_hoist` | `mode == production` |
//! | `content_hash` | `mode == production` |
//! | `source_maps` | `true` |
//! | `public_url` | `/` |
//! | `lazy` | `false` |
//! | `cache_dir` | `<project root>/.weft-cache` |
//!
//! Lazy building together with content hashing is rejected here, before
//! any build starts.

use crate::fs::FileSystem;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use weft_types::{BuildId, ErrorCode};

/// Files whose presence marks a project root.
pub const PROJECT_ROOT_MARKERS: &[&str] = &[
    "yarn.lock",
    "package-lock.json",
    "pnpm-lock.yaml",
    ".git",
    ".hg",
];

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Unoptimized output.
    #[default]
    Development,
    /// Optimized output.
    Production,
}

impl Mode {
    /// Returns the lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(OptionsError::InvalidMode(s.to_string())),
        }
    }
}

/// Option resolution failure.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`OptionsError::LazyWithContentHash`] | `OPTIONS_LAZY_WITH_CONTENT_HASH` | No |
/// | [`OptionsError::InvalidMode`] | `OPTIONS_INVALID_MODE` | No |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// Lazy building cannot be combined with content hashing.
    #[error("lazy bundling does not work with content hashing")]
    LazyWithContentHash,

    /// Unknown build mode.
    #[error("invalid mode '{0}' (expected development or production)")]
    InvalidMode(String),
}

impl ErrorCode for OptionsError {
    fn code(&self) -> &'static str {
        match self {
            Self::LazyWithContentHash => "OPTIONS_LAZY_WITH_CONTENT_HASH",
            Self::InvalidMode(_) => "OPTIONS_INVALID_MODE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Options supplied by the caller for one `bundle` or `watch` call.
///
/// `None` fields fall back to configuration, then to the defaults in the
/// module docs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
    /// Build mode.
    pub mode: Option<Mode>,
    /// Optimize output.
    pub minify: Option<bool>,
    /// Scope-hoist modules.
    pub scope_hoist: Option<bool>,
    /// Emit source maps.
    pub source_maps: Option<bool>,
    /// Public URL prefix.
    pub public_url: Option<String>,
    /// Content-hash bundle names.
    pub content_hash: Option<bool>,
    /// Build lazily on request.
    pub lazy: bool,
    /// Collect graph dumps.
    pub render_graphs: bool,
    /// Wait for and return the source-map visualization payload.
    pub view_sourcemaps: bool,
    /// Worker count.
    pub workers: Option<usize>,
    /// Cache directory override, relative to the working root.
    pub cache_dir: Option<String>,
    /// Dependencies for the synthesized manifest.
    pub dependencies: BTreeMap<String, String>,
}

/// Per-target defaults handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOptions {
    /// Output directory.
    pub dist_dir: String,
    /// Public URL prefix.
    pub public_url: String,
    /// Optimize output.
    pub should_optimize: bool,
    /// Scope-hoist modules.
    pub should_scope_hoist: bool,
    /// Emit source maps.
    pub source_maps: bool,
}

/// Fully resolved options for one orchestrator session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Absolute entry paths in the working filesystem.
    pub entries: Vec<String>,
    /// Build mode.
    pub mode: Mode,
    /// Project root.
    pub project_root: String,
    /// Cache directory.
    pub cache_dir: String,
    /// Session fingerprint.
    pub build_id: BuildId,
    /// Baseline engine configuration path.
    pub default_config: String,
    /// Target defaults.
    pub default_target: TargetOptions,
    /// Content-hash bundle names.
    pub should_content_hash: bool,
    /// Build lazily.
    pub should_build_lazily: bool,
}

/// Resolves caller options for `entries` under `project_root`.
///
/// # Errors
///
/// Returns [`OptionsError::LazyWithContentHash`] if both are enabled.
pub fn resolve_options(
    options: &BuildOptions,
    entries: Vec<String>,
    project_root: &str,
) -> Result<ResolvedOptions, OptionsError> {
    let mode = options.mode.unwrap_or_default();
    let production = mode == Mode::Production;

    let should_build_lazily = options.lazy;
    let should_content_hash = options.content_hash.unwrap_or(production);
    if should_build_lazily && should_content_hash {
        return Err(OptionsError::LazyWithContentHash);
    }

    let entries: Vec<String> = entries
        .iter()
        .map(|e| paths::resolve(paths::APP_DIR, e))
        .collect();

    let cache_dir = match &options.cache_dir {
        Some(dir) => paths::resolve(paths::APP_DIR, dir),
        None => paths::join(project_root, paths::DEFAULT_CACHE_DIRNAME),
    };

    Ok(ResolvedOptions {
        build_id: BuildId::generate(&entries),
        entries,
        mode,
        project_root: paths::normalize(project_root),
        cache_dir,
        default_config: paths::BASELINE_CONFIG.to_string(),
        default_target: TargetOptions {
            dist_dir: paths::DIST_DIR.to_string(),
            public_url: options.public_url.clone().unwrap_or_else(|| "/".to_string()),
            should_optimize: options.minify.unwrap_or(production),
            should_scope_hoist: options.scope_hoist.unwrap_or(production),
            source_maps: options.source_maps.unwrap_or(true),
        },
        should_content_hash,
        should_build_lazily,
    })
}

/// Finds the project root for `entries`.
///
/// Walks up from the entries' common directory looking for a lock file
/// or VCS directory; falls back to [`paths::APP_DIR`].
pub async fn resolve_project_root(fs: &dyn FileSystem, entries: &[String]) -> String {
    let mut dir = Some(entry_root(entries));
    while let Some(current) = dir {
        for marker in PROJECT_ROOT_MARKERS {
            if fs.exists(&paths::join(&current, marker)).await {
                return current;
            }
        }
        dir = paths::parent(&current);
    }
    paths::APP_DIR.to_string()
}

/// Deepest directory containing every entry.
fn entry_root(entries: &[String]) -> String {
    let mut dirs = entries.iter().filter_map(|e| paths::parent(e));
    let Some(first) = dirs.next() else {
        return paths::APP_DIR.to_string();
    };
    let mut common: Vec<String> = paths::components(&first).map(str::to_string).collect();
    for dir in dirs {
        let shared = common
            .iter()
            .zip(paths::components(&dir))
            .take_while(|(a, b)| a.as_str() == *b)
            .count();
        common.truncate(shared);
    }
    format!("/{}", common.join("/"))
}

/// Synthesizes a `package.json` declaring `dependencies`.
#[must_use]
pub fn generate_manifest(options: &BuildOptions) -> String {
    let manifest = serde_json::json!({
        "name": "weft-project",
        "private": true,
        "dependencies": options.dependencies,
    });
    let mut text = serde_json::to_string_pretty(&manifest).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use weft_types::assert_error_codes;

    fn entries() -> Vec<String> {
        vec!["/app/index.js".to_string()]
    }

    #[test]
    fn development_defaults() {
        let r = resolve_options(&BuildOptions::default(), entries(), "/app").unwrap();
        assert_eq!(r.mode, Mode::Development);
        assert!(!r.default_target.should_optimize);
        assert!(!r.default_target.should_scope_hoist);
        assert!(r.default_target.source_maps);
        assert_eq!(r.default_target.public_url, "/");
        assert_eq!(r.default_target.dist_dir, "/app/dist");
        assert!(!r.should_content_hash);
        assert_eq!(r.cache_dir, "/app/.weft-cache");
        assert_eq!(r.default_config, "/.weftrc");
    }

    #[test]
    fn production_defaults() {
        let options = BuildOptions {
            mode: Some(Mode::Production),
            ..Default::default()
        };
        let r = resolve_options(&options, entries(), "/app").unwrap();
        assert!(r.default_target.should_optimize);
        assert!(r.default_target.should_scope_hoist);
        assert!(r.should_content_hash);
    }

    #[test]
    fn explicit_values_win() {
        let options = BuildOptions {
            mode: Some(Mode::Production),
            minify: Some(false),
            source_maps: Some(false),
            public_url: Some("/static/".into()),
            cache_dir: Some("/tmp/cache".into()),
            ..Default::default()
        };
        let r = resolve_options(&options, entries(), "/app").unwrap();
        assert!(!r.default_target.should_optimize);
        assert!(!r.default_target.source_maps);
        assert_eq!(r.default_target.public_url, "/static/");
        assert_eq!(r.cache_dir, "/tmp/cache");
    }

    #[test]
    fn relative_cache_dir_resolves_against_working_root() {
        let options = BuildOptions {
            cache_dir: Some("cache".into()),
            ..Default::default()
        };
        let r = resolve_options(&options, entries(), "/app").unwrap();
        assert_eq!(r.cache_dir, "/app/cache");
    }

    #[test]
    fn lazy_with_content_hash_rejected() {
        let options = BuildOptions {
            lazy: true,
            mode: Some(Mode::Production),
            ..Default::default()
        };
        assert_eq!(
            resolve_options(&options, entries(), "/app"),
            Err(OptionsError::LazyWithContentHash)
        );

        let options = BuildOptions {
            lazy: true,
            content_hash: Some(false),
            mode: Some(Mode::Production),
            ..Default::default()
        };
        assert!(resolve_options(&options, entries(), "/app").is_ok());
    }

    #[test]
    fn build_id_differs_per_resolution() {
        let a = resolve_options(&BuildOptions::default(), entries(), "/app").unwrap();
        let b = resolve_options(&BuildOptions::default(), entries(), "/app").unwrap();
        assert_ne!(a.build_id, b.build_id);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("production".parse::<Mode>().unwrap(), Mode::Production);
        assert_eq!("DEV".parse::<Mode>().unwrap(), Mode::Development);
        assert!(matches!(
            "fast".parse::<Mode>(),
            Err(OptionsError::InvalidMode(_))
        ));
        assert_eq!(Mode::Production.to_string(), "production");
    }

    #[test]
    fn entry_root_is_common_directory() {
        assert_eq!(
            entry_root(&["/app/src/a.js".into(), "/app/src/b/c.js".into()]),
            "/app/src"
        );
        assert_eq!(
            entry_root(&["/app/src/a.js".into(), "/app/lib/b.js".into()]),
            "/app"
        );
        assert_eq!(entry_root(&[]), "/app");
    }

    #[tokio::test]
    async fn project_root_found_by_lock_file() {
        let fs = MemoryFs::new();
        fs.mkdirp("/app/pkg/src").await.unwrap();
        fs.write("/app/pkg/yarn.lock", "").await.unwrap();

        let root = resolve_project_root(&fs, &["/app/pkg/src/index.js".into()]).await;
        assert_eq!(root, "/app/pkg");

        let root = resolve_project_root(&fs, &["/app/other/index.js".into()]).await;
        assert_eq!(root, "/app");
    }

    #[test]
    fn manifest_lists_dependencies() {
        let mut options = BuildOptions::default();
        options.dependencies.insert("lodash".into(), "^4.17.0".into());
        let manifest = generate_manifest(&options);
        let value: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(value["dependencies"]["lodash"], "^4.17.0");
        assert!(manifest.ends_with('\n'));
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                OptionsError::LazyWithContentHash,
                OptionsError::InvalidMode("x".into()),
            ],
            "OPTIONS_",
        );
    }
}
