//! Dependency installation seam and progress classification.
//!
//! Installers report line-oriented text; the orchestrator maps the
//! well-known step markers onto [`InstallPhase`] values and forwards them
//! to the caller's progress callback.

use crate::fs::{FileSystem, FsError};
use crate::paths;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use weft_types::ErrorCode;

/// Installer output callback.
pub type OutputSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Phase of a dependency install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallPhase {
    /// Resolving versions.
    Resolving,
    /// Fetching packages.
    Fetching,
    /// Linking into the dependency directory.
    Linking,
}

/// Progress reported to `bundle`/`watch` callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "phase", rename_all = "lowercase")]
pub enum Progress {
    /// Dependency installation reached a phase.
    Installing(InstallPhase),
    /// The engine started building.
    Bundling,
}

/// Maps one line of installer output to a phase.
///
/// ```
/// use weft_runtime::orchestrator::{classify_progress, InstallPhase};
///
/// assert_eq!(classify_progress("➤ YN0000: ┌ Fetch step"), Some(InstallPhase::Fetching));
/// assert_eq!(classify_progress("done"), None);
/// ```
#[must_use]
pub fn classify_progress(line: &str) -> Option<InstallPhase> {
    if line.contains("Resolution step") {
        Some(InstallPhase::Resolving)
    } else if line.contains("Fetch step") {
        Some(InstallPhase::Fetching)
    } else if line.contains("Link step") {
        Some(InstallPhase::Linking)
    } else {
        None
    }
}

/// Installer failure.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`InstallError::Manifest`] | `INSTALL_MANIFEST` | No |
/// | [`InstallError::PackageName`] | `INSTALL_PACKAGE_NAME` | No |
/// | [`InstallError::Fs`] | `INSTALL_FS` | Yes |
#[derive(Debug, Error)]
pub enum InstallError {
    /// The package manifest could not be parsed.
    #[error("invalid manifest at '{path}': {message}")]
    Manifest { path: String, message: String },

    /// A dependency name would resolve outside `node_modules`.
    #[error("invalid package name '{0}'")]
    PackageName(String),

    /// Filesystem failure while installing.
    #[error(transparent)]
    Fs(#[from] FsError),
}

impl ErrorCode for InstallError {
    fn code(&self) -> &'static str {
        match self {
            Self::Manifest { .. } => "INSTALL_MANIFEST",
            Self::PackageName(_) => "INSTALL_PACKAGE_NAME",
            Self::Fs(_) => "INSTALL_FS",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fs(_))
    }
}

/// Installs the dependencies declared under `cwd`.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    /// Runs the install, writing progress lines to `on_output`.
    async fn install(
        &self,
        fs: &dyn FileSystem,
        cwd: &str,
        on_output: OutputSink<'_>,
    ) -> Result<(), InstallError>;
}

/// Installer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInstaller;

#[async_trait]
impl DependencyInstaller for NoopInstaller {
    async fn install(
        &self,
        _fs: &dyn FileSystem,
        _cwd: &str,
        _on_output: OutputSink<'_>,
    ) -> Result<(), InstallError> {
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Offline installer that links the manifest's dependencies as stub
/// packages under `node_modules` and records them in `yarn.lock`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLinker;

impl ManifestLinker {
    async fn read_manifest(fs: &dyn FileSystem, path: &str) -> Result<Manifest, InstallError> {
        let text = match fs.read_to_string(path).await {
            Ok(text) => text,
            Err(FsError::NotFound(_)) => return Ok(Manifest::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| InstallError::Manifest {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DependencyInstaller for ManifestLinker {
    async fn install(
        &self,
        fs: &dyn FileSystem,
        cwd: &str,
        on_output: OutputSink<'_>,
    ) -> Result<(), InstallError> {
        on_output("➤ YN0000: ┌ Resolution step");
        let manifest = Self::read_manifest(fs, &paths::join(cwd, "package.json")).await?;
        if let Some(name) = manifest.dependencies.keys().find(|n| !is_package_name(n)) {
            return Err(InstallError::PackageName(name.clone()));
        }
        on_output("➤ YN0000: └ Completed");

        on_output("➤ YN0000: ┌ Fetch step");
        let mut lock = String::new();
        for (name, range) in &manifest.dependencies {
            lock.push_str(&format!("\"{name}@{range}\":\n  version: \"{range}\"\n\n"));
        }
        on_output("➤ YN0000: └ Completed");

        on_output("➤ YN0000: ┌ Link step");
        let modules = paths::join(cwd, "node_modules");
        fs.mkdirp(&modules).await?;
        for (name, range) in &manifest.dependencies {
            let dir = paths::join(&modules, name);
            fs.mkdirp(&dir).await?;
            let stub = serde_json::json!({ "name": name, "version": range });
            fs.write(&paths::join(&dir, "package.json"), &stub.to_string())
                .await?;
        }
        fs.write(&paths::join(cwd, "yarn.lock"), &lock).await?;
        on_output("➤ YN0000: └ Completed");

        debug!(count = manifest.dependencies.len(), "dependencies linked");
        Ok(())
    }
}

/// `name` or `@scope/name`, with plain components only.
fn is_package_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('/').collect();
    let plain = |p: &&str| !p.is_empty() && *p != "." && *p != ".." && !p.contains('\\');
    match parts.as_slice() {
        [single] => plain(single) && !single.starts_with('@'),
        [scope, package] => scope.starts_with('@') && plain(scope) && plain(package),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use parking_lot::Mutex;
    use weft_types::assert_error_codes;

    #[test]
    fn classifies_each_step() {
        assert_eq!(
            classify_progress("Resolution step"),
            Some(InstallPhase::Resolving)
        );
        assert_eq!(classify_progress("x Fetch step y"), Some(InstallPhase::Fetching));
        assert_eq!(classify_progress("Link step"), Some(InstallPhase::Linking));
        assert_eq!(classify_progress("fetch step"), None);
    }

    #[test]
    fn progress_wire_shape() {
        let value = serde_json::to_value(Progress::Installing(InstallPhase::Linking)).unwrap();
        assert_eq!(value["type"], "installing");
        assert_eq!(value["phase"], "linking");
        let value = serde_json::to_value(Progress::Bundling).unwrap();
        assert_eq!(value["type"], "bundling");
    }

    #[tokio::test]
    async fn linker_creates_stubs_and_reports_phases() {
        let fs = MemoryFs::new();
        fs.mkdirp("/app").await.unwrap();
        fs.write(
            "/app/package.json",
            r#"{"dependencies":{"left-pad":"1.3.0"}}"#,
        )
        .await
        .unwrap();

        let phases = Mutex::new(Vec::new());
        let sink = |line: &str| {
            if let Some(p) = classify_progress(line) {
                phases.lock().push(p);
            }
        };
        ManifestLinker.install(&fs, "/app", &sink).await.unwrap();

        assert_eq!(
            *phases.lock(),
            vec![
                InstallPhase::Resolving,
                InstallPhase::Fetching,
                InstallPhase::Linking
            ]
        );
        let stub = fs
            .read_to_string("/app/node_modules/left-pad/package.json")
            .await
            .unwrap();
        assert!(stub.contains("1.3.0"));
        assert!(fs
            .read_to_string("/app/yarn.lock")
            .await
            .unwrap()
            .contains("left-pad@1.3.0"));
    }

    #[tokio::test]
    async fn linker_without_manifest_links_nothing() {
        let fs = MemoryFs::new();
        fs.mkdirp("/app").await.unwrap();
        ManifestLinker.install(&fs, "/app", &|_: &str| {}).await.unwrap();
        assert!(fs.read_dir("/app/node_modules").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn linker_rejects_bad_manifest() {
        let fs = MemoryFs::new();
        fs.mkdirp("/app").await.unwrap();
        fs.write("/app/package.json", "{not json").await.unwrap();
        let err = ManifestLinker
            .install(&fs, "/app", &|_: &str| {})
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INSTALL_MANIFEST");
    }

    #[test]
    fn package_names() {
        assert!(is_package_name("left-pad"));
        assert!(is_package_name("@weft/config-default"));
        assert!(!is_package_name(".."));
        assert!(!is_package_name("../../outside"));
        assert!(!is_package_name("@scope/.."));
        assert!(!is_package_name("a/b"));
        assert!(!is_package_name(""));
    }

    #[tokio::test]
    async fn linker_rejects_escaping_names() {
        let fs = MemoryFs::new();
        fs.mkdirp("/app").await.unwrap();
        fs.write("/app/package.json", r#"{"dependencies":{"../../etc":"1.0.0"}}"#)
            .await
            .unwrap();

        let err = ManifestLinker
            .install(&fs, "/app", &|_: &str| {})
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INSTALL_PACKAGE_NAME");
        assert!(!fs.exists("/etc").await);
        assert!(!fs.exists("/app/yarn.lock").await);
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                InstallError::Manifest {
                    path: "/a".into(),
                    message: "x".into(),
                },
                InstallError::PackageName("..".into()),
                InstallError::Fs(FsError::NotFound("/a".into())),
            ],
            "INSTALL_",
        );
    }
}
