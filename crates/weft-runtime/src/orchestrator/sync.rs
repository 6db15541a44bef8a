//! Mirrors the caller's asset list into the working root.
//!
//! After a sync the working root holds exactly the assets, the package
//! manifest and the installer's outputs (lock file, dependency
//! directories). Everything else under the root is deleted; a directory
//! survives when it contains any kept path.

use crate::fs::{FileSystem, FsError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, trace};
use weft_types::ErrorCode;

/// Paths under the working root that always survive a sync.
pub const ALWAYS_KEEP: &[&str] = &[
    "/app/.yarn",
    "/app/node_modules",
    "/app/yarn.lock",
    MANIFEST_PATH,
];

/// Working-root path of the package manifest.
pub const MANIFEST_PATH: &str = "/app/package.json";

/// One caller-supplied source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Caller-facing path (`/index.js`).
    pub name: String,
    /// File content.
    pub content: String,
    /// Build entry point.
    #[serde(default)]
    pub is_entry: bool,
}

impl Asset {
    /// Creates a non-entry asset.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            is_entry: false,
        }
    }

    /// Creates an entry asset.
    #[must_use]
    pub fn entry(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_entry: true,
            ..Self::new(name, content)
        }
    }

    /// Working-root path.
    #[must_use]
    pub fn path(&self) -> String {
        paths::from_asset_path(&self.name)
    }
}

/// What one sync pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Paths written.
    pub written: Vec<String>,
    /// Paths deleted.
    pub removed: Vec<String>,
}

impl SyncReport {
    /// Returns `true` if nothing was written or deleted.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.written.is_empty() && self.removed.is_empty()
    }
}

/// Sync failure.
///
/// | Variant | Code | Recoverable |
/// |---------|------|-------------|
/// | [`SyncError::InvalidAssetPath`] | `SYNC_INVALID_ASSET_PATH` | No |
/// | [`SyncError::Fs`] | `SYNC_FS` | Yes |
#[derive(Debug, Error)]
pub enum SyncError {
    /// Asset name does not resolve to a file under the working root.
    #[error("invalid asset path: '{0}'")]
    InvalidAssetPath(String),

    /// Filesystem failure.
    #[error(transparent)]
    Fs(#[from] FsError),
}

impl ErrorCode for SyncError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidAssetPath(_) => "SYNC_INVALID_ASSET_PATH",
            Self::Fs(_) => "SYNC_FS",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fs(_))
    }
}

/// Synchronizes `assets` into the working root.
///
/// `manifest` is written to `package.json` when the asset list has none;
/// it is only rewritten when its trimmed content differs. `extra_keep`
/// names further paths that must survive pruning (the cache directory).
///
/// # Errors
///
/// Returns [`SyncError::InvalidAssetPath`] before touching the filesystem
/// if an asset resolves to the working root itself.
pub async fn sync_assets(
    fs: &dyn FileSystem,
    assets: &[Asset],
    manifest: &str,
    extra_keep: &[String],
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    let mut keep: BTreeSet<String> = ALWAYS_KEEP.iter().map(|p| (*p).to_string()).collect();
    keep.extend(extra_keep.iter().map(|p| paths::normalize(p)));
    for asset in assets {
        let path = asset.path();
        if path == paths::APP_DIR {
            return Err(SyncError::InvalidAssetPath(asset.name.clone()));
        }
        keep.insert(path);
    }

    fs.mkdirp(paths::APP_DIR).await?;

    let mut manifest_content = manifest;
    for asset in assets {
        let path = asset.path();
        if path == MANIFEST_PATH {
            manifest_content = &asset.content;
            continue;
        }
        if fs.read_to_string(&path).await.ok().as_deref() != Some(asset.content.as_str()) {
            write_file(fs, &path, &asset.content, &mut report).await?;
        }
    }

    let current = fs.read_to_string(MANIFEST_PATH).await.unwrap_or_default();
    if current.trim() != manifest_content.trim() {
        write_file(fs, MANIFEST_PATH, manifest_content, &mut report).await?;
    }

    prune(fs, paths::APP_DIR, &keep, &mut report).await?;

    debug!(
        written = report.written.len(),
        removed = report.removed.len(),
        "assets synced"
    );
    Ok(report)
}

async fn write_file(
    fs: &dyn FileSystem,
    path: &str,
    content: &str,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    // A file standing where a directory is needed (or the reverse) is
    // replaced.
    let mut ancestor = paths::parent(path);
    while let Some(dir) = ancestor {
        if fs.exists(&dir).await && !fs.is_dir(&dir).await {
            fs.remove_all(&dir).await?;
            report.removed.push(dir);
            break;
        }
        ancestor = paths::parent(&dir);
    }
    if fs.is_dir(path).await {
        fs.remove_all(path).await?;
        report.removed.push(path.to_string());
    }

    if let Some(dir) = paths::parent(path) {
        fs.mkdirp(&dir).await?;
    }
    fs.write(path, content).await?;
    trace!(path, "asset written");
    report.written.push(path.to_string());
    Ok(())
}

async fn prune(
    fs: &dyn FileSystem,
    root: &str,
    keep: &BTreeSet<String>,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    let mut stack = vec![root.to_string()];
    while let Some(dir) = stack.pop() {
        for name in fs.read_dir(&dir).await? {
            let path = paths::join(&dir, &name);
            if keep.contains(&path) {
                continue;
            }
            if keep.iter().any(|k| paths::is_ancestor_or_self(&path, k)) {
                if fs.is_dir(&path).await {
                    stack.push(path);
                }
                continue;
            }
            fs.remove_all(&path).await?;
            trace!(path = %path, "stale path removed");
            report.removed.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use proptest::prelude::*;
    use weft_types::assert_error_codes;

    const MANIFEST: &str = "{\"dependencies\":{}}\n";

    #[tokio::test]
    async fn writes_assets_and_manifest() {
        let fs = MemoryFs::new();
        let report = sync_assets(
            &fs,
            &[Asset::entry("/index.js", "a"), Asset::new("/src/b.js", "b")],
            MANIFEST,
            &[],
        )
        .await
        .unwrap();

        assert_eq!(fs.read_to_string("/app/index.js").await.unwrap(), "a");
        assert_eq!(fs.read_to_string("/app/src/b.js").await.unwrap(), "b");
        assert_eq!(fs.read_to_string(MANIFEST_PATH).await.unwrap(), MANIFEST);
        assert_eq!(report.written.len(), 3);
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn manifest_asset_takes_precedence() {
        let fs = MemoryFs::new();
        sync_assets(
            &fs,
            &[Asset::new("/package.json", "{\"name\":\"mine\"}")],
            MANIFEST,
            &[],
        )
        .await
        .unwrap();
        assert_eq!(
            fs.read_to_string(MANIFEST_PATH).await.unwrap(),
            "{\"name\":\"mine\"}"
        );
    }

    #[tokio::test]
    async fn manifest_whitespace_change_is_not_rewritten() {
        let fs = MemoryFs::new();
        sync_assets(&fs, &[], MANIFEST, &[]).await.unwrap();
        let report = sync_assets(&fs, &[], "  {\"dependencies\":{}}", &[])
            .await
            .unwrap();
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn prunes_stale_paths_but_keeps_installer_outputs() {
        let fs = MemoryFs::new();
        sync_assets(
            &fs,
            &[Asset::new("/a.js", "a"), Asset::new("/old/x.js", "x")],
            MANIFEST,
            &[],
        )
        .await
        .unwrap();
        fs.mkdirp("/app/node_modules/dep").await.unwrap();
        fs.write("/app/node_modules/dep/index.js", "").await.unwrap();
        fs.write("/app/yarn.lock", "").await.unwrap();
        fs.mkdirp("/app/dist").await.unwrap();
        fs.write("/app/dist/index.js", "").await.unwrap();
        fs.mkdirp("/app/.weft-cache").await.unwrap();

        let report = sync_assets(
            &fs,
            &[Asset::new("/a.js", "a")],
            MANIFEST,
            &["/app/.weft-cache".to_string()],
        )
        .await
        .unwrap();

        assert!(report.written.is_empty());
        assert!(report.removed.contains(&"/app/old".to_string()));
        assert!(report.removed.contains(&"/app/dist".to_string()));
        assert!(fs.exists("/app/node_modules/dep/index.js").await);
        assert!(fs.exists("/app/yarn.lock").await);
        assert!(fs.exists("/app/.weft-cache").await);
        assert!(!fs.exists("/app/old").await);
    }

    #[tokio::test]
    async fn keeps_directories_containing_kept_paths() {
        let fs = MemoryFs::new();
        sync_assets(
            &fs,
            &[Asset::new("/src/a.js", "a"), Asset::new("/src/b.js", "b")],
            MANIFEST,
            &[],
        )
        .await
        .unwrap();
        sync_assets(&fs, &[Asset::new("/src/a.js", "a")], MANIFEST, &[])
            .await
            .unwrap();

        assert!(fs.exists("/app/src/a.js").await);
        assert!(!fs.exists("/app/src/b.js").await);
    }

    #[tokio::test]
    async fn prefix_names_are_not_ancestors() {
        let fs = MemoryFs::new();
        sync_assets(&fs, &[Asset::new("/srcx/a.js", "a")], MANIFEST, &[])
            .await
            .unwrap();
        sync_assets(&fs, &[Asset::new("/src/a.js", "a")], MANIFEST, &[])
            .await
            .unwrap();
        assert!(!fs.exists("/app/srcx").await);
    }

    #[tokio::test]
    async fn file_replaced_by_directory() {
        let fs = MemoryFs::new();
        sync_assets(&fs, &[Asset::new("/lib", "file")], MANIFEST, &[])
            .await
            .unwrap();
        sync_assets(&fs, &[Asset::new("/lib/a.js", "a")], MANIFEST, &[])
            .await
            .unwrap();
        assert_eq!(fs.read_to_string("/app/lib/a.js").await.unwrap(), "a");
    }

    #[tokio::test]
    async fn rejects_asset_naming_the_root() {
        let fs = MemoryFs::new();
        let err = sync_assets(&fs, &[Asset::new("/", "x")], MANIFEST, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidAssetPath(_)));
        assert!(!fs.exists("/app").await);
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                SyncError::InvalidAssetPath("/".into()),
                SyncError::Fs(FsError::NotFound("/a".into())),
            ],
            "SYNC_",
        );
    }

    const NAMES: &[&str] = &[
        "/index.js",
        "/src/a.js",
        "/src/deep/b.js",
        "/lib/c.js",
        "/style.css",
    ];

    fn asset_set() -> impl Strategy<Value = Vec<Asset>> {
        prop::collection::vec(
            (prop::sample::select(NAMES), "[a-z\n]{0,16}"),
            0..NAMES.len(),
        )
        .prop_map(|pairs| {
            let mut seen = BTreeSet::new();
            pairs
                .into_iter()
                .filter(|(name, _)| seen.insert(*name))
                .map(|(name, content)| Asset::new(name, content))
                .collect()
        })
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(f)
    }

    proptest! {
        /// Every synced asset reads back unchanged.
        #[test]
        fn sync_then_read_back(assets in asset_set()) {
            block_on(async {
                let fs = MemoryFs::new();
                sync_assets(&fs, &assets, MANIFEST, &[]).await.unwrap();
                for asset in &assets {
                    assert_eq!(fs.read_to_string(&asset.path()).await.unwrap(), asset.content);
                }
            });
        }

        /// A second identical sync is a no-op.
        #[test]
        fn sync_is_idempotent(assets in asset_set()) {
            block_on(async {
                let fs = MemoryFs::new();
                sync_assets(&fs, &assets, MANIFEST, &[]).await.unwrap();
                let again = sync_assets(&fs, &assets, MANIFEST, &[]).await.unwrap();
                assert!(again.is_noop(), "second sync changed {again:?}");
            });
        }

        /// Only the latest asset set (plus kept installer outputs) remains.
        #[test]
        fn latest_set_wins(first in asset_set(), second in asset_set()) {
            block_on(async {
                let fs = MemoryFs::new();
                sync_assets(&fs, &first, MANIFEST, &[]).await.unwrap();
                sync_assets(&fs, &second, MANIFEST, &[]).await.unwrap();

                let expected: BTreeSet<String> = second
                    .iter()
                    .map(Asset::path)
                    .chain(std::iter::once(MANIFEST_PATH.to_string()))
                    .collect();
                let actual: BTreeSet<String> = fs
                    .files()
                    .into_iter()
                    .filter(|p| paths::is_ancestor_or_self(paths::APP_DIR, p))
                    .collect();
                assert_eq!(actual, expected);
            });
        }
    }
}
