//! Host filesystem mapped under a root directory.

use super::{FileSystem, FsError};
use crate::paths;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Maps virtual paths under a host directory.
///
/// `/app/index.js` on an `OsFs` rooted at `/tmp/work` is
/// `/tmp/work/app/index.js` on disk. `..` components are normalized
/// away before mapping, so no virtual path escapes the root.
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    /// Creates a filesystem rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Host directory backing `/`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &str) -> PathBuf {
        let normalized = paths::normalize(path);
        let mut host = self.root.clone();
        for part in paths::components(&normalized) {
            host.push(part);
        }
        host
    }
}

#[async_trait]
impl FileSystem for OsFs {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.host_path(path))
            .await
            .unwrap_or(false)
    }

    async fn is_dir(&self, path: &str) -> bool {
        tokio::fs::metadata(self.host_path(path))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn read_to_string(&self, path: &str) -> Result<String, FsError> {
        let host = self.host_path(path);
        if self.is_dir(path).await {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        tokio::fs::read_to_string(&host)
            .await
            .map_err(|e| FsError::io(path, e))
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), FsError> {
        let host = self.host_path(path);
        if self.is_dir(path).await {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        tokio::fs::write(&host, contents)
            .await
            .map_err(|e| FsError::io(path, e))
    }

    async fn mkdirp(&self, path: &str) -> Result<(), FsError> {
        tokio::fs::create_dir_all(self.host_path(path))
            .await
            .map_err(|e| FsError::io(path, e))
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let mut entries = tokio::fs::read_dir(self.host_path(path))
            .await
            .map_err(|e| FsError::io(path, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::io(path, e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn remove_all(&self, path: &str) -> Result<(), FsError> {
        let host = self.host_path(path);
        let meta = match tokio::fs::symlink_metadata(&host).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::io(path, e)),
        };
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(&host).await
        } else {
            tokio::fs::remove_file(&host).await
        };
        result.map_err(|e| FsError::io(path, e))
    }
}
