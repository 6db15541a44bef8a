//! Working filesystem abstraction.
//!
//! The orchestrator and the build engine share one [`FileSystem`]: the
//! orchestrator mirrors caller assets into it, the engine reads sources
//! and writes bundles. Paths are `/`-separated virtual paths (see
//! [`crate::paths`]).
//!
//! - [`MemoryFs`]: in-memory tree with change notifications
//! - [`OsFs`]: virtual paths mapped under a host directory

mod error;
mod memory;
mod os;

pub use error::FsError;
pub use memory::MemoryFs;
pub use os::OsFs;

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Kind of change observed on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File or directory created.
    Created,
    /// File content replaced.
    Modified,
    /// File or directory removed.
    Removed,
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    /// Affected path.
    pub path: String,
    /// What happened.
    pub kind: ChangeKind,
}

/// Async filesystem used for the working root.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns `true` if `path` exists (file or directory).
    async fn exists(&self, path: &str) -> bool;

    /// Returns `true` if `path` is a directory.
    async fn is_dir(&self, path: &str) -> bool;

    /// Reads a file as UTF-8.
    async fn read_to_string(&self, path: &str) -> Result<String, FsError>;

    /// Writes a file, replacing any previous content. The parent
    /// directory must exist.
    async fn write(&self, path: &str, contents: &str) -> Result<(), FsError>;

    /// Creates `path` and all missing ancestors.
    async fn mkdirp(&self, path: &str) -> Result<(), FsError>;

    /// Lists the entry names directly under `path`, sorted.
    async fn read_dir(&self, path: &str) -> Result<Vec<String>, FsError>;

    /// Removes a file or a directory tree. Missing paths are ignored.
    async fn remove_all(&self, path: &str) -> Result<(), FsError>;

    /// Subscribes to change notifications, if the implementation
    /// supports them.
    fn subscribe(&self) -> Option<broadcast::Receiver<FsChange>> {
        None
    }
}
