//! In-memory filesystem.

use super::{ChangeKind, FileSystem, FsChange, FsError};
use crate::paths;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum Node {
    File(String),
    Dir,
}

/// In-memory filesystem with change notifications.
///
/// Entries are kept in a sorted map keyed by normalized absolute path,
/// so a directory's descendants form one contiguous range.
///
/// # Example
///
/// ```
/// use weft_runtime::fs::{FileSystem, MemoryFs};
///
/// # tokio_test_block_on(async {
/// let fs = MemoryFs::new();
/// fs.mkdirp("/app/src").await.unwrap();
/// fs.write("/app/src/a.js", "export {}").await.unwrap();
/// assert_eq!(fs.read_dir("/app").await.unwrap(), vec!["src"]);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct MemoryFs {
    nodes: RwLock<BTreeMap<String, Node>>,
    changes: broadcast::Sender<FsChange>,
}

impl MemoryFs {
    /// Creates an empty filesystem containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            nodes: RwLock::new(nodes),
            changes,
        }
    }

    /// Returns every file path, sorted.
    #[must_use]
    pub fn files(&self) -> Vec<String> {
        self.nodes
            .read()
            .iter()
            .filter(|(_, n)| matches!(n, Node::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn notify(&self, path: &str, kind: ChangeKind) {
        // No receivers is fine.
        let _ = self.changes.send(FsChange {
            path: path.to_string(),
            kind,
        });
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFs")
            .field("entries", &self.nodes.read().len())
            .finish()
    }
}

fn is_strict_descendant(ancestor: &str, path: &str) -> bool {
    if ancestor == "/" {
        return path != "/";
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

#[async_trait]
impl FileSystem for MemoryFs {
    async fn exists(&self, path: &str) -> bool {
        self.nodes.read().contains_key(&paths::normalize(path))
    }

    async fn is_dir(&self, path: &str) -> bool {
        matches!(
            self.nodes.read().get(&paths::normalize(path)),
            Some(Node::Dir)
        )
    }

    async fn read_to_string(&self, path: &str) -> Result<String, FsError> {
        let path = paths::normalize(path);
        match self.nodes.read().get(&path) {
            Some(Node::File(content)) => Ok(content.clone()),
            Some(Node::Dir) => Err(FsError::IsADirectory(path)),
            None => Err(FsError::NotFound(path)),
        }
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), FsError> {
        let path = paths::normalize(path);
        let parent = paths::parent(&path).ok_or_else(|| FsError::IsADirectory(path.clone()))?;

        let kind = {
            let mut nodes = self.nodes.write();
            match nodes.get(&parent) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => return Err(FsError::NotADirectory(parent)),
                None => return Err(FsError::NotFound(parent)),
            }
            match nodes.insert(path.clone(), Node::File(contents.to_string())) {
                Some(Node::Dir) => {
                    nodes.insert(path.clone(), Node::Dir);
                    return Err(FsError::IsADirectory(path));
                }
                Some(Node::File(_)) => ChangeKind::Modified,
                None => ChangeKind::Created,
            }
        };

        self.notify(&path, kind);
        Ok(())
    }

    async fn mkdirp(&self, path: &str) -> Result<(), FsError> {
        let path = paths::normalize(path);
        let mut created = Vec::new();
        {
            let mut nodes = self.nodes.write();
            let mut current = String::new();
            for part in paths::components(&path) {
                current.push('/');
                current.push_str(part);
                match nodes.get(&current) {
                    Some(Node::Dir) => {}
                    Some(Node::File(_)) => return Err(FsError::NotADirectory(current)),
                    None => {
                        nodes.insert(current.clone(), Node::Dir);
                        created.push(current.clone());
                    }
                }
            }
        }
        for dir in created {
            self.notify(&dir, ChangeKind::Created);
        }
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let path = paths::normalize(path);
        let nodes = self.nodes.read();
        match nodes.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(FsError::NotADirectory(path)),
            None => return Err(FsError::NotFound(path)),
        }

        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        let names = nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter_map(|(p, _)| {
                let rest = &p[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect();
        Ok(names)
    }

    async fn remove_all(&self, path: &str) -> Result<(), FsError> {
        let path = paths::normalize(path);
        let removed: Vec<String> = {
            let mut nodes = self.nodes.write();
            let doomed: Vec<String> = nodes
                .keys()
                .filter(|p| **p == path || is_strict_descendant(&path, p))
                .filter(|p| p.as_str() != "/")
                .cloned()
                .collect();
            for p in &doomed {
                nodes.remove(p);
            }
            doomed
        };
        for p in removed {
            self.notify(&p, ChangeKind::Removed);
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<FsChange>> {
        Some(self.changes.subscribe())
    }
}
