//! Test utilities for autodep.
//!
//! - `TestRuntime`: an in-memory filesystem implementing `Runtime`
//!
//! Every write bumps a logical clock that is reported as the file's modified
//! time, so stat-based change tokens see each write as a change even when the
//! size stays the same.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

#[derive(Debug, Clone)]
enum Node {
    File { content: Vec<u8>, modified: u64 },
    Dir,
}

/// In-memory runtime for tests.
///
/// ```rust,ignore
/// use autodep::test_utils::TestRuntime;
/// use autodep::Runtime;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runtime = TestRuntime::new("/project");
/// runtime.add_file("/project/app/index.js", "import 'lodash';");
///
/// let names = runtime.read_dir(Path::new("/project/app")).await.unwrap();
/// assert_eq!(names, vec!["index.js"]);
/// # }
/// ```
#[derive(Debug)]
pub struct TestRuntime {
    cwd: PathBuf,
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    clock: AtomicU64,
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            _ => {}
        }
    }
    out
}

impl TestRuntime {
    /// Create an empty in-memory filesystem rooted at `/` with the given cwd.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        let cwd = normalize(&cwd.into());
        let runtime = Self {
            cwd: cwd.clone(),
            nodes: RwLock::new(BTreeMap::new()),
            clock: AtomicU64::new(1),
        };
        runtime.add_dir(&cwd);
        runtime
    }

    /// Create a directory and all of its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        let mut nodes = self.nodes.write();
        for ancestor in path.ancestors() {
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    /// Create or replace a file, creating parent directories as needed.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let path = normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        let modified = self.clock.fetch_add(1, Ordering::SeqCst);
        self.nodes.write().insert(
            path,
            Node::File {
                content: content.as_ref().to_vec(),
                modified,
            },
        );
    }

    /// Remove a file or a directory together with everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.nodes.write().retain(|key, _| !key.starts_with(&path));
    }

    /// Read a file as a string, panicking if it is missing.
    pub fn contents(&self, path: impl AsRef<Path>) -> String {
        let path = normalize(path.as_ref());
        match self.nodes.read().get(&path) {
            Some(Node::File { content, .. }) => String::from_utf8_lossy(content).into_owned(),
            _ => panic!("no file at {}", path.display()),
        }
    }

    fn children(&self, dir: &Path) -> Vec<String> {
        self.nodes
            .read()
            .keys()
            .filter(|key| key.parent() == Some(dir))
            .filter_map(|key| key.file_name()?.to_str().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Runtime for TestRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        match self.nodes.read().get(&normalize(path)) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            Some(Node::Dir) => Err(RuntimeError::Io(format!(
                "Failed to read {}: is a directory",
                path.display()
            ))),
            None => Err(RuntimeError::FileNotFound(path.to_path_buf())),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let normalized = normalize(path);
        let parent_exists = normalized
            .parent()
            .map(|parent| matches!(self.nodes.read().get(parent), Some(Node::Dir)))
            .unwrap_or(false);
        if !parent_exists {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        let modified = self.clock.fetch_add(1, Ordering::SeqCst);
        self.nodes.write().insert(
            normalized,
            Node::File {
                content: content.to_vec(),
                modified,
            },
        );
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        match self.nodes.read().get(&normalize(path)) {
            Some(Node::File { content, modified }) => Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
                modified: Some(*modified),
            }),
            Some(Node::Dir) => Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
                modified: None,
            }),
            None => Err(RuntimeError::FileNotFound(path.to_path_buf())),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.read().contains_key(&normalize(path))
    }

    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        let normalized = normalize(path);
        if !recursive {
            let parent_exists = normalized
                .parent()
                .map(|parent| self.exists(parent))
                .unwrap_or(true);
            if !parent_exists {
                return Err(RuntimeError::FileNotFound(path.to_path_buf()));
            }
        }
        self.add_dir(normalized);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> RuntimeResult<()> {
        let normalized = normalize(path);
        let mut nodes = self.nodes.write();
        match nodes.get(&normalized) {
            Some(Node::File { .. }) => {
                nodes.remove(&normalized);
                Ok(())
            }
            Some(Node::Dir) => Err(RuntimeError::Io(format!(
                "Failed to remove {}: is a directory",
                path.display()
            ))),
            None => Err(RuntimeError::FileNotFound(path.to_path_buf())),
        }
    }

    async fn remove_dir(&self, path: &Path) -> RuntimeResult<()> {
        let normalized = normalize(path);
        if !matches!(self.nodes.read().get(&normalized), Some(Node::Dir)) {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        if !self.children(&normalized).is_empty() {
            return Err(RuntimeError::Io(format!(
                "Failed to remove directory {}: not empty",
                path.display()
            )));
        }
        self.nodes.write().remove(&normalized);
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>> {
        let normalized = normalize(path);
        if !matches!(self.nodes.read().get(&normalized), Some(Node::Dir)) {
            return Err(RuntimeError::FileNotFound(path.to_path_buf()));
        }
        Ok(self.children(&normalized))
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
