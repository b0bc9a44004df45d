//! Platform runtime abstraction for autodep.
//!
//! This module defines the `Runtime` trait that abstracts the filesystem
//! operations used by the analyzer, the package resolver and the append
//! engine. Every read, listing and write in the core goes through it, which
//! keeps the pipeline testable against an in-memory tree.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File content is not valid UTF-8
    #[error("File is not valid UTF-8: {path}: {reason}")]
    InvalidUtf8 { path: PathBuf, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

impl RuntimeError {
    /// Whether this error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::FileNotFound(_))
    }
}

/// File metadata
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Whether this is a file
    pub is_file: bool,
    /// Last modified timestamp (milliseconds since epoch)
    pub modified: Option<u64>,
}

/// Platform runtime trait
///
/// Implementations provide file I/O for one platform. The core only ever
/// holds an `Arc<dyn Runtime>`, so the trait is object safe and `Send + Sync`.
///
/// # Example
///
/// ```rust,ignore
/// use autodep::runtime::{Runtime, RuntimeResult};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct MyRuntime;
///
/// #[async_trait]
/// impl Runtime for MyRuntime {
///     async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
///         std::fs::read(path).map_err(|e| RuntimeError::Io(e.to_string()))
///     }
///
///     // ... implement other methods
/// }
/// ```
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file from the filesystem
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Write a file to the filesystem, replacing any existing content
    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()>;

    /// Get file metadata
    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory
    async fn create_dir(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Remove a file
    async fn remove_file(&self, path: &Path) -> RuntimeResult<()>;

    /// Remove an empty directory
    async fn remove_dir(&self, path: &Path) -> RuntimeResult<()>;

    /// Read a directory.
    ///
    /// Returns entry names sorted by name so that listings are stable across
    /// platforms.
    async fn read_dir(&self, path: &Path) -> RuntimeResult<Vec<String>>;

    /// Get the current working directory
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;

    /// Read a file and decode it as UTF-8.
    async fn read_to_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|e| RuntimeError::InvalidUtf8 {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Copy a file byte-for-byte.
    async fn copy_file(&self, from: &Path, to: &Path) -> RuntimeResult<()> {
        let bytes = self.read_file(from).await?;
        self.write_file(to, &bytes).await
    }

    /// Whether `path` exists and is a regular file.
    async fn is_file(&self, path: &Path) -> bool {
        self.metadata(path).await.map(|m| m.is_file).unwrap_or(false)
    }

    /// Whether `path` exists and is a directory.
    async fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path).await.map(|m| m.is_dir).unwrap_or(false)
    }
}
