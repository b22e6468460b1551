//! Virtual file system abstraction.
//!
//! The engine core reads assembly bytes and scene descriptors through this
//! trait so the real file layer (or an archive/network layer) stays
//! swappable.

use std::path::{Path, PathBuf};

/// Errors from virtual file system operations.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read '{0}': {1}")]
    ReadFailed(PathBuf, String),

    #[error("failed to write '{0}': {1}")]
    WriteFailed(PathBuf, String),
}

/// Path-based read/write/exists capability.
pub trait Vfs {
    /// Read the full contents of a file.
    fn read(&self, path: &Path) -> Result<Vec<u8>, VfsError>;

    /// Write the full contents of a file, creating it if needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), VfsError>;

    /// Whether a file exists.
    fn exists(&self, path: &Path) -> bool;
}

/// A [`Vfs`] backed by the OS file system, resolving relative paths against
/// a base directory.
pub struct PhysicalFs {
    base_path: PathBuf,
}

impl PhysicalFs {
    /// Create a file system rooted at the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a relative path against the base path.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// The base path this file system resolves relative paths against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Vfs for PhysicalFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>, VfsError> {
        let full = self.resolve(path);
        if !full.exists() {
            return Err(VfsError::NotFound(full));
        }
        std::fs::read(&full).map_err(|e| VfsError::ReadFailed(full, e.to_string()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), VfsError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VfsError::WriteFailed(full.clone(), e.to_string()))?;
        }
        std::fs::write(&full, contents).map_err(|e| VfsError::WriteFailed(full, e.to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }
}
