//! File system abstraction
//!
//! Tools and importers go through [`FileSystem`] instead of `std::fs` so they
//! can run against an in-memory tree in tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Write a whole file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

    /// Every file below `root`, recursively, sorted by path.
    fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, FsError>;
}

/// The host file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        std::fs::read(path).map_err(|e| FsError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        std::fs::write(path, contents).map_err(|e| FsError::io(path, e))
    }

    fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, FsError> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir).map_err(|e| FsError::io(&dir, e))? {
                let entry = entry.map_err(|e| FsError::io(&dir, e))?;
                // Symlinks are listed, never followed.
                let file_type = entry.file_type().map_err(|e| FsError::io(&dir, e))?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory file tree. Paths are compared verbatim.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.into(), contents.into());
    }

    pub fn remove(&self, path: &Path) -> Option<Vec<u8>> {
        self.files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path)
    }

    pub fn len(&self) -> usize {
        self.files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        self.insert(path, contents);
        Ok(())
    }

    fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, FsError> {
        Ok(self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .filter(|path| path.starts_with(root))
            .cloned()
            .collect())
    }
}
