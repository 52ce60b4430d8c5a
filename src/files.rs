use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// Filesystem primitive for the output tree. All paths passed in are
/// relative to the output root; parent directories are created on demand.
#[derive(Clone)]
pub struct FileManager {
    root: PathBuf,
}

impl FileManager {
    pub fn new(root: &Path) -> Result<Self, ExportError> {
        fs::create_dir_all(root).map_err(|e| ExportError::filesystem(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, rel: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    pub fn write(&self, rel: &str, content: &[u8]) -> Result<PathBuf, ExportError> {
        let path = self.full_path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExportError::filesystem(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| ExportError::filesystem(&path, e))?;
        Ok(path)
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String, ExportError> {
        let path = self.full_path(rel);
        fs::read_to_string(&path).map_err(|e| ExportError::filesystem(&path, e))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.full_path(rel).exists()
    }
}
