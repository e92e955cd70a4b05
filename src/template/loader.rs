//! Resource loaders resolving relative template paths

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Source of template bytes for one blueprint package (vendor/model/version)
pub trait ResourceLoader: Send + Sync {
    /// `Ok(None)` when the resource does not exist
    fn load_resource(&self, relative_path: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Loads resources from a directory on disk
#[derive(Debug, Clone)]
pub struct FileSystemResourceLoader {
    root: PathBuf,
}

impl FileSystemResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, relative_path: &str) -> io::Result<PathBuf> {
        let path = Path::new(relative_path);
        let escapes = path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource path '{relative_path}' escapes the blueprint directory"),
            ));
        }
        Ok(self.root.join(path))
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn load_resource(&self, relative_path: &str) -> io::Result<Option<Vec<u8>>> {
        let full_path = self.resolve_path(relative_path)?;
        debug!("Loading blueprint resource {}", full_path.display());
        match std::fs::read(&full_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Loader over an in-memory file map
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceLoader {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, relative_path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(relative_path, content);
        self
    }

    pub fn insert(&mut self, relative_path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(relative_path.into(), content.into());
    }
}

impl ResourceLoader for InMemoryResourceLoader {
    fn load_resource(&self, relative_path: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(relative_path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filesystem_loader_reads_and_reports_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/sensor.yaml"), "a: 1").unwrap();

        let loader = FileSystemResourceLoader::new(dir.path());
        assert_eq!(
            loader.load_resource("models/sensor.yaml").unwrap(),
            Some(b"a: 1".to_vec())
        );
        assert_eq!(loader.load_resource("missing.yaml").unwrap(), None);
    }

    #[test]
    fn test_filesystem_loader_rejects_escapes() {
        let dir = TempDir::new().unwrap();
        let loader = FileSystemResourceLoader::new(dir.path());
        let err = loader.load_resource("../secret.yaml").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(loader.load_resource("/etc/passwd").is_err());
    }
}
