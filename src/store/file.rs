use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BlueprintStore, StoreError};
use crate::types::BlueprintRecord;

/// Stores each record as `<dir>/<blueprintId>.json`
pub struct FileBlueprintStore {
    dir: PathBuf,
}

impl FileBlueprintStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, blueprint_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !blueprint_id.is_empty()
            && !blueprint_id.starts_with('.')
            && blueprint_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidId {
                id: blueprint_id.to_string(),
            });
        }
        Ok(self.dir.join(format!("{blueprint_id}.json")))
    }
}

impl BlueprintStore for FileBlueprintStore {
    fn load(&self, blueprint_id: &str) -> Result<Option<BlueprintRecord>, StoreError> {
        let path = self.record_path(blueprint_id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, record: &BlueprintRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.blueprint_id)?;
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!("Stored blueprint record at {:?}", path);
        Ok(())
    }

    fn delete(&self, blueprint_id: &str) -> Result<bool, StoreError> {
        let path = self.record_path(blueprint_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
