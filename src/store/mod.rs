//! Persistence of deployed blueprint records

pub mod file;
pub mod memory;

pub use file::FileBlueprintStore;
pub use memory::InMemoryBlueprintStore;

use thiserror::Error;

use crate::types::BlueprintRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid blueprint id '{id}'")]
    InvalidId { id: String },

    #[error("Blueprint store lock poisoned")]
    Poisoned,
}

/// The storage collaborator: one record per blueprint id
pub trait BlueprintStore: Send + Sync {
    fn load(&self, blueprint_id: &str) -> Result<Option<BlueprintRecord>, StoreError>;

    /// Insert or replace the record for `record.blueprint_id`
    fn save(&self, record: &BlueprintRecord) -> Result<(), StoreError>;

    /// `false` when nothing was stored under `blueprint_id`
    fn delete(&self, blueprint_id: &str) -> Result<bool, StoreError>;

    /// Stored blueprint ids in ascending order
    fn list(&self) -> Result<Vec<String>, StoreError>;
}
