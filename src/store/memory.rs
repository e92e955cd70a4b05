use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{BlueprintStore, StoreError};
use crate::types::BlueprintRecord;

#[derive(Default)]
pub struct InMemoryBlueprintStore {
    records: RwLock<BTreeMap<String, BlueprintRecord>>,
}

impl InMemoryBlueprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlueprintStore for InMemoryBlueprintStore {
    fn load(&self, blueprint_id: &str) -> Result<Option<BlueprintRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(blueprint_id).cloned())
    }

    fn save(&self, record: &BlueprintRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.insert(record.blueprint_id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, blueprint_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        Ok(records.remove(blueprint_id).is_some())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.keys().cloned().collect())
    }
}
