use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Link between a deployed platform resource and the blueprint that bound it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindResource {
    pub resource_type: String,
    pub id: String,
    /// Whether the blueprint owns the resource's lifecycle
    pub managed: bool,
    /// Kind of the manager that bound the resource; deletes are routed to it.
    /// Falls back to `resource_type` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
}

impl BindResource {
    pub fn managed(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            managed: true,
            manager: None,
        }
    }

    pub fn unmanaged(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            managed: false,
            manager: None,
        }
    }

    pub fn owned_by(mut self, manager: impl Into<String>) -> Self {
        self.manager = Some(manager.into());
        self
    }

    /// Kind of the manager responsible for deleting the resource
    pub fn manager_kind(&self) -> &str {
        self.manager.as_deref().unwrap_or(&self.resource_type)
    }

    /// Dedup and lookup key, `resourceType::id`
    pub fn key(&self) -> String {
        format!("{}::{}", self.resource_type, self.id)
    }
}

/// Merge bindings by key, keeping first-seen order. A key bound as managed
/// anywhere stays managed.
pub fn dedup_bindings(bindings: impl IntoIterator<Item = BindResource>) -> Vec<BindResource> {
    let mut merged: Vec<BindResource> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for binding in bindings {
        match positions.get(&binding.key()) {
            Some(&index) => merged[index].managed |= binding.managed,
            None => {
                positions.insert(binding.key(), merged.len());
                merged.push(binding);
            }
        }
    }
    merged
}

/// Persisted state of one deployed blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintRecord {
    pub blueprint_id: String,
    pub tenant_id: String,
    /// Parsed chart, kept for audit and replay
    pub chart: Value,
    pub bindings: Vec<BindResource>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let bind = BindResource::managed("device", "42");
        assert_eq!(bind.key(), "device::42");
    }

    #[test]
    fn test_dedup_keeps_order_and_ors_managed() {
        let merged = dedup_bindings(vec![
            BindResource::unmanaged("product", "p1"),
            BindResource::managed("device", "d1"),
            BindResource::managed("product", "p1"),
            BindResource::managed("device", "d1"),
        ]);
        assert_eq!(
            merged,
            vec![
                BindResource::managed("product", "p1"),
                BindResource::managed("device", "d1"),
            ]
        );
    }

    #[test]
    fn test_manager_kind_falls_back_to_type() {
        let bind = BindResource::managed("credential", "c1");
        assert_eq!(bind.manager_kind(), "credential");
        let bind = bind.owned_by("gateway");
        assert_eq!(bind.manager_kind(), "gateway");
        assert_eq!(bind.key(), "credential::c1");

        let json = serde_json::to_value(&bind).unwrap();
        assert_eq!(json["manager"], "gateway");
        let stored: BindResource = serde_json::from_value(serde_json::json!({
            "resourceType": "device",
            "id": "d1",
            "managed": true
        }))
        .unwrap();
        assert_eq!(stored.manager, None);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(BindResource::unmanaged("entity", "e1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"resourceType": "entity", "id": "e1", "managed": false})
        );
    }
}
