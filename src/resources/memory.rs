use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use super::{ManagerError, ResourceService, ServiceResource};

#[derive(Default)]
struct ServiceState {
    /// Keyed by (resource type, id)
    resources: BTreeMap<(String, String), ServiceResource>,
    failing_types: HashSet<String>,
}

/// Thread-safe in-memory business service, used by tests and the command line
#[derive(Default)]
pub struct InMemoryResourceService {
    state: RwLock<ServiceState>,
}

fn poisoned() -> ManagerError {
    ManagerError::Service {
        reason: "resource store lock poisoned".to_string(),
    }
}

impl InMemoryResourceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every create, update and delete of `resource_type` fail
    pub fn fail_on(&self, resource_type: impl Into<String>) {
        if let Ok(mut state) = self.state.write() {
            state.failing_types.insert(resource_type.into());
        }
    }

    pub fn get(&self, resource_type: &str, id: &str) -> Option<ServiceResource> {
        let state = self.state.read().ok()?;
        state
            .resources
            .get(&(resource_type.to_string(), id.to_string()))
            .cloned()
    }

    pub fn contains(&self, resource_type: &str, id: &str) -> bool {
        self.get(resource_type, id).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.resources.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_failing(state: &ServiceState, resource_type: &str) -> Result<(), ManagerError> {
        if state.failing_types.contains(resource_type) {
            return Err(ManagerError::Service {
                reason: format!("{resource_type} service unavailable"),
            });
        }
        Ok(())
    }
}

impl ResourceService for InMemoryResourceService {
    fn find(
        &self,
        resource_type: &str,
        lookup_key: &str,
    ) -> Result<Option<ServiceResource>, ManagerError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        Ok(state
            .resources
            .values()
            .find(|r| r.resource_type == resource_type && r.lookup_key == lookup_key)
            .cloned())
    }

    fn create(
        &self,
        resource_type: &str,
        lookup_key: &str,
        props: &Value,
    ) -> Result<ServiceResource, ManagerError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Self::check_failing(&state, resource_type)?;

        let resource = ServiceResource {
            resource_type: resource_type.to_string(),
            id: Uuid::new_v4().to_string(),
            lookup_key: lookup_key.to_string(),
            props: props.clone(),
        };
        state.resources.insert(
            (resource.resource_type.clone(), resource.id.clone()),
            resource.clone(),
        );
        Ok(resource)
    }

    fn update(
        &self,
        resource_type: &str,
        id: &str,
        props: &Value,
    ) -> Result<ServiceResource, ManagerError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Self::check_failing(&state, resource_type)?;

        let resource = state
            .resources
            .get_mut(&(resource_type.to_string(), id.to_string()))
            .ok_or_else(|| ManagerError::Service {
                reason: format!("{resource_type} {id} does not exist"),
            })?;
        resource.props = props.clone();
        Ok(resource.clone())
    }

    fn delete(&self, resource_type: &str, id: &str) -> Result<bool, ManagerError> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        Self::check_failing(&state, resource_type)?;
        Ok(state
            .resources
            .remove(&(resource_type.to_string(), id.to_string()))
            .is_some())
    }
}
