//! Central registry for resource managers

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::{
    ExistingResourceManager, ResourceManager, ResourceMatcher, ResourceService, ResourceSpec,
    ServiceResourceManager,
};
use crate::deploy::BlueprintDeployContext;
use crate::error::{BlueprintError, Result};
use crate::node::{NodeId, NodeStatus, NodeTree};
use crate::types::BindResource;

pub struct ResourceManagerRegistry {
    managers: HashMap<String, Box<dyn ResourceManager>>,
}

impl ResourceManagerRegistry {
    pub fn new() -> Self {
        Self {
            managers: HashMap::new(),
        }
    }

    /// Registry holding only the `existing` manager
    pub fn with_core_managers() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ExistingResourceManager));
        registry
    }

    /// Core managers plus one lookup-or-create manager per kind over `service`
    pub fn with_service(service: Arc<dyn ResourceService>, kinds: &[&str]) -> Self {
        let mut registry = Self::with_core_managers();
        for kind in kinds {
            registry.register(Box::new(ServiceResourceManager::new(
                *kind,
                Arc::clone(&service),
            )));
        }
        registry
    }

    pub fn register(&mut self, manager: Box<dyn ResourceManager>) {
        self.managers.insert(manager.kind().to_string(), manager);
    }

    pub fn get_manager(&self, kind: &str) -> Option<&dyn ResourceManager> {
        self.managers.get(kind).map(|m| m.as_ref())
    }

    pub fn list_managers(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.managers.keys().map(|s| s.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Deploy one resource node, recording its binds and exposing the first
    /// bound id as its result
    pub fn deploy(
        &self,
        tree: &mut NodeTree,
        node: NodeId,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<BindResource>> {
        let path = tree.path(node);
        let (kind, props) = match tree.get(node).as_resource() {
            Some(resource) => (
                resource.kind.clone(),
                resource
                    .props
                    .map(|props| tree.materialize(props))
                    .unwrap_or_else(|| Value::Object(Map::new())),
            ),
            None => {
                return Err(BlueprintError::parsing(
                    path,
                    format!("{} node is not a resource", tree.get(node).node_type()),
                ))
            }
        };
        let manager = self
            .get_manager(&kind)
            .ok_or_else(|| BlueprintError::ResourceManagerNotFound { kind: kind.clone() })?;

        tree.set_status(node, NodeStatus::Pending);
        let spec = ResourceSpec {
            kind: &kind,
            path: path.clone(),
            props,
        };
        let binds: Vec<BindResource> = match manager.deploy(&spec, ctx) {
            Ok(binds) => binds.into_iter().map(|bind| bind.owned_by(&kind)).collect(),
            Err(source) => {
                tree.set_status(node, NodeStatus::NotReady);
                return Err(BlueprintError::ResourceDeployment { path, source });
            }
        };

        debug!("Resource {} at {} bound {} resource(s)", kind, path, binds.len());
        tree.set_result(
            node,
            binds.first().map(|bind| Value::String(bind.id.clone())),
        )?;
        tree.set_bindings(node, binds.clone());
        tree.set_status(node, NodeStatus::Finished);
        Ok(binds)
    }

    /// Delete `bind` through the manager that bound it, if `matcher` selects it
    pub fn delete_resource(&self, bind: &BindResource, matcher: &ResourceMatcher) -> Result<bool> {
        if !matcher.matches(bind) {
            return Ok(false);
        }
        let kind = bind.manager_kind();
        let manager = self
            .get_manager(kind)
            .ok_or_else(|| BlueprintError::ResourceManagerNotFound {
                kind: kind.to_string(),
            })?;
        manager
            .delete_resource(bind, matcher)
            .map_err(|source| BlueprintError::ResourceDeletion {
                key: bind.key(),
                source,
            })
    }
}

impl Default for ResourceManagerRegistry {
    fn default() -> Self {
        Self::with_core_managers()
    }
}
