//! Resource managers backed by a business service

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ManagerError, ResourceManager, ResourceSpec};
use crate::deploy::BlueprintDeployContext;
use crate::types::BindResource;

/// Kind of the manager that binds pre-existing resources
pub const EXISTING_RESOURCE_KIND: &str = "existing";

/// A platform resource as the business service stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResource {
    pub resource_type: String,
    pub id: String,
    /// Stable key the resource is looked up by on redeploy
    pub lookup_key: String,
    pub props: Value,
}

/// The seam to the platform's business services
pub trait ResourceService: Send + Sync {
    fn find(
        &self,
        resource_type: &str,
        lookup_key: &str,
    ) -> Result<Option<ServiceResource>, ManagerError>;

    fn create(
        &self,
        resource_type: &str,
        lookup_key: &str,
        props: &Value,
    ) -> Result<ServiceResource, ManagerError>;

    fn update(
        &self,
        resource_type: &str,
        id: &str,
        props: &Value,
    ) -> Result<ServiceResource, ManagerError>;

    /// `false` when no such resource exists
    fn delete(&self, resource_type: &str, id: &str) -> Result<bool, ManagerError>;
}

/// Lookup-or-create manager for one resource kind. The lookup key is
/// `props.key` when given, otherwise `blueprintId/path`.
pub struct ServiceResourceManager {
    kind: String,
    service: Arc<dyn ResourceService>,
}

impl ServiceResourceManager {
    pub fn new(kind: impl Into<String>, service: Arc<dyn ResourceService>) -> Self {
        Self {
            kind: kind.into(),
            service,
        }
    }

    pub fn lookup_key(spec: &ResourceSpec<'_>, ctx: &BlueprintDeployContext<'_>) -> String {
        spec.prop_str("key")
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", ctx.blueprint_id, spec.path))
    }
}

impl ResourceManager for ServiceResourceManager {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn deploy(
        &self,
        spec: &ResourceSpec<'_>,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<BindResource>, ManagerError> {
        let lookup_key = Self::lookup_key(spec, ctx);

        let resource = match self.service.find(&self.kind, &lookup_key)? {
            Some(existing) if existing.props == spec.props => {
                debug!("{} {} unchanged", self.kind, existing.id);
                existing
            }
            Some(existing) => {
                debug!("Updating {} {}", self.kind, existing.id);
                self.service.update(&self.kind, &existing.id, &spec.props)?
            }
            None => {
                debug!("Creating {} for {}", self.kind, lookup_key);
                self.service.create(&self.kind, &lookup_key, &spec.props)?
            }
        };

        Ok(vec![BindResource::managed(&self.kind, resource.id)])
    }

    fn delete(&self, bind: &BindResource) -> Result<bool, ManagerError> {
        self.service.delete(&bind.resource_type, &bind.id)
    }
}

/// Binds a resource the blueprint does not own, named by `props.resourceType`
/// and `props.id`. Such binds are never deleted.
pub struct ExistingResourceManager;

impl ResourceManager for ExistingResourceManager {
    fn kind(&self) -> &str {
        EXISTING_RESOURCE_KIND
    }

    fn deploy(
        &self,
        spec: &ResourceSpec<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<BindResource>, ManagerError> {
        let resource_type = spec.required_prop("resourceType")?;
        let id = spec.required_prop("id")?;
        Ok(vec![BindResource::unmanaged(resource_type, id)])
    }

    fn delete(&self, _bind: &BindResource) -> Result<bool, ManagerError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::InMemoryResourceService;
    use crate::template::TemplateContext;
    use serde_json::json;

    fn deploy_with(
        manager: &dyn ResourceManager,
        path: &str,
        props: Value,
    ) -> Result<Vec<BindResource>, ManagerError> {
        let variables = Value::Null;
        let template_context = TemplateContext::default();
        let ctx = BlueprintDeployContext {
            blueprint_id: "bp-1",
            tenant_id: "default",
            variables: &variables,
            template_context: &template_context,
        };
        let kind = manager.kind().to_string();
        let spec = ResourceSpec {
            kind: &kind,
            path: path.to_string(),
            props,
        };
        manager.deploy(&spec, &ctx)
    }

    #[test]
    fn test_redeploy_binds_same_id() {
        let service = Arc::new(InMemoryResourceService::new());
        let manager = ServiceResourceManager::new("device", service.clone());

        let first = deploy_with(&manager, "$.device", json!({"name": "a"})).unwrap();
        let second = deploy_with(&manager, "$.device", json!({"name": "a"})).unwrap();
        assert_eq!(first, second);
        assert!(first[0].managed);
        assert_eq!(service.len(), 1);
    }

    #[test]
    fn test_changed_props_update_in_place() {
        let service = Arc::new(InMemoryResourceService::new());
        let manager = ServiceResourceManager::new("device", service.clone());

        let first = deploy_with(&manager, "$.device", json!({"name": "a"})).unwrap();
        let second = deploy_with(&manager, "$.device", json!({"name": "b"})).unwrap();
        assert_eq!(first, second);
        let stored = service.get("device", &first[0].id).unwrap();
        assert_eq!(stored.props, json!({"name": "b"}));
    }

    #[test]
    fn test_explicit_key_wins_over_path() {
        let service = Arc::new(InMemoryResourceService::new());
        let manager = ServiceResourceManager::new("codec", service.clone());

        let first = deploy_with(&manager, "$.a", json!({"key": "shared"})).unwrap();
        let second = deploy_with(&manager, "$.b", json!({"key": "shared"})).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_binds_unmanaged() {
        let binds = deploy_with(
            &ExistingResourceManager,
            "$.gateway",
            json!({"resourceType": "gateway", "id": "g-9"}),
        )
        .unwrap();
        assert_eq!(binds, vec![BindResource::unmanaged("gateway", "g-9")]);

        let err = deploy_with(&ExistingResourceManager, "$.gateway", json!({"id": "g-9"}))
            .unwrap_err();
        assert!(err.to_string().contains("resourceType"));
    }
}
