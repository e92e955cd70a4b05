use serde_json::Value;
use thiserror::Error;

use super::ResourceMatcher;
use crate::deploy::BlueprintDeployContext;
use crate::types::BindResource;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Invalid resource properties: {reason}")]
    InvalidProps { reason: String },

    #[error("Resource service failed: {reason}")]
    Service { reason: String },
}

/// Everything a manager needs to materialize one resource node
#[derive(Debug, Clone)]
pub struct ResourceSpec<'a> {
    pub kind: &'a str,
    /// Location of the resource node, e.g. `$.devices[0]`
    pub path: String,
    /// Materialized props, always an object
    pub props: Value,
}

impl ResourceSpec<'_> {
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    pub fn required_prop(&self, name: &str) -> Result<&str, ManagerError> {
        self.prop_str(name)
            .ok_or_else(|| ManagerError::InvalidProps {
                reason: format!("{} requires a string '{}' property", self.kind, name),
            })
    }
}

/// Materializes and deletes the platform resources of one resource kind
pub trait ResourceManager: Send + Sync {
    /// Resource kind as written after `@res`; managed binds carry it as their type
    fn kind(&self) -> &str;

    /// Lookup-or-create. Deploying the same logical resource twice must bind
    /// the same ids.
    fn deploy(
        &self,
        spec: &ResourceSpec<'_>,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<BindResource>, ManagerError>;

    /// Delete the resource behind `bind`; `false` when it was already gone
    fn delete(&self, bind: &BindResource) -> Result<bool, ManagerError>;

    fn delete_resource(
        &self,
        bind: &BindResource,
        matcher: &ResourceMatcher,
    ) -> Result<bool, ManagerError> {
        if !matcher.matches(bind) {
            return Ok(false);
        }
        self.delete(bind)
    }
}
