use serde_json::Value;

use crate::template::TemplateContext;

/// Read-mostly state shared by discovery, function execution and resource
/// deployment for one blueprint deployment. The node graph itself is passed
/// alongside, since results are attached between evaluations.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintDeployContext<'a> {
    pub blueprint_id: &'a str,
    pub tenant_id: &'a str,
    /// Caller-supplied variables document
    pub variables: &'a Value,
    pub template_context: &'a TemplateContext,
}
