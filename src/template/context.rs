use serde::Serialize;
use serde_json::{json, Value};

/// Bindings visible to every template of one blueprint, nested ones included
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateContext {
    #[serde(rename = "Constants")]
    pub constants: Value,
    #[serde(rename = "Variables")]
    pub variables: Value,
    #[serde(rename = "Parameters")]
    pub parameters: Value,
    #[serde(rename = "System")]
    pub system: Value,
    #[serde(rename = "I18n")]
    pub i18n: Value,
}

impl TemplateContext {
    pub fn new(system: Value) -> Self {
        Self {
            constants: json!({}),
            variables: json!({}),
            parameters: json!({}),
            system,
            i18n: json!({}),
        }
    }

    /// System values supplied by the engine for one deployment
    pub fn system_values(blueprint_id: &str, tenant_id: &str) -> Value {
        json!({
            "blueprintId": blueprint_id,
            "tenantId": tenant_id,
            "engineVersion": env!("CARGO_PKG_VERSION"),
        })
    }

    /// Context for a nested template: same bindings, own parameters
    pub fn with_parameters(&self, parameters: Value) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }
}
