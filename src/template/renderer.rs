//! Renders blueprint markup into structured data

use handlebars::Handlebars;
use serde_json::Value;
use tracing::debug;

use super::context::TemplateContext;
use super::helpers::{default_helper, json_helper, quote_helper};
use super::loader::ResourceLoader;
use super::RenderError;

/// Handlebars-backed renderer. Output text is decoded as YAML.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Output is YAML, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_helper("default", Box::new(default_helper));
        handlebars.register_helper("quote", Box::new(quote_helper));
        handlebars.register_helper("json", Box::new(json_helper));

        Self { handlebars }
    }

    /// Render the template at `relative_path`. Returns `Ok(None)` when the
    /// loader has no such resource.
    pub fn render(
        &self,
        loader: &dyn ResourceLoader,
        relative_path: &str,
        context: &TemplateContext,
    ) -> Result<Option<Value>, RenderError> {
        let bytes = loader
            .load_resource(relative_path)
            .map_err(|e| RenderError::Load {
                path: relative_path.to_string(),
                reason: e.to_string(),
            })?;
        let Some(bytes) = bytes else {
            debug!("Template {} not present", relative_path);
            return Ok(None);
        };

        let text = String::from_utf8(bytes).map_err(|e| RenderError::TemplateParsing {
            path: relative_path.to_string(),
            reason: format!("template is not valid UTF-8: {e}"),
        })?;
        self.render_str(relative_path, &text, context).map(Some)
    }

    pub fn render_str(
        &self,
        name: &str,
        text: &str,
        context: &TemplateContext,
    ) -> Result<Value, RenderError> {
        let rendered = self
            .handlebars
            .render_template(text, context)
            .map_err(|e| RenderError::TemplateParsing {
                path: name.to_string(),
                reason: e.to_string(),
            })?;

        if rendered.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_yaml::from_str::<Value>(&rendered).map_err(|e| RenderError::TemplateParsing {
            path: name.to_string(),
            reason: format!("rendered output is not valid YAML: {e}"),
        })
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::InMemoryResourceLoader;
    use serde_json::json;

    fn context() -> TemplateContext {
        let mut context = TemplateContext::new(json!({"tenantId": "acme"}));
        context.constants = json!({"vendor": "Acme <Labs>", "options": ["a", "b"]});
        context.variables = json!({"name": "gw-1", "port": null});
        context
    }

    #[test]
    fn test_render_substitutes_namespaces() {
        let renderer = TemplateRenderer::new();
        let text = "vendor: {{quote Constants.vendor}}\nname: {{Variables.name}}\n\
                    port: {{default Variables.port 1883}}\ntenant: {{System.tenantId}}\n\
                    options: {{json Constants.options}}\n";
        let value = renderer.render_str("index.yaml", text, &context()).unwrap();
        assert_eq!(
            value,
            json!({
                "vendor": "Acme <Labs>",
                "name": "gw-1",
                "port": 1883,
                "tenant": "acme",
                "options": ["a", "b"],
            })
        );
    }

    #[test]
    fn test_missing_resource_is_none() {
        let renderer = TemplateRenderer::new();
        let loader = InMemoryResourceLoader::new();
        let rendered = renderer.render(&loader, "constants.yaml", &context()).unwrap();
        assert!(rendered.is_none());
    }

    #[test]
    fn test_malformed_template_fails() {
        let renderer = TemplateRenderer::new();
        let err = renderer
            .render_str("index.yaml", "name: {{#if Variables.name}}", &context())
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateParsing { .. }));

        let err = renderer
            .render_str("index.yaml", "a: [1, 2", &context())
            .unwrap_err();
        assert!(err.to_string().contains("YAML"));
    }
}
