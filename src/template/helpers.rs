//! Handlebars helpers available to blueprint templates

use handlebars::{
    Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
    RenderErrorReason,
};
use serde_json::Value;

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `{{default Variables.port 8080}}` writes the first parameter unless it is
/// null or an empty string, the second otherwise
pub fn default_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let fallback = h.param(1).map(|p| display(p.value())).unwrap_or_default();
    let chosen = match h.param(0).map(|p| p.value()) {
        None | Some(Value::Null) => fallback,
        Some(Value::String(s)) if s.is_empty() => fallback,
        Some(value) => display(value),
    };
    out.write(&chosen)?;
    Ok(())
}

/// Wrap a value in double quotes, escaping embedded quotes so the output stays valid YAML
pub fn quote_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    if let Some(value) = h.param(0) {
        let text = match value.value() {
            Value::Null => "null".to_string(),
            other => display(other),
        };
        out.write(&Value::String(text).to_string())?;
    }
    Ok(())
}

/// Emit a value as inline JSON, e.g. `options: {{json Constants.options}}`
pub fn json_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _rc: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h.param(0).ok_or_else(|| {
        RenderError::from(RenderErrorReason::Other(
            "json helper requires one parameter".to_string(),
        ))
    })?;
    let encoded = serde_json::to_string(value.value())
        .map_err(|e| RenderError::from(RenderErrorReason::Other(e.to_string())))?;
    out.write(&encoded)?;
    Ok(())
}
