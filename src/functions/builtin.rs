//! Built-in structural functions: `ref`, `concat` and `default`

use serde_json::Value;

use super::{json_type_name, FromParam, FunctionCall, FunctionError, FunctionExecutor};
use crate::deploy::BlueprintDeployContext;
use crate::node::{read_reference, resolve_reference};

pub const REF_FUNCTION: &str = "ref";
pub const CONCAT_FUNCTION: &str = "concat";
pub const DEFAULT_FUNCTION: &str = "default";

/// `ref(path[, default])`: the value of another node, read through function
/// and resource results
pub struct RefFunction;

impl FunctionExecutor for RefFunction {
    fn kind(&self) -> &'static str {
        REF_FUNCTION
    }

    fn execute(
        &self,
        call: &FunctionCall<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError> {
        let reference: String = call.required(0)?;
        let fallback: Option<Value> = call.optional(1)?;

        let resolved = resolve_reference(call.tree(), call.node(), &reference)
            .map_err(|reason| FunctionError::Failed {
                reason: format!("cannot resolve '{reference}': {reason}"),
            })?;
        let value = read_reference(call.tree(), &resolved);
        if value.is_null() {
            return Ok(fallback);
        }
        Ok(Some(value))
    }
}

/// `concat(values…)`: scalars joined as strings, nulls skipped
pub struct ConcatFunction;

impl FunctionExecutor for ConcatFunction {
    fn kind(&self) -> &'static str {
        CONCAT_FUNCTION
    }

    fn execute(
        &self,
        call: &FunctionCall<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError> {
        let mut joined = String::new();
        for (position, value) in call.values().into_iter().enumerate() {
            if value.is_null() {
                continue;
            }
            let text = String::from_param(&value).ok_or_else(|| FunctionError::TypeMismatch {
                position,
                expected: String::TYPE_NAME.to_string(),
                actual: json_type_name(&value).to_string(),
            })?;
            joined.push_str(&text);
        }
        Ok(Some(Value::String(joined)))
    }
}

/// `default(values…)`: the first non-null parameter
pub struct DefaultFunction;

impl FunctionExecutor for DefaultFunction {
    fn kind(&self) -> &'static str {
        DEFAULT_FUNCTION
    }

    fn execute(
        &self,
        call: &FunctionCall<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError> {
        Ok(call.values().into_iter().find(|value| !value.is_null()))
    }
}
