use serde_json::{Number, Value};

/// Payload of a value node
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Null,
}

impl ScalarValue {
    /// Build a scalar from plain markup. Returns `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ScalarValue::String(s.clone())),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => ScalarValue::Long(i),
                None => ScalarValue::Double(n.as_f64().unwrap_or_default()),
            }),
            Value::Bool(b) => Some(ScalarValue::Boolean(*b)),
            Value::Null => Some(ScalarValue::Null),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert a scalar to an explicitly requested `@type`
    pub fn convert(value: &Value, type_name: &str) -> Result<Self, String> {
        match (type_name, value) {
            ("string", Value::String(s)) => Ok(ScalarValue::String(s.clone())),
            ("string", Value::Number(n)) => Ok(ScalarValue::String(n.to_string())),
            ("string", Value::Bool(b)) => Ok(ScalarValue::String(b.to_string())),
            ("long", Value::Number(n)) => n
                .as_i64()
                .map(ScalarValue::Long)
                .ok_or_else(|| format!("{n} is not a long")),
            ("long", Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(ScalarValue::Long)
                .map_err(|e| format!("'{s}' is not a long: {e}")),
            ("double", Value::Number(n)) => n
                .as_f64()
                .map(ScalarValue::Double)
                .ok_or_else(|| format!("{n} is not a double")),
            ("double", Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(ScalarValue::Double)
                .map_err(|e| format!("'{s}' is not a double: {e}")),
            ("boolean", Value::Bool(b)) => Ok(ScalarValue::Boolean(*b)),
            ("boolean", Value::String(s)) => match s.trim() {
                "true" => Ok(ScalarValue::Boolean(true)),
                "false" => Ok(ScalarValue::Boolean(false)),
                other => Err(format!("'{other}' is not a boolean")),
            },
            (_, Value::Null) => Ok(ScalarValue::Null),
            ("string" | "long" | "double" | "boolean", other) => {
                Err(format!("cannot convert {other} to {type_name}"))
            }
            (unknown, _) => Err(format!("unknown value type '{unknown}'")),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::String(s) => Value::String(s.clone()),
            ScalarValue::Long(i) => Value::Number((*i).into()),
            ScalarValue::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
            ScalarValue::Boolean(b) => Value::Bool(*b),
            ScalarValue::Null => Value::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::String(_) => "string",
            ScalarValue::Long(_) => "long",
            ScalarValue::Double(_) => "double",
            ScalarValue::Boolean(_) => "boolean",
            ScalarValue::Null => "null",
        }
    }
}
