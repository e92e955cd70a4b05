use serde_json::Value;

use super::FunctionError;
use crate::node::{NodeId, NodeTree};

/// Converts a materialized parameter into a typed value
pub trait FromParam: Sized {
    /// Type name reported on a mismatch
    const TYPE_NAME: &'static str;

    fn from_param(value: &Value) -> Option<Self>;
}

impl FromParam for String {
    const TYPE_NAME: &'static str = "string";

    /// Numbers and booleans are rendered as text
    fn from_param(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromParam for i64 {
    const TYPE_NAME: &'static str = "long";

    fn from_param(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromParam for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_param(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromParam for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_param(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromParam for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_param(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_i64() || number.is_u64() => "long",
        Value::Number(_) => "double",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// Read-only view of a function node handed to its executor. Parameters are
/// materialized on access, so results of evaluated dependencies are visible.
pub struct FunctionCall<'a> {
    tree: &'a NodeTree,
    node: NodeId,
    kind: &'a str,
    params: &'a [NodeId],
}

impl<'a> FunctionCall<'a> {
    /// `None` when `node` is not a function node
    pub fn new(tree: &'a NodeTree, node: NodeId) -> Option<Self> {
        let function = tree.get(node).as_function()?;
        Some(Self {
            tree,
            node,
            kind: &function.kind,
            params: &function.params,
        })
    }

    pub fn tree(&self) -> &'a NodeTree {
        self.tree
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> &'a str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn path(&self) -> String {
        self.tree.path(self.node)
    }

    pub fn param_node(&self, position: usize) -> Result<NodeId, FunctionError> {
        self.params
            .get(position)
            .copied()
            .ok_or(FunctionError::OutOfRange {
                position,
                len: self.params.len(),
            })
    }

    /// Materialized value of a positional parameter
    pub fn value(&self, position: usize) -> Result<Value, FunctionError> {
        self.param_node(position)
            .map(|node| self.tree.materialize(node))
    }

    /// All parameters, materialized in order
    pub fn values(&self) -> Vec<Value> {
        self.params
            .iter()
            .map(|node| self.tree.materialize(*node))
            .collect()
    }

    /// A parameter that must be present and non-null
    pub fn required<T: FromParam>(&self, position: usize) -> Result<T, FunctionError> {
        self.optional(position)?
            .ok_or(FunctionError::MissingParameter { position })
    }

    /// A parameter that may be absent or null. A present value of the wrong
    /// type is still an error.
    pub fn optional<T: FromParam>(&self, position: usize) -> Result<Option<T>, FunctionError> {
        if position >= self.params.len() {
            return Ok(None);
        }
        let value = self.value(position)?;
        if value.is_null() {
            return Ok(None);
        }
        T::from_param(&value)
            .map(Some)
            .ok_or_else(|| FunctionError::TypeMismatch {
                position,
                expected: T::TYPE_NAME.to_string(),
                actual: json_type_name(&value).to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, ScalarValue, BODY_NAME};

    fn call_tree(params: Vec<ScalarValue>) -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new("index.yaml");
        let root = tree.root();
        let body = tree
            .add_child(root, BODY_NAME.to_string(), NodeKind::Map(Default::default()))
            .unwrap();
        let function = tree
            .add_child(body, "f".to_string(), NodeKind::function("test"))
            .unwrap();
        for (i, param) in params.into_iter().enumerate() {
            tree.add_child(function, i.to_string(), NodeKind::Value(param))
                .unwrap();
        }
        (tree, function)
    }

    #[test]
    fn test_required_reads_typed_values() {
        let (tree, node) = call_tree(vec![
            ScalarValue::String("a".to_string()),
            ScalarValue::Long(7),
            ScalarValue::Boolean(true),
        ]);
        let call = FunctionCall::new(&tree, node).unwrap();
        assert_eq!(call.len(), 3);
        assert_eq!(call.required::<String>(0).unwrap(), "a");
        assert_eq!(call.required::<i64>(1).unwrap(), 7);
        assert_eq!(call.required::<f64>(1).unwrap(), 7.0);
        assert!(call.required::<bool>(2).unwrap());
    }

    #[test]
    fn test_type_mismatch_names_expected_type() {
        let (tree, node) = call_tree(vec![ScalarValue::String("seven".to_string())]);
        let call = FunctionCall::new(&tree, node).unwrap();
        let err = call.required::<i64>(0).unwrap_err();
        assert_eq!(
            err,
            FunctionError::TypeMismatch {
                position: 0,
                expected: "long".to_string(),
                actual: "string".to_string(),
            }
        );
        assert!(err.to_string().contains("long"));
    }

    #[test]
    fn test_parameters_convert_to_requested_type() {
        let (tree, node) = call_tree(vec![
            ScalarValue::Long(42),
            ScalarValue::String(" 42 ".to_string()),
            ScalarValue::String("2.5".to_string()),
            ScalarValue::String("false".to_string()),
            ScalarValue::Boolean(true),
            ScalarValue::Double(1.5),
        ]);
        let call = FunctionCall::new(&tree, node).unwrap();
        assert_eq!(call.required::<String>(0).unwrap(), "42");
        assert_eq!(call.required::<i64>(1).unwrap(), 42);
        assert_eq!(call.required::<f64>(2).unwrap(), 2.5);
        assert!(!call.required::<bool>(3).unwrap());
        assert_eq!(call.required::<String>(4).unwrap(), "true");
        assert_eq!(call.required::<String>(5).unwrap(), "1.5");
        // a fractional number is not a long
        assert!(matches!(
            call.required::<i64>(5).unwrap_err(),
            FunctionError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_null_is_missing() {
        let (tree, node) = call_tree(vec![ScalarValue::Null]);
        let call = FunctionCall::new(&tree, node).unwrap();
        assert_eq!(
            call.required::<String>(0).unwrap_err(),
            FunctionError::MissingParameter { position: 0 }
        );
        assert_eq!(call.optional::<String>(0).unwrap(), None);
        assert_eq!(
            call.required::<String>(3).unwrap_err(),
            FunctionError::MissingParameter { position: 3 }
        );
    }

    #[test]
    fn test_positional_access_out_of_range() {
        let (tree, node) = call_tree(vec![ScalarValue::Long(1)]);
        let call = FunctionCall::new(&tree, node).unwrap();
        assert_eq!(
            call.value(1).unwrap_err(),
            FunctionError::OutOfRange { position: 1, len: 1 }
        );
    }

    #[test]
    fn test_new_rejects_non_function_nodes() {
        let tree = NodeTree::new("index.yaml");
        assert!(FunctionCall::new(&tree, tree.root()).is_none());
    }
}
