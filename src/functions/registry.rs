//! Central registry for function executors

use std::collections::HashMap;

use tracing::debug;

use super::{
    Base64Function, ConcatFunction, DefaultFunction, DigestAlgorithm, DigestFunction,
    FunctionCall, FunctionError, FunctionExecutor, RefFunction,
};
use crate::deploy::BlueprintDeployContext;
use crate::error::{BlueprintError, Result};
use crate::node::{NodeId, NodeStatus, NodeTree};

pub struct FunctionExecutorRegistry {
    executors: HashMap<String, Box<dyn FunctionExecutor>>,
}

impl FunctionExecutorRegistry {
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// Create a registry with every built-in function pre-registered
    pub fn with_builtin_functions() -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(RefFunction));
        registry.register(Box::new(ConcatFunction));
        registry.register(Box::new(DefaultFunction));
        registry.register(Box::new(DigestFunction::new(DigestAlgorithm::Md5)));
        registry.register(Box::new(DigestFunction::new(DigestAlgorithm::Sha1)));
        registry.register(Box::new(DigestFunction::new(DigestAlgorithm::Sha256)));
        registry.register(Box::new(Base64Function));

        registry
    }

    pub fn register(&mut self, executor: Box<dyn FunctionExecutor>) {
        self.executors.insert(executor.kind().to_string(), executor);
    }

    pub fn get_executor(&self, kind: &str) -> Option<&dyn FunctionExecutor> {
        self.executors.get(kind).map(|e| e.as_ref())
    }

    pub fn list_functions(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.executors.keys().map(|s| s.as_str()).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Evaluate one function node and attach its result. On failure the node
    /// is left without a result.
    pub fn execute(
        &self,
        tree: &mut NodeTree,
        node: NodeId,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<()> {
        let kind = match tree.get(node).as_function() {
            Some(function) => function.kind.clone(),
            None => {
                return Err(BlueprintError::FunctionExecution {
                    path: tree.path(node),
                    source: FunctionError::Failed {
                        reason: format!("{} node is not a function", tree.get(node).node_type()),
                    },
                })
            }
        };
        if tree.status(node) == NodeStatus::Finished {
            debug!("Function {} at {} already evaluated", kind, tree.path(node));
            return Ok(());
        }
        let executor =
            self.get_executor(&kind)
                .ok_or_else(|| BlueprintError::FunctionExecutorNotFound {
                    kind: kind.clone(),
                    path: tree.path(node),
                })?;

        tree.set_status(node, NodeStatus::Pending);
        let outcome = match FunctionCall::new(tree, node) {
            Some(call) => executor.execute(&call, ctx),
            None => Ok(None),
        };

        match outcome {
            Ok(value) => {
                debug!("Function {} at {} evaluated", kind, tree.path(node));
                tree.set_result(node, value)?;
                tree.set_status(node, NodeStatus::Finished);
                Ok(())
            }
            Err(source) => {
                tree.set_result(node, None)?;
                tree.set_status(node, NodeStatus::NotReady);
                Err(BlueprintError::FunctionExecution {
                    path: tree.path(node),
                    source,
                })
            }
        }
    }
}

impl Default for FunctionExecutorRegistry {
    fn default() -> Self {
        Self::with_builtin_functions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, ScalarValue, BODY_NAME};
    use crate::template::TemplateContext;
    use serde_json::{json, Value};

    fn function_tree(kind: &str, params: Vec<ScalarValue>) -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new("index.yaml");
        let body = tree
            .add_child(tree.root(), BODY_NAME, NodeKind::Map(Default::default()))
            .unwrap();
        let function = tree.add_child(body, "f", NodeKind::function(kind)).unwrap();
        for (i, param) in params.into_iter().enumerate() {
            tree.add_child(function, i.to_string(), NodeKind::Value(param))
                .unwrap();
        }
        (tree, function)
    }

    fn run(kind: &str, params: Vec<ScalarValue>) -> (NodeTree, NodeId, Result<()>) {
        let (mut tree, node) = function_tree(kind, params);
        let variables = Value::Null;
        let template_context = TemplateContext::default();
        let ctx = BlueprintDeployContext {
            blueprint_id: "bp",
            tenant_id: "default",
            variables: &variables,
            template_context: &template_context,
        };
        let registry = FunctionExecutorRegistry::with_builtin_functions();
        let outcome = registry.execute(&mut tree, node, &ctx);
        (tree, node, outcome)
    }

    #[test]
    fn test_execute_attaches_result() {
        let (tree, node, outcome) = run(
            "concat",
            vec![
                ScalarValue::String("a".to_string()),
                ScalarValue::Long(1),
            ],
        );
        outcome.unwrap();
        assert_eq!(tree.status(node), NodeStatus::Finished);
        assert_eq!(tree.materialize(node), json!("a1"));
    }

    #[test]
    fn test_unknown_kind() {
        let (tree, node, outcome) = run("nope", vec![]);
        let err = outcome.unwrap_err();
        assert_eq!(err.code(), "BLUEPRINT_FUNCTION_EXECUTOR_NOT_FOUND");
        assert!(err.to_string().contains("nope"));
        assert_eq!(tree.status(node), NodeStatus::NotReady);
    }

    #[test]
    fn test_failure_leaves_no_result() {
        let (tree, node, outcome) = run("md5", vec![ScalarValue::Null]);
        let err = outcome.unwrap_err();
        assert_eq!(err.code(), "BLUEPRINT_FUNCTION_EXECUTION_FAILED");
        assert!(err.to_string().contains("$.f"));
        assert_eq!(tree.materialize(node), Value::Null);
        assert_eq!(tree.status(node), NodeStatus::NotReady);
    }

    struct CountingFunction {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl FunctionExecutor for CountingFunction {
        fn kind(&self) -> &'static str {
            "count"
        }

        fn execute(
            &self,
            _call: &FunctionCall<'_>,
            _ctx: &BlueprintDeployContext<'_>,
        ) -> std::result::Result<Option<Value>, FunctionError> {
            let calls = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            Ok(Some(json!(calls)))
        }
    }

    #[test]
    fn test_finished_function_is_not_rerun() {
        let (mut tree, node) = function_tree("count", vec![]);
        let variables = Value::Null;
        let template_context = TemplateContext::default();
        let ctx = BlueprintDeployContext {
            blueprint_id: "bp",
            tenant_id: "default",
            variables: &variables,
            template_context: &template_context,
        };
        let mut registry = FunctionExecutorRegistry::new();
        registry.register(Box::new(CountingFunction {
            calls: Default::default(),
        }));

        registry.execute(&mut tree, node, &ctx).unwrap();
        registry.execute(&mut tree, node, &ctx).unwrap();
        assert_eq!(tree.status(node), NodeStatus::Finished);
        assert_eq!(tree.materialize(node), json!(1));
    }

    #[test]
    fn test_builtins_are_listed() {
        let registry = FunctionExecutorRegistry::with_builtin_functions();
        assert_eq!(
            registry.list_functions(),
            vec!["base64", "concat", "default", "md5", "ref", "sha1", "sha256"]
        );
    }
}
