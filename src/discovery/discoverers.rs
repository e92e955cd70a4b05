//! Built-in dependency discoverers, one per node type

use super::DependencyDiscoverer;
use crate::deploy::BlueprintDeployContext;
use crate::error::{BlueprintError, Result};
use crate::functions::REF_FUNCTION;
use crate::node::{resolve_reference, NodeId, NodeKind, NodeTree, ScalarValue};

/// Value nodes never depend on anything
pub struct LeafDiscoverer;

impl DependencyDiscoverer for LeafDiscoverer {
    fn discover(
        &self,
        _tree: &NodeTree,
        _node: NodeId,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<NodeId>> {
        Ok(Vec::new())
    }
}

/// Arrays, maps and templates depend on the executable nodes they contain
pub struct ContainerDiscoverer;

impl DependencyDiscoverer for ContainerDiscoverer {
    fn discover(
        &self,
        tree: &NodeTree,
        node: NodeId,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<NodeId>> {
        Ok(tree.executable_frontier(node))
    }
}

/// A function depends on the executable nodes inside its parameters. A `ref`
/// function also depends on whatever its literal path resolves to.
pub struct FunctionDiscoverer;

impl DependencyDiscoverer for FunctionDiscoverer {
    fn discover(
        &self,
        tree: &NodeTree,
        node: NodeId,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<NodeId>> {
        let Some(function) = tree.get(node).as_function() else {
            return Ok(Vec::new());
        };

        let mut dependencies = Vec::new();
        for param in &function.params {
            if tree.get(*param).is_executable() {
                dependencies.push(*param);
            } else {
                dependencies.extend(tree.executable_frontier(*param));
            }
        }

        if function.kind == REF_FUNCTION {
            if let Some(first) = function.params.first() {
                let reference = match tree.kind(*first) {
                    NodeKind::Value(ScalarValue::String(reference)) => reference,
                    _ => {
                        return Err(BlueprintError::ReferenceNotFound {
                            path: tree.path(node),
                            reference: tree.materialize(*first).to_string(),
                            reason: "reference path must be a literal string".to_string(),
                        })
                    }
                };
                dependencies.extend(reference_dependencies(tree, node, reference)?);
            }
        }
        Ok(dependencies)
    }
}

/// A resource depends on the executable nodes inside its props and on every
/// node named by `@dependsOn`
pub struct ResourceDiscoverer;

impl DependencyDiscoverer for ResourceDiscoverer {
    fn discover(
        &self,
        tree: &NodeTree,
        node: NodeId,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<NodeId>> {
        let Some(resource) = tree.get(node).as_resource() else {
            return Ok(Vec::new());
        };

        let mut dependencies = resource
            .props
            .map(|props| {
                if tree.get(props).is_executable() {
                    vec![props]
                } else {
                    tree.executable_frontier(props)
                }
            })
            .unwrap_or_default();
        for reference in &resource.depends_on {
            dependencies.extend(reference_dependencies(tree, node, reference)?);
        }
        Ok(dependencies)
    }
}

/// Nodes that must be evaluated before `reference`, seen from `anchor`, can be read
pub fn reference_dependencies(
    tree: &NodeTree,
    anchor: NodeId,
    reference: &str,
) -> Result<Vec<NodeId>> {
    let resolved = resolve_reference(tree, anchor, reference).map_err(|reason| {
        BlueprintError::ReferenceNotFound {
            path: tree.path(anchor),
            reference: reference.to_string(),
            reason,
        }
    })?;

    if tree.get(resolved.target).is_executable() {
        Ok(vec![resolved.target])
    } else {
        Ok(tree.executable_frontier(resolved.target))
    }
}
