//! Dependency discovery: per-node-type strategies reporting immediate dependency edges

pub mod discoverers;

pub use discoverers::*;

use std::collections::{HashMap, HashSet};

use crate::deploy::BlueprintDeployContext;
use crate::error::{BlueprintError, Result};
use crate::node::{NodeId, NodeTree, NodeType};

/// Reports the nodes that must be evaluated before a node can be read
pub trait DependencyDiscoverer: Send + Sync {
    /// Never fails for leaf nodes; returns an empty list instead
    fn discover(
        &self,
        tree: &NodeTree,
        node: NodeId,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<NodeId>>;
}

pub struct DependencyDiscovererRegistry {
    discoverers: HashMap<NodeType, Box<dyn DependencyDiscoverer>>,
}

impl DependencyDiscovererRegistry {
    pub fn new() -> Self {
        Self {
            discoverers: HashMap::new(),
        }
    }

    /// Registry covering every node type
    pub fn with_default_discoverers() -> Self {
        let mut registry = Self::new();
        registry.register(NodeType::Value, Box::new(LeafDiscoverer));
        registry.register(NodeType::Array, Box::new(ContainerDiscoverer));
        registry.register(NodeType::Map, Box::new(ContainerDiscoverer));
        registry.register(NodeType::Template, Box::new(ContainerDiscoverer));
        registry.register(NodeType::Function, Box::new(FunctionDiscoverer));
        registry.register(NodeType::Resource, Box::new(ResourceDiscoverer));
        registry
    }

    pub fn register(&mut self, node_type: NodeType, discoverer: Box<dyn DependencyDiscoverer>) {
        self.discoverers.insert(node_type, discoverer);
    }

    /// Immediate dependencies of `node`, deduplicated in discovery order
    pub fn discover(
        &self,
        tree: &NodeTree,
        node: NodeId,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Vec<NodeId>> {
        let node_type = tree.get(node).node_type();
        let discoverer =
            self.discoverers
                .get(&node_type)
                .ok_or_else(|| BlueprintError::DiscovererNotFound {
                    node_type: node_type.to_string(),
                })?;

        let mut seen = HashSet::new();
        Ok(discoverer
            .discover(tree, node, ctx)?
            .into_iter()
            .filter(|dependency| seen.insert(*dependency))
            .collect())
    }
}

impl Default for DependencyDiscovererRegistry {
    fn default() -> Self {
        Self::with_default_discoverers()
    }
}
