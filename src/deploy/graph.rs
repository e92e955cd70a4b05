//! Dependency graph over executable nodes and its evaluation order

use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use tracing::debug;

use super::BlueprintDeployContext;
use crate::discovery::DependencyDiscovererRegistry;
use crate::error::{BlueprintError, Result};
use crate::node::{NodeId, NodeTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Edges point from a node to the nodes it depends on
pub struct DependencyGraph {
    graph: DiGraphMap<NodeId, ()>,
}

impl DependencyGraph {
    /// Discover the immediate dependencies of every executable node
    pub fn build(
        tree: &NodeTree,
        discoverers: &DependencyDiscovererRegistry,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Self> {
        let mut graph = DiGraphMap::new();
        let executables = tree.executables();
        for id in &executables {
            graph.add_node(*id);
        }
        for id in executables {
            for dependency in discoverers.discover(tree, id, ctx)? {
                graph.add_edge(id, dependency, ());
            }
        }

        debug!(
            "Dependency graph has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(Self { graph })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Immediate dependencies in discovery order
    pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }
        self.graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect()
    }

    /// Depth-first post-order: every node comes after all of its dependencies.
    /// A dependency reached while it is still being visited is a cycle.
    pub fn topological_order(&self, tree: &NodeTree) -> Result<Vec<NodeId>> {
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(self.graph.node_count());

        for start in self.graph.nodes() {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::Visiting);
            // each frame owns an iterator over its remaining dependencies
            let mut stack: Vec<(NodeId, std::vec::IntoIter<NodeId>)> =
                vec![(start, self.dependencies(start).into_iter())];

            while let Some((node, pending)) = stack.last_mut() {
                let node = *node;
                let Some(dependency) = pending.next() else {
                    stack.pop();
                    marks.insert(node, Mark::Done);
                    order.push(node);
                    continue;
                };

                match marks.get(&dependency) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => {
                        let begin = stack
                            .iter()
                            .position(|(id, _)| *id == dependency)
                            .unwrap_or(0);
                        let mut cycle: Vec<String> =
                            stack[begin..].iter().map(|(id, _)| tree.path(*id)).collect();
                        cycle.push(tree.path(dependency));
                        return Err(BlueprintError::CircularDependency { cycle });
                    }
                    None => {
                        marks.insert(dependency, Mark::Visiting);
                        stack.push((dependency, self.dependencies(dependency).into_iter()));
                    }
                }
            }
        }

        Ok(order)
    }
}
