use serde_json::Value;

use crate::error::{BlueprintError, Result};
use crate::node::NodeTree;
use crate::template::{ResourceLoader, TemplateContext};

/// Ceilings enforced while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_node_count: usize,
    pub max_nested_templates: usize,
    pub max_structure_depth: usize,
}

/// Deferred nested-template bookkeeping. Tasks are pushed in descent order and
/// drained in reverse once the whole tree exists, so the task pushed when a
/// nested template is complete is the first one drained for its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedTask {
    /// Pushed on entering a nested template; decrements the depth when drained
    Close { path: String },
    /// Pushed on leaving a nested template; increments and checks the depth when drained
    Open { path: String },
}

/// Mutable state owned by exactly one in-flight parse
pub struct BlueprintParseContext<'a> {
    loader: &'a dyn ResourceLoader,
    template_context: TemplateContext,
    raw: Value,
    tree: NodeTree,
    limits: ParseLimits,
    node_count: usize,
    nested_count: usize,
    max_nested_seen: usize,
    tasks: Vec<NestedTask>,
}

impl<'a> BlueprintParseContext<'a> {
    /// The root template node counts toward the node ceiling
    pub fn new(
        loader: &'a dyn ResourceLoader,
        template_context: TemplateContext,
        limits: ParseLimits,
        source: &str,
    ) -> Self {
        Self {
            loader,
            template_context,
            raw: Value::Null,
            tree: NodeTree::new(source),
            limits,
            node_count: 1,
            nested_count: 0,
            max_nested_seen: 0,
            tasks: Vec::new(),
        }
    }

    pub fn loader(&self) -> &'a dyn ResourceLoader {
        self.loader
    }

    pub fn template_context(&self) -> &TemplateContext {
        &self.template_context
    }

    pub fn limits(&self) -> ParseLimits {
        self.limits
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn take_raw(&mut self) -> Value {
        std::mem::take(&mut self.raw)
    }

    pub fn set_raw(&mut self, raw: Value) {
        self.raw = raw;
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> NodeTree {
        self.tree
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn max_nested_depth(&self) -> usize {
        self.max_nested_seen
    }

    /// Account for one more node, failing past the ceiling
    pub fn register_node(&mut self) -> Result<()> {
        self.node_count += 1;
        if self.node_count > self.limits.max_node_count {
            return Err(BlueprintError::MaxNodeCountExceeded {
                limit: self.limits.max_node_count,
            });
        }
        Ok(())
    }

    pub fn push_task(&mut self, task: NestedTask) {
        self.tasks.push(task);
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Drain the task stack once, after the full tree has been built
    pub fn drain_tasks(&mut self) -> Result<()> {
        while let Some(task) = self.tasks.pop() {
            match task {
                NestedTask::Open { path } => {
                    self.nested_count += 1;
                    if self.nested_count > self.limits.max_nested_templates {
                        self.tasks.clear();
                        return Err(BlueprintError::MaxNestedTemplatesExceeded {
                            limit: self.limits.max_nested_templates,
                            path,
                        });
                    }
                    self.max_nested_seen = self.max_nested_seen.max(self.nested_count);
                }
                NestedTask::Close { .. } => {
                    self.nested_count = self.nested_count.saturating_sub(1);
                }
            }
        }
        Ok(())
    }
}
