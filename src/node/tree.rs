//! Arena-backed blueprint node graph

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::value::ScalarValue;
use crate::error::{BlueprintError, Result};
use crate::types::BindResource;

/// Name under which a function or resource result is attached
pub const RESULT_NAME: &str = "result";
/// Name under which a resource's properties are attached
pub const PROPS_NAME: &str = "props";
/// Name under which a template's rendered body is attached
pub const BODY_NAME: &str = "body";

/// Handle of a node inside a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    NotReady,
    Pending,
    Finished,
    Deleted,
}

/// Discriminator of [`NodeKind`], used as registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Value,
    Array,
    Map,
    Function,
    Resource,
    Template,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Value => "value",
            NodeType::Array => "array",
            NodeType::Map => "map",
            NodeType::Function => "function",
            NodeType::Resource => "resource",
            NodeType::Template => "template",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub kind: String,
    pub params: Vec<NodeId>,
    pub result: Option<NodeId>,
    pub status: NodeStatus,
}

#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub kind: String,
    pub props: Option<NodeId>,
    /// Reference paths of nodes that must be deployed first
    pub depends_on: Vec<String>,
    pub result: Option<NodeId>,
    pub bindings: Vec<BindResource>,
    pub status: NodeStatus,
}

#[derive(Debug, Clone)]
pub struct TemplateNode {
    /// Relative path the template was rendered from
    pub source: String,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Value(ScalarValue),
    Array(Vec<NodeId>),
    Map(BTreeMap<String, NodeId>),
    Function(FunctionNode),
    Resource(ResourceNode),
    Template(TemplateNode),
}

impl NodeKind {
    pub fn function(kind: impl Into<String>) -> Self {
        NodeKind::Function(FunctionNode {
            kind: kind.into(),
            params: Vec::new(),
            result: None,
            status: NodeStatus::NotReady,
        })
    }

    pub fn resource(kind: impl Into<String>, depends_on: Vec<String>) -> Self {
        NodeKind::Resource(ResourceNode {
            kind: kind.into(),
            props: None,
            depends_on,
            result: None,
            bindings: Vec::new(),
            status: NodeStatus::NotReady,
        })
    }

    pub fn template(source: impl Into<String>) -> Self {
        NodeKind::Template(TemplateNode {
            source: source.into(),
            body: None,
        })
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Value(_) => NodeType::Value,
            NodeKind::Array(_) => NodeType::Array,
            NodeKind::Map(_) => NodeType::Map,
            NodeKind::Function(_) => NodeType::Function,
            NodeKind::Resource(_) => NodeType::Resource,
            NodeKind::Template(_) => NodeType::Template,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
    deleted: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn as_function(&self) -> Option<&FunctionNode> {
        match &self.kind {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceNode> {
        match &self.kind {
            NodeKind::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn is_executable(&self) -> bool {
        matches!(self.kind, NodeKind::Function(_) | NodeKind::Resource(_))
    }
}

/// Owns every node of one blueprint instantiation. The root is always a template node.
#[derive(Debug, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                name: "$".to_string(),
                parent: None,
                kind: NodeKind::template(source),
                deleted: false,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Create a node under `parent` and link it into the parent's structure
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
    ) -> Result<NodeId> {
        let name = name.into();
        let id = NodeId(self.nodes.len());

        let linked = match &mut self.nodes[parent.0].kind {
            NodeKind::Array(items) => {
                items.push(id);
                Ok(())
            }
            NodeKind::Map(entries) => {
                if entries.contains_key(&name) {
                    Err(format!("duplicate key '{name}'"))
                } else {
                    entries.insert(name.clone(), id);
                    Ok(())
                }
            }
            NodeKind::Function(function) => {
                if name == RESULT_NAME {
                    Err("function results are attached through set_result".to_string())
                } else {
                    function.params.push(id);
                    Ok(())
                }
            }
            NodeKind::Resource(resource) => {
                if name == PROPS_NAME && resource.props.is_none() {
                    resource.props = Some(id);
                    Ok(())
                } else {
                    Err(format!("resource cannot hold child '{name}'"))
                }
            }
            NodeKind::Template(template) => {
                if template.body.is_none() {
                    template.body = Some(id);
                    Ok(())
                } else {
                    Err("template already has a body".to_string())
                }
            }
            NodeKind::Value(_) => Err(format!("value node cannot hold child '{name}'")),
        };
        linked.map_err(|reason| BlueprintError::parsing(self.path(parent), reason))?;

        self.nodes.push(Node {
            name,
            parent: Some(parent),
            kind,
            deleted: false,
        });
        Ok(id)
    }

    pub fn status(&self, id: NodeId) -> NodeStatus {
        let node = &self.nodes[id.0];
        if node.deleted {
            return NodeStatus::Deleted;
        }
        match &node.kind {
            NodeKind::Function(function) => function.status,
            NodeKind::Resource(resource) => resource.status,
            _ => NodeStatus::Finished,
        }
    }

    /// Only function and resource nodes carry a state machine; other nodes can only be deleted.
    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        if status == NodeStatus::Deleted {
            self.mark_deleted(id);
            return;
        }
        match &mut self.nodes[id.0].kind {
            NodeKind::Function(function) => function.status = status,
            NodeKind::Resource(resource) => resource.status = status,
            _ => {}
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self.nodes[id.0].kind {
            NodeKind::Value(_) => Vec::new(),
            NodeKind::Array(items) => items.clone(),
            NodeKind::Map(entries) => entries.values().copied().collect(),
            NodeKind::Function(function) => {
                function.params.iter().copied().chain(function.result).collect()
            }
            NodeKind::Resource(resource) => resource.props.into_iter().chain(resource.result).collect(),
            NodeKind::Template(template) => template.body.into_iter().collect(),
        }
    }

    /// Look up a direct child by its name
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[id.0].kind {
            NodeKind::Value(_) => None,
            NodeKind::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i).copied()),
            NodeKind::Map(entries) => entries.get(name).copied(),
            NodeKind::Function(function) => {
                if name == RESULT_NAME {
                    function.result
                } else {
                    name.parse::<usize>().ok().and_then(|i| function.params.get(i).copied())
                }
            }
            NodeKind::Resource(resource) => match name {
                PROPS_NAME => resource.props,
                RESULT_NAME => resource.result,
                _ => None,
            },
            NodeKind::Template(template) => (name == BODY_NAME).then_some(template.body).flatten(),
        }
    }

    /// Human readable location, e.g. `$.devices[0].props`
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            let name = &self.nodes[current.0].name;
            match &self.nodes[parent.0].kind {
                NodeKind::Array(_) | NodeKind::Function(_) if name != RESULT_NAME => {
                    segments.push(format!("[{name}]"))
                }
                NodeKind::Template(_) => {}
                _ => segments.push(format!(".{name}")),
            }
            current = parent;
        }
        segments.reverse();
        format!("${}", segments.concat())
    }

    /// The closest template node at or above `id`
    pub fn nearest_template(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            if matches!(self.nodes[current.0].kind, NodeKind::Template(_)) {
                return current;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return self.root(),
            }
        }
    }

    /// All live function and resource nodes in creation order
    pub fn executables(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|id| {
                let node = self.get(*id);
                !node.deleted && node.is_executable()
            })
            .collect()
    }

    /// The nearest function/resource nodes below `id`, not descending into them
    pub fn executable_frontier(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id);
        stack.reverse();
        while let Some(current) = stack.pop() {
            let node = self.get(current);
            if node.deleted {
                continue;
            }
            if node.is_executable() {
                found.push(current);
            } else {
                let mut children = self.children(current);
                children.reverse();
                stack.extend(children);
            }
        }
        found
    }

    /// Materialize the value of a node, unwrapping children recursively.
    /// Map entries whose value is null are dropped.
    pub fn materialize(&self, id: NodeId) -> Value {
        match &self.nodes[id.0].kind {
            NodeKind::Value(scalar) => scalar.to_json(),
            NodeKind::Array(items) => {
                Value::Array(items.iter().map(|item| self.materialize(*item)).collect())
            }
            NodeKind::Map(entries) => {
                let mut object = Map::new();
                for (key, child) in entries {
                    let value = self.materialize(*child);
                    if !value.is_null() {
                        object.insert(key.clone(), value);
                    }
                }
                Value::Object(object)
            }
            NodeKind::Function(function) => function
                .result
                .map_or(Value::Null, |result| self.materialize(result)),
            NodeKind::Resource(resource) => resource
                .result
                .map_or(Value::Null, |result| self.materialize(result)),
            NodeKind::Template(template) => template
                .body
                .map_or(Value::Null, |body| self.materialize(body)),
        }
    }

    /// Attach (or clear) the result of a function or resource node. A previous
    /// result subtree is pruned.
    pub fn set_result(&mut self, id: NodeId, value: Option<Value>) -> Result<()> {
        let previous = match &self.nodes[id.0].kind {
            NodeKind::Function(function) => function.result,
            NodeKind::Resource(resource) => resource.result,
            other => {
                return Err(BlueprintError::parsing(
                    self.path(id),
                    format!("{} nodes have no result", other.node_type()),
                ))
            }
        };
        if let Some(previous) = previous {
            self.mark_deleted(previous);
        }

        let result = value.map(|value| self.build_data(id, RESULT_NAME.to_string(), &value));
        match &mut self.nodes[id.0].kind {
            NodeKind::Function(function) => function.result = result,
            NodeKind::Resource(resource) => resource.result = result,
            _ => {}
        }
        Ok(())
    }

    pub fn set_bindings(&mut self, id: NodeId, bindings: Vec<BindResource>) {
        if let NodeKind::Resource(resource) = &mut self.nodes[id.0].kind {
            resource.bindings = bindings;
        }
    }

    /// Serializable view of the parsed chart, kept for audit and replay
    pub fn chart(&self, id: NodeId) -> Value {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Value(scalar) => scalar.to_json(),
            NodeKind::Array(items) => {
                Value::Array(items.iter().map(|item| self.chart(*item)).collect())
            }
            NodeKind::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), self.chart(*child)))
                    .collect(),
            ),
            NodeKind::Function(function) => {
                let mut object = Map::new();
                object.insert("@fn".to_string(), Value::String(function.kind.clone()));
                object.insert(
                    "@params".to_string(),
                    Value::Array(function.params.iter().map(|p| self.chart(*p)).collect()),
                );
                if let Some(result) = function.result {
                    object.insert("@result".to_string(), self.materialize(result));
                }
                Value::Object(object)
            }
            NodeKind::Resource(resource) => {
                let mut object = Map::new();
                object.insert("@res".to_string(), Value::String(resource.kind.clone()));
                if let Some(props) = resource.props {
                    object.insert("@props".to_string(), self.chart(props));
                }
                if !resource.depends_on.is_empty() {
                    object.insert(
                        "@dependsOn".to_string(),
                        Value::Array(
                            resource
                                .depends_on
                                .iter()
                                .map(|d| Value::String(d.clone()))
                                .collect(),
                        ),
                    );
                }
                if !resource.bindings.is_empty() {
                    object.insert(
                        "@bindings".to_string(),
                        serde_json::to_value(&resource.bindings).unwrap_or(Value::Null),
                    );
                }
                Value::Object(object)
            }
            NodeKind::Template(template) => {
                let mut object = Map::new();
                object.insert("@tpl".to_string(), Value::String(template.source.clone()));
                if let Some(body) = template.body {
                    object.insert("@body".to_string(), self.chart(body));
                }
                Value::Object(object)
            }
        }
    }

    fn build_data(&mut self, parent: NodeId, name: String, value: &Value) -> NodeId {
        let id = NodeId(self.nodes.len());
        let kind = match value {
            Value::Array(_) => NodeKind::Array(Vec::new()),
            Value::Object(_) => NodeKind::Map(BTreeMap::new()),
            scalar => NodeKind::Value(ScalarValue::from_json(scalar).unwrap_or(ScalarValue::Null)),
        };
        self.nodes.push(Node {
            name,
            parent: Some(parent),
            kind,
            deleted: false,
        });

        match value {
            Value::Array(items) => {
                let children: Vec<NodeId> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.build_data(id, i.to_string(), item))
                    .collect();
                self.nodes[id.0].kind = NodeKind::Array(children);
            }
            Value::Object(object) => {
                let children: BTreeMap<String, NodeId> = object
                    .iter()
                    .map(|(key, item)| (key.clone(), self.build_data(id, key.clone(), item)))
                    .collect();
                self.nodes[id.0].kind = NodeKind::Map(children);
            }
            _ => {}
        }
        id
    }

    fn mark_deleted(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            self.nodes[current.0].deleted = true;
        }
    }
}
