//! Structural walk from rendered data to the node graph

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::context::{BlueprintParseContext, NestedTask, ParseLimits};
use crate::config::{EngineConfig, TemplateFiles};
use crate::error::{BlueprintError, Result};
use crate::node::{
    parse_reference, NodeId, NodeKind, NodeTree, NodeType, ScalarValue, BODY_NAME, PROPS_NAME,
};
use crate::template::{ResourceLoader, TemplateContext, TemplateRenderer};

pub const VALUE_KEY: &str = "@v";
pub const TYPE_KEY: &str = "@type";
pub const FUNCTION_KEY: &str = "@fn";
pub const PARAMS_KEY: &str = "@params";
pub const RESOURCE_KEY: &str = "@res";
pub const PROPS_KEY: &str = "@props";
pub const DEPENDS_ON_KEY: &str = "@dependsOn";
pub const TEMPLATE_KEY: &str = "@tpl";

pub struct BlueprintParser {
    renderer: TemplateRenderer,
    limits: ParseLimits,
    files: TemplateFiles,
}

impl BlueprintParser {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            renderer: TemplateRenderer::new(),
            limits: ParseLimits {
                max_node_count: config.max_node_count,
                max_nested_templates: config.max_nested_templates,
                max_structure_depth: config.max_structure_depth,
            },
            files: config.files.clone(),
        }
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Render the index template and build its node graph
    pub fn parse_blueprint(
        &self,
        loader: &dyn ResourceLoader,
        context: TemplateContext,
    ) -> Result<NodeTree> {
        let index = self.files.index.as_str();
        let raw = self
            .renderer
            .render(loader, index, &context)?
            .ok_or_else(|| BlueprintError::TemplateNotFound {
                path: index.to_string(),
            })?;

        let mut ctx = BlueprintParseContext::new(loader, context, self.limits, index);
        ctx.set_raw(raw);
        self.parse_into(&mut ctx)?;

        info!(
            "Parsed blueprint {}: {} nodes, nested depth {}",
            index,
            ctx.node_count(),
            ctx.max_nested_depth()
        );
        Ok(ctx.into_tree())
    }

    /// Walk the context's raw data under its root template, then drain the
    /// deferred nested-template tasks
    pub fn parse_into(&self, ctx: &mut BlueprintParseContext<'_>) -> Result<()> {
        let raw = ctx.take_raw();
        let root = ctx.tree().root();
        let walked = self.walk(ctx, root, BODY_NAME.to_string(), &raw, 0);
        ctx.set_raw(raw);
        walked?;
        ctx.drain_tasks()
    }

    fn walk(
        &self,
        ctx: &mut BlueprintParseContext<'_>,
        parent: NodeId,
        name: String,
        value: &Value,
        depth: usize,
    ) -> Result<NodeId> {
        if depth > self.limits.max_structure_depth {
            return Err(BlueprintError::parsing(
                child_path(ctx.tree(), parent, &name),
                format!(
                    "structure nested deeper than {} levels",
                    self.limits.max_structure_depth
                ),
            ));
        }

        match value {
            Value::Array(items) => {
                ctx.register_node()?;
                let id = ctx
                    .tree_mut()
                    .add_child(parent, name, NodeKind::Array(Vec::with_capacity(items.len())))?;
                for (index, item) in items.iter().enumerate() {
                    self.walk(ctx, id, index.to_string(), item, depth + 1)?;
                }
                Ok(id)
            }
            Value::Object(object) => self.walk_object(ctx, parent, name, object, depth),
            scalar => {
                ctx.register_node()?;
                let scalar = ScalarValue::from_json(scalar).unwrap_or(ScalarValue::Null);
                ctx.tree_mut().add_child(parent, name, NodeKind::Value(scalar))
            }
        }
    }

    fn walk_object(
        &self,
        ctx: &mut BlueprintParseContext<'_>,
        parent: NodeId,
        name: String,
        object: &Map<String, Value>,
        depth: usize,
    ) -> Result<NodeId> {
        let path = child_path(ctx.tree(), parent, &name);

        if let Some(raw) = object.get(VALUE_KEY) {
            check_keys(object, &[VALUE_KEY, TYPE_KEY], &path)?;
            if raw.is_array() || raw.is_object() {
                return Err(BlueprintError::parsing(path, "@v must hold a scalar"));
            }
            let scalar = match object.get(TYPE_KEY) {
                Some(Value::String(type_name)) => ScalarValue::convert(raw, type_name)
                    .map_err(|reason| BlueprintError::parsing(path.clone(), reason))?,
                Some(_) => return Err(BlueprintError::parsing(path, "@type must be a string")),
                None => ScalarValue::from_json(raw).unwrap_or(ScalarValue::Null),
            };
            ctx.register_node()?;
            return ctx.tree_mut().add_child(parent, name, NodeKind::Value(scalar));
        }

        if let Some(kind) = object.get(FUNCTION_KEY) {
            check_keys(object, &[FUNCTION_KEY, PARAMS_KEY], &path)?;
            let kind = kind_name(kind, FUNCTION_KEY, &path)?;
            let params = match object.get(PARAMS_KEY) {
                None | Some(Value::Null) => &[][..],
                Some(Value::Array(params)) => params.as_slice(),
                Some(_) => return Err(BlueprintError::parsing(path, "@params must be a list")),
            };
            ctx.register_node()?;
            let id = ctx.tree_mut().add_child(parent, name, NodeKind::function(kind))?;
            for (index, param) in params.iter().enumerate() {
                self.walk(ctx, id, index.to_string(), param, depth + 1)?;
            }
            return Ok(id);
        }

        if let Some(kind) = object.get(RESOURCE_KEY) {
            check_keys(object, &[RESOURCE_KEY, PROPS_KEY, DEPENDS_ON_KEY], &path)?;
            let kind = kind_name(kind, RESOURCE_KEY, &path)?;
            let depends_on = dependency_paths(object.get(DEPENDS_ON_KEY), &path)?;
            ctx.register_node()?;
            let id = ctx
                .tree_mut()
                .add_child(parent, name, NodeKind::resource(kind, depends_on))?;
            match object.get(PROPS_KEY) {
                None | Some(Value::Null) => {}
                Some(props @ Value::Object(_)) => {
                    self.walk(ctx, id, PROPS_NAME.to_string(), props, depth + 1)?;
                }
                Some(_) => return Err(BlueprintError::parsing(path, "@props must be a mapping")),
            }
            return Ok(id);
        }

        if let Some(source) = object.get(TEMPLATE_KEY) {
            check_keys(object, &[TEMPLATE_KEY, PARAMS_KEY], &path)?;
            let source = kind_name(source, TEMPLATE_KEY, &path)?;
            let params = match object.get(PARAMS_KEY) {
                None | Some(Value::Null) => json!({}),
                Some(params @ Value::Object(_)) => params.clone(),
                Some(_) => return Err(BlueprintError::parsing(path, "@params must be a mapping")),
            };
            return self.walk_nested(ctx, parent, name, source, params, depth);
        }

        if let Some(reserved) = object.keys().find(|key| key.starts_with('@')) {
            return Err(BlueprintError::parsing(
                path,
                format!("unknown node kind '{reserved}'"),
            ));
        }

        ctx.register_node()?;
        let id = ctx
            .tree_mut()
            .add_child(parent, name, NodeKind::Map(BTreeMap::new()))?;
        for (key, child) in object {
            self.walk(ctx, id, key.clone(), child, depth + 1)?;
        }
        Ok(id)
    }

    fn walk_nested(
        &self,
        ctx: &mut BlueprintParseContext<'_>,
        parent: NodeId,
        name: String,
        source: &str,
        params: Value,
        depth: usize,
    ) -> Result<NodeId> {
        ctx.register_node()?;
        let id = ctx
            .tree_mut()
            .add_child(parent, name, NodeKind::template(source))?;
        let path = ctx.tree().path(id);
        ctx.push_task(NestedTask::Close { path: path.clone() });

        debug!("Rendering nested template {} at {}", source, path);
        let nested_context = ctx.template_context().with_parameters(params);
        let rendered = self
            .renderer
            .render(ctx.loader(), source, &nested_context)?
            .ok_or_else(|| {
                BlueprintError::parsing(path.clone(), format!("nested template '{source}' not found"))
            })?;

        self.walk(ctx, id, BODY_NAME.to_string(), &rendered, depth + 1)?;
        ctx.push_task(NestedTask::Open { path });
        Ok(id)
    }
}

fn child_path(tree: &NodeTree, parent: NodeId, name: &str) -> String {
    let parent_path = tree.path(parent);
    match tree.get(parent).node_type() {
        NodeType::Template => parent_path,
        NodeType::Array | NodeType::Function => format!("{parent_path}[{name}]"),
        _ => format!("{parent_path}.{name}"),
    }
}

fn check_keys(object: &Map<String, Value>, allowed: &[&str], path: &str) -> Result<()> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(BlueprintError::parsing(
            path,
            format!("unexpected key '{key}' next to {}", allowed[0]),
        )),
        None => Ok(()),
    }
}

fn kind_name<'v>(value: &'v Value, key: &str, path: &str) -> Result<&'v str> {
    match value {
        Value::String(kind) if !kind.trim().is_empty() => Ok(kind.as_str()),
        _ => Err(BlueprintError::parsing(
            path,
            format!("{key} must be a non-empty string"),
        )),
    }
}

fn dependency_paths(value: Option<&Value>, path: &str) -> Result<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(single)) => vec![Value::String(single.clone())],
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(BlueprintError::parsing(
                path,
                "@dependsOn must be a path or a list of paths",
            ))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(reference) => {
                parse_reference(&reference)
                    .map_err(|reason| BlueprintError::parsing(path, reason))?;
                Ok(reference)
            }
            other => Err(BlueprintError::parsing(
                path,
                format!("@dependsOn entry {other} is not a path"),
            )),
        })
        .collect()
}
