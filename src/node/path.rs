//! Resolution of reference paths such as `gateway.props.name` or `$.devices[1]`

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::tree::{NodeId, NodeKind, NodeTree, PROPS_NAME, RESULT_NAME};

static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>[^\[\]]*)(?P<indices>(?:\[\d+\])*)$").expect("valid segment regex")
});
static INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("valid index regex"));

/// Where a reference lands: an executable or data node, plus the segments
/// still to apply to that node's value once it has been evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    pub target: NodeId,
    pub rest: Vec<String>,
}

/// Split a reference into segments. A leading `$` names the template body.
pub fn parse_reference(reference: &str) -> Result<Vec<String>, String> {
    let trimmed = reference.trim();
    let trimmed = trimmed
        .strip_prefix('$')
        .map(|rest| rest.strip_prefix('.').unwrap_or(rest))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    for part in trimmed.split('.') {
        let caps = SEGMENT
            .captures(part)
            .ok_or_else(|| format!("malformed segment '{part}'"))?;
        let key = caps.name("key").map_or("", |m| m.as_str());
        let indices = caps.name("indices").map_or("", |m| m.as_str());
        if key.is_empty() && indices.is_empty() {
            return Err(format!("empty segment in '{reference}'"));
        }
        if !key.is_empty() {
            segments.push(key.to_string());
        }
        for index in INDEX.captures_iter(indices) {
            segments.push(index[1].to_string());
        }
    }
    Ok(segments)
}

/// Resolve `reference` against the body of the template enclosing `anchor`
pub fn resolve_reference(
    tree: &NodeTree,
    anchor: NodeId,
    reference: &str,
) -> Result<ResolvedReference, String> {
    let segments = parse_reference(reference)?;
    let template = tree.nearest_template(anchor);
    let mut current = tree
        .child(template, super::tree::BODY_NAME)
        .ok_or_else(|| "template has no body".to_string())?;

    let mut i = 0;
    while i < segments.len() {
        let segment = &segments[i];
        match tree.kind(current) {
            NodeKind::Template(template) => {
                current = template
                    .body
                    .ok_or_else(|| format!("nested template at '{segment}' has no body"))?;
                continue;
            }
            NodeKind::Map(entries) => {
                current = *entries
                    .get(segment)
                    .ok_or_else(|| format!("no entry named '{segment}'"))?;
            }
            NodeKind::Array(items) => {
                let index = segment
                    .parse::<usize>()
                    .map_err(|_| format!("'{segment}' is not an array index"))?;
                current = *items
                    .get(index)
                    .ok_or_else(|| format!("index {index} out of range ({})", items.len()))?;
            }
            NodeKind::Resource(resource) if segment == PROPS_NAME && resource.props.is_some() => {
                current = resource.props.unwrap_or(current);
            }
            NodeKind::Function(_) | NodeKind::Resource(_) => {
                let skip = usize::from(segment == RESULT_NAME);
                return Ok(ResolvedReference {
                    target: current,
                    rest: segments[i + skip..].to_vec(),
                });
            }
            NodeKind::Value(_) => {
                return Err(format!("'{segment}' cannot be read from a scalar value"));
            }
        }
        i += 1;
    }

    Ok(ResolvedReference {
        target: current,
        rest: Vec::new(),
    })
}

/// Read the value a resolved reference points at
pub fn read_reference(tree: &NodeTree, resolved: &ResolvedReference) -> Value {
    let mut value = tree.materialize(resolved.target);
    for segment in &resolved.rest {
        value = match value {
            Value::Object(mut object) => object.remove(segment).unwrap_or(Value::Null),
            Value::Array(mut items) => match segment.parse::<usize>() {
                Ok(index) if index < items.len() => items.swap_remove(index),
                _ => Value::Null,
            },
            _ => Value::Null,
        };
    }
    value
}
