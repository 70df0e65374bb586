//! Evaluation tracking for `unevaluatedProperties` and `unevaluatedItems`.
//!
//! A property or item is evaluated when some successfully applied subschema
//! of the node (following in-place applicators and references) accounts for
//! it. The tracker walks the same composition tree as validation, but only
//! asks whether a key is covered; it never runs the node's own `unevaluated*`
//! keyword, which would recurse into itself.

use crate::keywords::objects::is_declared_property;
use crate::node::{Node, NodeId};
use crate::options::Dialect;
use crate::resolve::resolve_reference;
use crate::scope::join_pointer;
use crate::validate::{EvalContext, is_valid_node};
use serde_json::Value;
use std::collections::HashSet;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
enum Key<'k> {
    Property(&'k str),
    Item(usize),
}

/// Nodes already asked about a key at a data location
#[derive(Default)]
struct Tracker {
    visited: HashSet<((usize, NodeId), String)>,
}

/// Check if `key` of the object `data` is evaluated by `node`
pub fn is_property_evaluated(
    node: &Node,
    data: &Value,
    key: &str,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> bool {
    let mut tracker = Tracker::default();
    evaluates(node, data, Key::Property(key), pointer, ctx, &mut tracker, true)
}

/// Check if the item at `index` of the array `data` is evaluated by `node`
pub fn is_item_evaluated(
    node: &Node,
    data: &Value,
    index: usize,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> bool {
    let mut tracker = Tracker::default();
    evaluates(node, data, Key::Item(index), pointer, ctx, &mut tracker, true)
}

fn evaluates(
    node: &Node,
    data: &Value,
    key: Key<'_>,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    tracker: &mut Tracker,
    top: bool,
) -> bool {
    if !node.schema().is_object() {
        return false;
    }
    if !tracker.visited.insert((node.key(), pointer.to_string())) {
        trace!(path = node.evaluation_path(), pointer, "evaluation cycle");
        return false;
    }
    if top {
        return covers(node, data, key, pointer, ctx, tracker, top);
    }
    ctx.with_node(node, pointer, |ctx| covers(node, data, key, pointer, ctx, tracker, top))
}

fn covers(
    node: &Node,
    data: &Value,
    key: Key<'_>,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    tracker: &mut Tracker,
    top: bool,
) -> bool {
    let direct = match key {
        Key::Property(name) => covers_property(node, data, name, pointer, ctx, top),
        Key::Item(index) => covers_item(node, data, index, pointer, ctx, top),
    };
    direct || covers_in_place(node, data, key, pointer, ctx, tracker)
}

fn covers_property(
    node: &Node,
    data: &Value,
    name: &str,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    top: bool,
) -> bool {
    let Some(value) = data.get(name) else {
        return false;
    };
    let children = node.children();
    let location = join_pointer(pointer, name);

    if let Some(&child) = children.properties.get(name)
        && is_valid_node(&node.child(child), value, &location, ctx)
    {
        return true;
    }
    for pattern in &children.pattern_properties {
        if pattern.regex.is_match(name) && is_valid_node(&node.child(pattern.node), value, &location, ctx) {
            return true;
        }
    }
    if let Some(additional) = children.additional_properties
        && !is_declared_property(node, name)
        && is_valid_node(&node.child(additional), value, &location, ctx)
    {
        return true;
    }
    if !top
        && let Some(unevaluated) = children.unevaluated_properties
        && is_valid_node(&node.child(unevaluated), value, &location, ctx)
    {
        return true;
    }
    false
}

fn covers_item(
    node: &Node,
    data: &Value,
    index: usize,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    top: bool,
) -> bool {
    let Some(item) = data.get(index) else {
        return false;
    };
    let children = node.children();
    let location = join_pointer(pointer, &index.to_string());

    let positional = match children.prefix_items.get(index) {
        Some(&child) => Some(child),
        None => children.items,
    };
    if let Some(child) = positional
        && is_valid_node(&node.child(child), item, &location, ctx)
    {
        return true;
    }
    if node.draft().dialect() >= Dialect::Draft2020_12
        && let Some(contains) = children.contains
        && is_valid_node(&node.child(contains), item, &location, ctx)
    {
        return true;
    }
    if !top
        && let Some(unevaluated) = children.unevaluated_items
        && is_valid_node(&node.child(unevaluated), item, &location, ctx)
    {
        return true;
    }
    false
}

/// Applicators that evaluate the same data location
fn covers_in_place(
    node: &Node,
    data: &Value,
    key: Key<'_>,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    tracker: &mut Tracker,
) -> bool {
    let children = node.children();

    for &branch in &children.all_of {
        if evaluates(&node.child(branch), data, key, pointer, ctx, tracker, false) {
            return true;
        }
    }
    for &branch in children.any_of.iter().chain(&children.one_of) {
        let branch = node.child(branch);
        if is_valid_node(&branch, data, pointer, ctx)
            && evaluates(&branch, data, key, pointer, ctx, tracker, false)
        {
            return true;
        }
    }

    if let Some(condition) = children.if_ {
        let condition = node.child(condition);
        let taken = if is_valid_node(&condition, data, pointer, ctx) {
            if evaluates(&condition, data, key, pointer, ctx, tracker, false) {
                return true;
            }
            children.then
        } else {
            children.else_
        };
        if let Some(branch) = taken
            && evaluates(&node.child(branch), data, key, pointer, ctx, tracker, false)
        {
            return true;
        }
    }

    if let Value::Object(map) = data {
        for (trigger, &schema) in &children.dependent_schemas {
            if map.contains_key(trigger)
                && evaluates(&node.child(schema), data, key, pointer, ctx, tracker, false)
            {
                return true;
            }
        }
    }

    match resolve_reference(node, pointer, data, ctx) {
        Ok(Some(target)) => evaluates(&target, data, key, pointer, ctx, tracker, false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use crate::{JsonSchema, RemoteRegistry};
    use serde_json::json;

    fn evaluated(schema: Value, data: Value, key: &str) -> bool {
        let schema = JsonSchema::compile(&schema, &CompileOptions::default()).unwrap();
        let registry = RemoteRegistry::new();
        let mut ctx = EvalContext::new(&registry);
        is_property_evaluated(&schema.root_node(), &data, key, "#", &mut ctx)
    }

    #[test]
    fn test_direct_property_evaluation() {
        let schema = json!({ "properties": { "a": { "type": "string" } } });
        assert!(evaluated(schema.clone(), json!({ "a": "x" }), "a"));
        assert!(!evaluated(schema.clone(), json!({ "a": 1 }), "a"));
        assert!(!evaluated(schema, json!({ "b": 1 }), "b"));
    }

    #[test]
    fn test_evaluation_through_applicators() {
        let schema = json!({
            "allOf": [{ "properties": { "a": true } }],
            "anyOf": [{ "properties": { "b": true }, "required": ["b"] }, { "required": ["zzz"] }],
            "if": { "properties": { "c": { "const": 1 } } },
            "then": { "properties": { "d": true } },
            "$ref": "#/$defs/e",
            "$defs": { "e": { "properties": { "e": true } } }
        });
        let data = json!({ "a": 1, "b": 1, "c": 1, "d": 1, "e": 1, "f": 1 });
        for key in ["a", "b", "c", "d", "e"] {
            assert!(evaluated(schema.clone(), data.clone(), key), "{key}");
        }
        assert!(!evaluated(schema, data, "f"));
    }

    #[test]
    fn test_self_reference_terminates() {
        let schema = json!({ "$ref": "#", "properties": { "a": true } });
        assert!(evaluated(schema.clone(), json!({ "a": 1 }), "a"));
        assert!(!evaluated(schema, json!({ "b": 1 }), "b"));
    }

    #[test]
    fn test_item_evaluation() {
        let schema = JsonSchema::compile(
            &json!({ "prefixItems": [true], "contains": { "type": "string" } }),
            &CompileOptions::default(),
        )
        .unwrap();
        let registry = RemoteRegistry::new();
        let mut ctx = EvalContext::new(&registry);
        let data = json!([1, 2, "x"]);
        let root = schema.root_node();
        assert!(is_item_evaluated(&root, &data, 0, "#", &mut ctx));
        assert!(!is_item_evaluated(&root, &data, 1, "#", &mut ctx));
        assert!(is_item_evaluated(&root, &data, 2, "#", &mut ctx));
    }
}
