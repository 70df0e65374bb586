//! Default data synthesis.
//!
//! [`get_data`] completes partial data with the values a schema describes:
//! `const`, the first `enum` entry, `default`, or a type default, recursing
//! into required (or present) properties and items. Values supplied by the
//! caller are kept as they are.

use crate::keywords::arrays::item_schema;
use crate::node::{Node, NodeId};
use crate::options::GetDataOptions;
use crate::reduce::{follow_reference, reduce_branches};
use crate::resolve::resolve_reference;
use crate::scope::join_pointer;
use crate::traverse::get_child;
use crate::validate::EvalContext;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, trace};

/// How often each reference target has been entered on the current branch
type Visits = HashMap<(usize, NodeId), usize>;

/// Synthesize data for `node`, keeping every value of `data`
pub fn get_data(
    node: &Node,
    data: Option<&Value>,
    options: &GetDataOptions,
    ctx: &mut EvalContext<'_>,
) -> Value {
    let mut visits = Visits::new();
    synthesize(node, data, "#", options, ctx, &mut visits).unwrap_or(Value::Null)
}

fn synthesize(
    node: &Node,
    data: Option<&Value>,
    pointer: &str,
    options: &GetDataOptions,
    ctx: &mut EvalContext<'_>,
    visits: &mut Visits,
) -> Option<Value> {
    let mut entered = Vec::new();
    let resolved = resolve(node, data, pointer, options, ctx, visits, &mut entered);
    let value = match resolved {
        Some(resolved) => fill(&resolved, data, pointer, options, ctx, visits),
        None => {
            trace!(pointer, "recursion limit reached");
            data.cloned()
        }
    };
    for key in entered {
        if let Some(count) = visits.get_mut(&key) {
            *count -= 1;
        }
    }
    value
}

/// Reduce a node against the data and follow its references.
///
/// `None` when a reference target was entered more often than the limit.
fn resolve(
    node: &Node,
    data: Option<&Value>,
    pointer: &str,
    options: &GetDataOptions,
    ctx: &mut EvalContext<'_>,
    visits: &mut Visits,
    entered: &mut Vec<(usize, NodeId)>,
) -> Option<Node> {
    // Without data, branches are chosen for the value the node starts from
    let template = match data {
        Some(value) => value.clone(),
        None => initial_value(node, options).unwrap_or(Value::Null),
    };
    let value = &template;
    let mut current = node.clone();
    loop {
        current = match reduce_branches(&current, value, pointer, ctx) {
            Ok(reduced) => reduced,
            Err(error) => {
                debug!(pointer, code = %error.code, "keeping unreduced node");
                current
            }
        };
        let target = match resolve_reference(&current, pointer, value, ctx) {
            Ok(Some(target)) => target,
            _ => return Some(current),
        };
        let count = visits.entry(target.key()).or_insert(0);
        *count += 1;
        entered.push(target.key());
        if *count > options.recursion_limit {
            return None;
        }
        current = match follow_reference(&current, value, pointer, ctx) {
            Ok(Some(next)) => next,
            _ => return Some(current),
        };
    }
}

/// Starting value of a location without caller data
fn initial_value(node: &Node, options: &GetDataOptions) -> Option<Value> {
    if let Some(value) = node.keyword("const") {
        return Some(value.clone());
    }
    if let Some(Value::Array(values)) = node.keyword("enum")
        && let Some(first) = values.first()
    {
        return Some(first.clone());
    }
    if let Some(value) = node.keyword("default") {
        return Some(value.clone());
    }

    let declared = match node.keyword("type") {
        Some(Value::String(name)) => Some(name.as_str()),
        Some(Value::Array(names)) => names.first().and_then(Value::as_str),
        _ => None,
    };
    let children = node.children();
    let inferred = declared.or_else(|| {
        if !children.properties.is_empty() || node.keyword("required").is_some() {
            Some("object")
        } else if !children.prefix_items.is_empty() || children.items.is_some() {
            Some("array")
        } else {
            None
        }
    })?;

    match inferred {
        "object" => Some(Value::Object(Map::new())),
        "array" => Some(Value::Array(Vec::new())),
        _ if !options.use_type_defaults => None,
        "string" => Some(Value::String(String::new())),
        "number" | "integer" => Some(Value::from(0)),
        "boolean" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => None,
    }
}

fn fill(
    node: &Node,
    data: Option<&Value>,
    pointer: &str,
    options: &GetDataOptions,
    ctx: &mut EvalContext<'_>,
    visits: &mut Visits,
) -> Option<Value> {
    let value = match data {
        Some(value) => Some(value.clone()),
        None => match initial_value(node, options) {
            Some(value) => Some(value),
            None => {
                let first = node.children().any_of.first().map(|&id| node.child(id))?;
                return synthesize(&first, None, pointer, options, ctx, visits);
            }
        },
    };

    match value? {
        Value::Object(map) => Some(Value::Object(fill_object(node, map, pointer, options, ctx, visits))),
        Value::Array(items) => Some(Value::Array(fill_array(node, items, pointer, options, ctx, visits))),
        other => Some(other),
    }
}

fn fill_object(
    node: &Node,
    mut map: Map<String, Value>,
    pointer: &str,
    options: &GetDataOptions,
    ctx: &mut EvalContext<'_>,
    visits: &mut Visits,
) -> Map<String, Value> {
    let required: Vec<String> = node
        .keyword("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let mut keys: Vec<String> = Vec::new();
    for name in node.children().properties.keys() {
        if options.add_optional_props || required.contains(name) || map.contains_key(name) {
            keys.push(name.clone());
        }
    }
    for name in required.iter().chain(map.keys()) {
        if !keys.contains(name) {
            keys.push(name.clone());
        }
    }

    let snapshot = Value::Object(map.clone());
    for key in keys {
        let Some(child) = get_child(node, &key, Some(&snapshot)) else {
            continue;
        };
        let current = map.get(&key).cloned();
        let location = join_pointer(pointer, &key);
        if let Some(value) = synthesize(&child, current.as_ref(), &location, options, ctx, visits) {
            map.insert(key, value);
        }
    }
    map
}

fn fill_array(
    node: &Node,
    mut items: Vec<Value>,
    pointer: &str,
    options: &GetDataOptions,
    ctx: &mut EvalContext<'_>,
    visits: &mut Visits,
) -> Vec<Value> {
    for index in 0..items.len() {
        let Some(schema) = item_schema(node, index) else {
            break;
        };
        let location = join_pointer(pointer, &index.to_string());
        let current = items[index].clone();
        if let Some(value) = synthesize(&schema, Some(&current), &location, options, ctx, visits) {
            items[index] = value;
        }
    }

    let min_items = node
        .keyword("minItems")
        .and_then(Value::as_u64)
        .map_or(0, |min| min as usize);
    let target = min_items.max(node.children().prefix_items.len());
    while items.len() < target {
        let index = items.len();
        let Some(schema) = item_schema(node, index) else {
            break;
        };
        let location = join_pointer(pointer, &index.to_string());
        match synthesize(&schema, None, &location, options, ctx, visits) {
            Some(value) => items.push(value),
            None => break,
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use crate::JsonSchema;
    use crate::options::{CompileOptions, GetDataOptions};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn data(schema: Value, input: Option<Value>) -> Value {
        data_with(schema, input, &GetDataOptions::default())
    }

    fn data_with(schema: Value, input: Option<Value>, options: &GetDataOptions) -> Value {
        JsonSchema::compile(&schema, &CompileOptions::default())
            .unwrap()
            .get_data(input.as_ref(), options)
    }

    #[test]
    fn test_required_properties_get_type_defaults() {
        let schema = json!({
            "type": "object",
            "properties": { "title": { "type": "string" }, "count": { "type": "integer" } },
            "required": ["title"]
        });
        assert_eq!(data(schema.clone(), Some(json!({}))), json!({ "title": "" }));
        assert_eq!(data(schema, Some(json!({ "title": "x" }))), json!({ "title": "x" }));
    }

    #[test]
    fn test_value_precedence() {
        assert_eq!(data(json!({ "const": 3, "default": 4 }), None), json!(3));
        assert_eq!(data(json!({ "enum": ["a", "b"], "default": "b" }), None), json!("a"));
        assert_eq!(data(json!({ "type": "string", "default": "d" }), None), json!("d"));
        assert_eq!(data(json!({ "type": ["boolean", "null"] }), None), json!(false));
        assert_eq!(data(json!({}), None), json!(null));
    }

    #[test]
    fn test_optional_properties_and_type_defaults_options() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "number" }, "b": { "type": "string", "default": "x" } }
        });
        let options = GetDataOptions {
            add_optional_props: true,
            use_type_defaults: false,
            ..Default::default()
        };
        assert_eq!(data_with(schema, None, &options), json!({ "b": "x" }));
    }

    #[test]
    fn test_items_and_min_items() {
        let schema = json!({
            "type": "array",
            "minItems": 2,
            "items": { "type": "object", "required": ["id"], "properties": { "id": { "type": "integer" } } }
        });
        assert_eq!(data(schema.clone(), None), json!([{ "id": 0 }, { "id": 0 }]));
        assert_eq!(
            data(schema, Some(json!([{ "id": 7, "extra": true }]))),
            json!([{ "id": 7, "extra": true }, { "id": 0 }])
        );
    }

    #[test]
    fn test_recursion_limit_leaves_slot_absent() {
        let schema = json!({
            "type": "object",
            "required": ["child"],
            "properties": { "child": { "$ref": "#" } }
        });
        assert_eq!(data(schema.clone(), Some(json!({}))), json!({ "child": {} }));

        let deeper = GetDataOptions {
            recursion_limit: 2,
            ..Default::default()
        };
        assert_eq!(
            data_with(schema, Some(json!({})), &deeper),
            json!({ "child": { "child": {} } })
        );
    }

    #[test]
    fn test_one_of_and_if_follow_data() {
        let schema = json!({
            "type": "object",
            "required": ["kind"],
            "properties": { "kind": { "enum": ["a", "b"] } },
            "if": { "required": ["kind"], "properties": { "kind": { "const": "b" } } },
            "then": { "required": ["b"], "properties": { "b": { "type": "number", "default": 5 } } },
            "else": { "required": ["a"], "properties": { "a": { "type": "string" } } }
        });
        assert_eq!(data(schema.clone(), None), json!({ "kind": "a", "a": "" }));
        assert_eq!(data(schema, Some(json!({ "kind": "b" }))), json!({ "kind": "b", "b": 5 }));
    }

    #[test]
    fn test_all_of_and_any_of_templates() {
        let schema = json!({
            "allOf": [
                { "required": ["a"], "properties": { "a": { "type": "string" } } },
                { "required": ["b"], "properties": { "b": { "type": "boolean" } } }
            ]
        });
        assert_eq!(data(schema, None), json!({ "a": "", "b": false }));

        let any_of = json!({ "anyOf": [{ "type": "number", "default": 1 }, { "type": "string" }] });
        assert_eq!(data(any_of, None), json!(1));
    }

    #[test]
    fn test_nested_all_of_in_every_branch_is_kept() {
        let schema = json!({
            "allOf": [
                { "allOf": [{ "required": ["a"], "properties": { "a": { "type": "string" } } }] },
                { "allOf": [{ "required": ["b"], "properties": { "b": { "type": "string" } } }] }
            ]
        });
        assert_eq!(data(schema, None), json!({ "a": "", "b": "" }));
    }

    #[test]
    fn test_conditionals_in_merged_branches_both_apply() {
        let schema = json!({
            "type": "object",
            "allOf": [
                {
                    "if": { "required": ["x"] },
                    "then": { "required": ["a"], "properties": { "a": { "default": 1 } } }
                },
                {
                    "if": { "required": ["x"] },
                    "then": { "required": ["b"], "properties": { "b": { "default": 2 } } }
                }
            ]
        });
        assert_eq!(
            data(schema, Some(json!({ "x": true }))),
            json!({ "x": true, "a": 1, "b": 2 })
        );
    }
}
