//! Data-directed schema lookup.
//!
//! [`get_node`] walks a data pointer through the schema, reducing every node
//! against the data it describes before asking its resolvers for the child.

use crate::error::{ErrorKind, JsonError};
use crate::node::Node;
use crate::options::GetNodeOptions;
use crate::reduce::reduce_node;
use crate::scope::{join_pointer, pointer_tokens};
use crate::validate::EvalContext;
use serde_json::{Value, json};
use tracing::debug;

/// A data location paired with the schema that describes it
#[derive(Debug, Clone)]
pub struct DataNode<'d> {
    pub node: Node,
    pub value: &'d Value,
    pub pointer: String,
}

/// Schema of the child `key` of a node, asked through its resolvers
pub fn get_child(node: &Node, key: &str, data: Option<&Value>) -> Option<Node> {
    let keywords = node.draft().keywords();
    node.data()
        .resolvers
        .iter()
        .filter_map(|&index| keywords[index].resolve)
        .find_map(|resolve| resolve(node, key, data))
}

/// Child value of an object key or array index
fn child_value<'d>(data: Option<&'d Value>, key: &str) -> Option<&'d Value> {
    match data? {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    }
}

/// Schema applicable at a data pointer, reduced against `data`
pub fn get_node(
    root: &Node,
    pointer: &str,
    data: Option<&Value>,
    options: &GetNodeOptions,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let null = Value::Null;
    let mut current = root.clone();
    let mut value = data;
    let mut location = "#".to_string();

    for token in pointer_tokens(pointer) {
        let reduced = reduce_node(&current, value.unwrap_or(&null), &location, ctx)?;
        let Some(child) = get_child(&reduced, &token, value) else {
            debug!(pointer = %location, property = %token, "no schema for data location");
            if options.require_schema {
                return Err(reduced.error(
                    ErrorKind::UnknownProperty,
                    &location,
                    value.unwrap_or(&null),
                    json!({ "property": token }),
                ));
            }
            return Ok(None);
        };
        value = child_value(value, &token);
        location = join_pointer(&location, &token);
        current = child;
    }
    reduce_node(&current, value.unwrap_or(&null), &location, ctx).map(Some)
}

/// Every data location of `data` paired with its reduced schema, parents first
pub fn to_data_nodes<'d>(root: &Node, data: &'d Value, ctx: &mut EvalContext<'_>) -> Vec<DataNode<'d>> {
    let mut nodes = Vec::new();
    collect(root, data, "#".to_string(), ctx, &mut nodes);
    nodes
}

fn collect<'d>(
    node: &Node,
    value: &'d Value,
    pointer: String,
    ctx: &mut EvalContext<'_>,
    nodes: &mut Vec<DataNode<'d>>,
) {
    let reduced = reduce_node(node, value, &pointer, ctx).unwrap_or_else(|_| node.clone());
    let children: Vec<(String, &'d Value)> = match value {
        Value::Object(map) => map.iter().map(|(key, child)| (key.clone(), child)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, child)| (index.to_string(), child))
            .collect(),
        _ => Vec::new(),
    };
    nodes.push(DataNode {
        node: reduced.clone(),
        value,
        pointer: pointer.clone(),
    });
    for (key, child) in children {
        if let Some(child_node) = get_child(&reduced, &key, Some(value)) {
            collect(&child_node, child, join_pointer(&pointer, &key), ctx, nodes);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::JsonSchema;
    use crate::options::{CompileOptions, GetNodeOptions};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn schema(value: Value) -> JsonSchema {
        JsonSchema::compile(&value, &CompileOptions::default()).unwrap()
    }

    #[test]
    fn test_get_node_follows_properties_and_items() {
        let schema = schema(json!({
            "properties": {
                "list": { "type": "array", "items": { "$ref": "#/$defs/entry" } }
            },
            "$defs": { "entry": { "type": "object", "properties": { "name": { "type": "string" } } } }
        }));
        let node = schema
            .get_node("#/list/0/name", None, &GetNodeOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(node.schema(), &json!({ "type": "string" }));
    }

    #[test]
    fn test_get_node_uses_data_for_one_of() {
        let schema = schema(json!({
            "oneOf": [
                { "properties": { "kind": { "const": "a" }, "value": { "type": "string" } }, "required": ["kind"] },
                { "properties": { "kind": { "const": "b" }, "value": { "type": "number" } }, "required": ["kind"] }
            ]
        }));
        let data = json!({ "kind": "b", "value": 1 });
        let node = schema
            .get_node("/value", Some(&data), &GetNodeOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(node.schema(), &json!({ "type": "number" }));
    }

    #[test]
    fn test_get_node_outside_schema() {
        let schema = schema(json!({ "properties": { "a": { "type": "string" } } }));
        assert!(schema
            .get_node("#/b", None, &GetNodeOptions::default())
            .unwrap()
            .is_none());

        let error = schema
            .get_node("#/b", None, &GetNodeOptions { require_schema: true })
            .unwrap_err();
        assert_eq!(error.code, "unknown-property-error");
        assert_eq!(error.data["property"], json!("b"));
    }

    #[test]
    fn test_to_data_nodes_pairs_locations() {
        let schema = schema(json!({
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "array", "items": { "type": "number" } }
            }
        }));
        let data = json!({ "a": "x", "b": [1, 2], "c": true });
        let pointers: Vec<String> = schema
            .to_data_nodes(&data)
            .into_iter()
            .map(|data_node| data_node.pointer)
            .collect();
        assert_eq!(pointers, vec!["#", "#/a", "#/b", "#/b/0", "#/b/1"]);
    }
}
