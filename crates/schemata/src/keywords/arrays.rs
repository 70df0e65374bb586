//! Array keywords.
//!
//! Both item layouts compile into the same children: positional schemas in
//! `prefix_items` and the schema for the remaining items in `items`. Draft
//! 2020-12 spells these `prefixItems`/`items`, earlier drafts use an `items`
//! array followed by `additionalItems`.

use super::{json_equal, parse_schema, parse_schema_list};
use crate::compile::Compiler;
use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError, SchemaResult};
use crate::node::{Node, NodeId, SchemaNode};
use crate::options::Dialect;
use crate::scope::join_pointer;
use crate::validate::{EvalContext, is_valid_node, validate_node};
use serde_json::{Value, json};

/// Draft 2020-12 `prefixItems`; validates and resolves both item layouts
pub fn prefix_items() -> Keyword {
    Keyword::new("prefixItems")
        .with_parse(|compiler, id| {
            let prefix = parse_schema_list(compiler, id, "prefixItems")?;
            compiler.children_mut(id).prefix_items = prefix;
            Ok(())
        })
        .with_validate(has_item_schemas, validate_items)
        .with_resolve(has_item_schemas, resolve_item)
}

/// Draft 2020-12 `items`, the schema of items past `prefixItems`
pub fn items() -> Keyword {
    Keyword::new("items").with_parse(|compiler, id| {
        let items = parse_schema(compiler, id, "items")?;
        compiler.children_mut(id).items = items;
        Ok(())
    })
}

/// Drafts up to 2019-09: `items` as a schema or a positional list
pub fn items_legacy() -> Keyword {
    Keyword::new("items")
        .with_parse(parse_items_legacy)
        .with_validate(has_item_schemas, validate_items)
        .with_resolve(has_item_schemas, resolve_item)
}

/// `additionalItems`, only meaningful next to an `items` array
pub fn additional_items() -> Keyword {
    Keyword::new("additionalItems").with_parse(|compiler, id| {
        if let Some(Value::Array(_)) = compiler.keyword(id, "items") {
            let additional = parse_schema(compiler, id, "additionalItems")?;
            compiler.children_mut(id).items = additional;
        }
        Ok(())
    })
}

pub fn contains() -> Keyword {
    Keyword::new("contains")
        .with_parse(|compiler, id| {
            let contains = parse_schema(compiler, id, "contains")?;
            compiler.children_mut(id).contains = contains;
            Ok(())
        })
        .with_validate(has_keyword, validate_contains)
}

pub fn min_items() -> Keyword {
    Keyword::new("minItems").with_validate(has_keyword, validate_min_items)
}

pub fn max_items() -> Keyword {
    Keyword::new("maxItems").with_validate(has_keyword, validate_max_items)
}

pub fn unique_items() -> Keyword {
    Keyword::new("uniqueItems").with_validate(has_keyword, validate_unique_items)
}

fn parse_items_legacy(compiler: &mut Compiler<'_>, id: NodeId) -> SchemaResult<()> {
    match compiler.keyword(id, "items") {
        Some(Value::Array(_)) => {
            let prefix = parse_schema_list(compiler, id, "items")?;
            compiler.children_mut(id).prefix_items = prefix;
        }
        Some(_) => {
            let items = parse_schema(compiler, id, "items")?;
            compiler.children_mut(id).items = items;
        }
        None => {}
    }
    Ok(())
}

fn has_item_schemas(node: &SchemaNode, _: &Keyword) -> bool {
    !node.children.prefix_items.is_empty() || node.children.items.is_some()
}

/// Schema applying to the item at `index`
pub(crate) fn item_schema(node: &Node, index: usize) -> Option<Node> {
    let children = node.children();
    match children.prefix_items.get(index) {
        Some(&child) => Some(node.child(child)),
        None => children.items.map(|child| node.child(child)),
    }
}

fn validate_items(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    let Value::Array(items) = data else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let Some(schema) = item_schema(node, index) else {
            break;
        };
        let is_rest = index >= node.children().prefix_items.len();
        if is_rest && schema.is_false_schema() {
            errors.push(node.error(
                ErrorKind::AdditionalItems,
                pointer,
                item,
                json!({ "key": index }),
            ));
            continue;
        }
        errors.extend(validate_node(
            &schema,
            item,
            &join_pointer(pointer, &index.to_string()),
            ctx,
        ));
    }
    errors
}

fn resolve_item(node: &Node, key: &str, _: Option<&Value>) -> Option<Node> {
    let index = key.parse::<usize>().ok()?;
    item_schema(node, index)
}

fn validate_contains(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Value::Array(items), Some(contains)) = (data, node.children().contains) else {
        return Vec::new();
    };
    let contains = node.child(contains);
    let count = items
        .iter()
        .enumerate()
        .filter(|(index, item)| {
            is_valid_node(&contains, item, &join_pointer(pointer, &index.to_string()), ctx)
        })
        .count();

    let bounded = node.draft().dialect() >= Dialect::Draft2019_09;
    let min_contains = node
        .keyword("minContains")
        .and_then(Value::as_u64)
        .filter(|_| bounded);
    let max_contains = node
        .keyword("maxContains")
        .and_then(Value::as_u64)
        .filter(|_| bounded);
    let schema = contains.schema();

    let mut errors = Vec::new();
    match min_contains {
        Some(min) if (count as u64) < min => errors.push(node.error(
            ErrorKind::ContainsMin,
            pointer,
            data,
            json!({ "minContains": min, "count": count, "contains": schema }),
        )),
        None if count == 0 => errors.push(node.error(
            ErrorKind::Contains,
            pointer,
            data,
            json!({ "contains": schema }),
        )),
        _ => {}
    }
    if let Some(max) = max_contains
        && count as u64 > max
    {
        errors.push(node.error(
            ErrorKind::ContainsMax,
            pointer,
            data,
            json!({ "maxContains": max, "count": count, "contains": schema }),
        ));
    }
    errors
}

fn validate_min_items(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let (Value::Array(items), Some(min)) = (data, node.keyword("minItems").and_then(Value::as_u64)) else {
        return Vec::new();
    };
    if items.len() as u64 >= min {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::MinItems,
        pointer,
        data,
        json!({ "minItems": min, "length": items.len() }),
    )]
}

fn validate_max_items(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let (Value::Array(items), Some(max)) = (data, node.keyword("maxItems").and_then(Value::as_u64)) else {
        return Vec::new();
    };
    if items.len() as u64 <= max {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::MaxItems,
        pointer,
        data,
        json!({ "maxItems": max, "length": items.len() }),
    )]
}

fn validate_unique_items(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Value::Array(items) = data else {
        return Vec::new();
    };
    if node.keyword("uniqueItems") != Some(&Value::Bool(true)) {
        return Vec::new();
    }
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if let Some(first) = items[..index].iter().position(|other| json_equal(other, item)) {
            errors.push(node.error(
                ErrorKind::UniqueItems,
                &join_pointer(pointer, &index.to_string()),
                item,
                json!({ "duplicatePointer": join_pointer(pointer, &first.to_string()) }),
            ));
        }
    }
    errors
}
