//! Object keywords: properties, additional properties, required members,
//! property counts and property dependencies.

use super::{parse_schema, parse_schema_map};
use crate::compile::Compiler;
use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError, SchemaResult};
use crate::merge::without_keywords;
use crate::node::{Node, NodeId, PatternChild};
use crate::reduce::{derive, merge_into};
use crate::scope::join_pointer;
use crate::validate::{EvalContext, validate_node};
use serde_json::{Map, Value, json};

pub fn properties() -> Keyword {
    Keyword::new("properties")
        .with_parse(parse_properties)
        .with_validate(has_keyword, validate_properties)
        .with_resolve(
            |node, _| !node.children.properties.is_empty(),
            resolve_property,
        )
}

pub fn pattern_properties() -> Keyword {
    Keyword::new("patternProperties")
        .with_parse(parse_pattern_properties)
        .with_validate(has_keyword, validate_pattern_properties)
        .with_resolve(
            |node, _| !node.children.pattern_properties.is_empty(),
            resolve_pattern_property,
        )
}

pub fn additional_properties() -> Keyword {
    Keyword::new("additionalProperties")
        .with_parse(parse_additional_properties)
        .with_validate(has_keyword, validate_additional_properties)
        .with_resolve(
            |node, _| node.children.additional_properties.is_some(),
            resolve_additional_property,
        )
}

pub fn property_names() -> Keyword {
    Keyword::new("propertyNames")
        .with_parse(|compiler, id| {
            let child = parse_schema(compiler, id, "propertyNames")?;
            compiler.children_mut(id).property_names = child;
            Ok(())
        })
        .with_validate(has_keyword, validate_property_names)
}

pub fn required() -> Keyword {
    Keyword::new("required").with_validate(has_keyword, validate_required)
}

pub fn min_properties() -> Keyword {
    Keyword::new("minProperties").with_validate(has_keyword, validate_min_properties)
}

pub fn max_properties() -> Keyword {
    Keyword::new("maxProperties").with_validate(has_keyword, validate_max_properties)
}

/// Drafts 4 to 7: `dependencies` mixes property lists and schemas
pub fn dependencies() -> Keyword {
    Keyword::new("dependencies")
        .with_parse(parse_dependencies)
        .with_validate(has_keyword, validate_dependencies)
        .with_reduce(has_keyword, reduce_dependencies)
}

pub fn dependent_required() -> Keyword {
    Keyword::new("dependentRequired").with_validate(has_keyword, validate_dependent_required)
}

pub fn dependent_schemas() -> Keyword {
    Keyword::new("dependentSchemas")
        .with_parse(|compiler, id| {
            let schemas = parse_schema_map(compiler, id, "dependentSchemas")?;
            compiler.children_mut(id).dependent_schemas = schemas;
            Ok(())
        })
        .with_validate(has_keyword, validate_dependent_schemas)
        .with_reduce(has_keyword, reduce_dependencies)
}

fn parse_properties(compiler: &mut Compiler<'_>, id: NodeId) -> SchemaResult<()> {
    let properties = parse_schema_map(compiler, id, "properties")?;
    compiler.children_mut(id).properties = properties;
    Ok(())
}

fn parse_pattern_properties(compiler: &mut Compiler<'_>, id: NodeId) -> SchemaResult<()> {
    let Some(Value::Object(patterns)) = compiler.keyword(id, "patternProperties") else {
        return Ok(());
    };
    for (pattern, schema) in &patterns {
        let regex = compiler.regex(pattern, id)?;
        let node = compiler.compile_child(id, &["patternProperties", pattern], schema)?;
        compiler.children_mut(id).pattern_properties.push(PatternChild {
            pattern: pattern.clone(),
            regex,
            node,
        });
    }
    Ok(())
}

fn parse_additional_properties(compiler: &mut Compiler<'_>, id: NodeId) -> SchemaResult<()> {
    let child = parse_schema(compiler, id, "additionalProperties")?;
    compiler.children_mut(id).additional_properties = child;
    Ok(())
}

fn parse_dependencies(compiler: &mut Compiler<'_>, id: NodeId) -> SchemaResult<()> {
    let Some(Value::Object(dependencies)) = compiler.keyword(id, "dependencies") else {
        return Ok(());
    };
    for (name, dependency) in &dependencies {
        if dependency.is_object() || dependency.is_boolean() {
            let child = compiler.compile_child(id, &["dependencies", name], dependency)?;
            compiler.children_mut(id).dependent_schemas.insert(name.clone(), child);
        }
    }
    Ok(())
}

/// Data as an object, or `None` for other types
fn object(data: &Value) -> Option<&Map<String, Value>> {
    data.as_object()
}

fn validate_properties(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some(map) = object(data) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    for (name, &child) in &node.children().properties {
        if let Some(value) = map.get(name) {
            errors.extend(validate_node(
                &node.child(child),
                value,
                &join_pointer(pointer, name),
                ctx,
            ));
        }
    }
    errors
}

fn validate_pattern_properties(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some(map) = object(data) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    for (name, value) in map {
        for pattern in &node.children().pattern_properties {
            if pattern.regex.is_match(name) {
                errors.extend(validate_node(
                    &node.child(pattern.node),
                    value,
                    &join_pointer(pointer, name),
                    ctx,
                ));
            }
        }
    }
    errors
}

/// Check if a property name is covered by `properties` or `patternProperties`
pub(crate) fn is_declared_property(node: &Node, name: &str) -> bool {
    let children = node.children();
    children.properties.contains_key(name)
        || children
            .pattern_properties
            .iter()
            .any(|pattern| pattern.regex.is_match(name))
}

fn validate_additional_properties(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Some(map), Some(additional)) = (object(data), node.children().additional_properties) else {
        return Vec::new();
    };
    let additional = node.child(additional);
    let mut errors = Vec::new();
    for (name, value) in map {
        if is_declared_property(node, name) {
            continue;
        }
        if additional.is_false_schema() {
            errors.push(node.error(
                ErrorKind::NoAdditionalProperties,
                pointer,
                value,
                json!({ "property": name, "properties": map.keys().collect::<Vec<_>>() }),
            ));
        } else {
            errors.extend(validate_node(&additional, value, &join_pointer(pointer, name), ctx));
        }
    }
    errors
}

fn validate_property_names(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Some(map), Some(names)) = (object(data), node.children().property_names) else {
        return Vec::new();
    };
    let names = node.child(names);
    map.keys()
        .filter(|name| {
            let key = Value::String((*name).clone());
            !validate_node(&names, &key, pointer, ctx).is_empty()
        })
        .map(|name| {
            node.error(
                ErrorKind::InvalidPropertyName,
                pointer,
                data,
                json!({ "property": name }),
            )
        })
        .collect()
}

fn validate_required(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let (Some(map), Some(Value::Array(required))) = (object(data), node.keyword("required")) else {
        return Vec::new();
    };
    required
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| !map.contains_key(*name))
        .map(|name| node.error(ErrorKind::Required, pointer, data, json!({ "key": name })))
        .collect()
}

fn validate_min_properties(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Some(map), Some(min)) = (object(data), node.keyword("minProperties").and_then(Value::as_u64)) else {
        return Vec::new();
    };
    if map.len() as u64 >= min {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::MinProperties,
        pointer,
        data,
        json!({ "minProperties": min, "length": map.len() }),
    )]
}

fn validate_max_properties(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Some(map), Some(max)) = (object(data), node.keyword("maxProperties").and_then(Value::as_u64)) else {
        return Vec::new();
    };
    if map.len() as u64 <= max {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::MaxProperties,
        pointer,
        data,
        json!({ "maxProperties": max, "length": map.len() }),
    )]
}

fn missing_dependencies(
    node: &Node,
    keyword: &str,
    map: &Map<String, Value>,
    pointer: &str,
    data: &Value,
) -> Vec<JsonError> {
    let Some(Value::Object(entries)) = node.keyword(keyword) else {
        return Vec::new();
    };
    let mut errors = Vec::new();
    for (trigger, dependency) in entries {
        let Value::Array(names) = dependency else {
            continue;
        };
        if !map.contains_key(trigger) {
            continue;
        }
        for name in names.iter().filter_map(Value::as_str) {
            if !map.contains_key(name) {
                errors.push(node.error(
                    ErrorKind::MissingDependency,
                    pointer,
                    data,
                    json!({ "missingProperty": name, "trigger": trigger }),
                ));
            }
        }
    }
    errors
}

fn triggered_schemas(
    node: &Node,
    map: &Map<String, Value>,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let mut errors = Vec::new();
    for (trigger, &child) in &node.children().dependent_schemas {
        if map.contains_key(trigger) {
            errors.extend(validate_node(&node.child(child), data, pointer, ctx));
        }
    }
    errors
}

/// Array entries list properties required with the trigger, schema
/// entries validate the whole object
fn validate_dependencies(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some(map) = object(data) else {
        return Vec::new();
    };
    let mut errors = missing_dependencies(node, "dependencies", map, pointer, data);
    errors.extend(triggered_schemas(node, map, data, pointer, ctx));
    errors
}

fn validate_dependent_required(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    match object(data) {
        Some(map) => missing_dependencies(node, "dependentRequired", map, pointer, data),
        None => Vec::new(),
    }
}

fn validate_dependent_schemas(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    match object(data) {
        Some(map) => triggered_schemas(node, map, data, pointer, ctx),
        None => Vec::new(),
    }
}

/// Merge the dependencies triggered by `data` into the node.
///
/// Property lists of draft 7 `dependencies` become `required` entries.
fn reduce_dependencies(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let keyword = if node.keyword("dependentSchemas").is_some() {
        "dependentSchemas"
    } else {
        "dependencies"
    };
    let mut base = without_keywords(node.schema(), &[keyword]);
    let map = object(data);
    let triggered = |name: &String| map.is_some_and(|map| map.contains_key(name));

    if keyword == "dependencies"
        && let Some(Value::Object(entries)) = node.keyword("dependencies")
    {
        let mut required: Vec<Value> = base
            .get("required")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for (trigger, dependency) in entries {
            if let Value::Array(names) = dependency
                && triggered(trigger)
            {
                for name in names {
                    if !required.contains(name) {
                        required.push(name.clone());
                    }
                }
            }
        }
        if !required.is_empty()
            && let Value::Object(base) = &mut base
        {
            base.insert("required".to_string(), Value::Array(required));
        }
    }

    let branches: Vec<Node> = node
        .children()
        .dependent_schemas
        .iter()
        .filter(|(trigger, _)| triggered(trigger))
        .map(|(_, &child)| node.child(child))
        .collect();
    let branches: Vec<&Node> = branches.iter().collect();
    if branches.is_empty() {
        return derive(node, &base, pointer, data).map(Some);
    }
    merge_into(node, &base, &branches, pointer, data).map(Some)
}

fn resolve_property(node: &Node, key: &str, _: Option<&Value>) -> Option<Node> {
    node.children()
        .properties
        .get(key)
        .map(|&child| node.child(child))
}

fn resolve_pattern_property(node: &Node, key: &str, _: Option<&Value>) -> Option<Node> {
    node.children()
        .pattern_properties
        .iter()
        .find(|pattern| pattern.regex.is_match(key))
        .map(|pattern| node.child(pattern.node))
}

fn resolve_additional_property(node: &Node, key: &str, _: Option<&Value>) -> Option<Node> {
    if is_declared_property(node, key) {
        return None;
    }
    node.children()
        .additional_properties
        .map(|child| node.child(child))
}
