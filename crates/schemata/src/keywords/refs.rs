//! Reference keywords and definition containers.
//!
//! References are never inlined at compile time. The validator and reducer
//! resolve the token on every use through the scope tables, so recursive
//! schemas stay finite.

use super::parse_schema_map;
use crate::compile::Compiler;
use crate::draft::{Keyword, ParseFn, has_keyword};
use crate::error::{JsonError, SchemaResult};
use crate::merge::{has_constraints, merge_schemas, with_absolute_references, without_keywords};
use crate::node::{Node, NodeId};
use crate::reduce::derive;
use crate::resolve::{resolve_dynamic_ref, resolve_recursive_ref, resolve_ref};
use crate::validate::{EvalContext, validate_node};
use serde_json::Value;

/// Keywords dropped from the sibling schema merged into a reference target
const SIBLING_ANNOTATIONS: &[&str] = &[
    "$ref",
    "$dynamicRef",
    "$recursiveRef",
    "$id",
    "id",
    "$schema",
    "$anchor",
    "$dynamicAnchor",
    "$recursiveAnchor",
    "$defs",
    "definitions",
];

pub fn reference() -> Keyword {
    Keyword::new("$ref")
        .with_parse(|compiler, id| note(compiler, id, "$ref"))
        .with_validate(has_keyword, validate_ref)
        .with_reduce(has_keyword, reduce_ref)
}

/// Draft 2019-09 `$recursiveRef`
pub fn recursive_reference() -> Keyword {
    Keyword::new("$recursiveRef")
        .with_parse(|compiler, id| note(compiler, id, "$recursiveRef"))
        .with_validate(has_keyword, validate_recursive_ref)
        .with_reduce(has_keyword, reduce_recursive_ref)
}

/// Draft 2020-12 `$dynamicRef`
pub fn dynamic_reference() -> Keyword {
    Keyword::new("$dynamicRef")
        .with_parse(|compiler, id| note(compiler, id, "$dynamicRef"))
        .with_validate(has_keyword, validate_dynamic_ref)
        .with_reduce(has_keyword, reduce_dynamic_ref)
}

/// `definitions` or `$defs`; compiled so their entries are reference targets
pub fn definitions(keyword: &str) -> Keyword {
    let parse: ParseFn = if keyword == "$defs" {
        |compiler, id| parse_definitions(compiler, id, "$defs")
    } else {
        |compiler, id| parse_definitions(compiler, id, "definitions")
    };
    Keyword::new(keyword).with_parse(parse)
}

fn note(compiler: &mut Compiler<'_>, id: NodeId, keyword: &str) -> SchemaResult<()> {
    if let Some(Value::String(token)) = compiler.keyword(id, keyword) {
        compiler.note_reference(id, &token);
    }
    Ok(())
}

fn parse_definitions(compiler: &mut Compiler<'_>, id: NodeId, keyword: &str) -> SchemaResult<()> {
    let defs = parse_schema_map(compiler, id, keyword)?;
    compiler.children_mut(id).defs.extend(defs);
    Ok(())
}

fn token<'n>(node: &'n Node, keyword: &str) -> Option<&'n str> {
    node.keyword(keyword).and_then(Value::as_str)
}

fn validate_target(
    target: Result<Node, JsonError>,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    match target {
        Ok(target) => validate_node(&target, data, pointer, ctx),
        Err(error) => vec![error],
    }
}

fn validate_ref(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    let Some(token) = token(node, "$ref") else {
        return Vec::new();
    };
    validate_target(resolve_ref(node, token, pointer, data, ctx), data, pointer, ctx)
}

fn validate_dynamic_ref(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some(token) = token(node, "$dynamicRef") else {
        return Vec::new();
    };
    validate_target(resolve_dynamic_ref(node, token, pointer, data, ctx), data, pointer, ctx)
}

fn validate_recursive_ref(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some(token) = token(node, "$recursiveRef") else {
        return Vec::new();
    };
    validate_target(resolve_recursive_ref(node, token, pointer, data, ctx), data, pointer, ctx)
}

/// Replace a reference by its target, merging in constraining siblings.
///
/// Siblings are ignored where the dialect lets `$ref` override them. The
/// merged schema takes the referencing node's place; the target's own
/// references are made absolute first so they still reach its document.
fn reduce_to_target(node: &Node, target: Node, pointer: &str, data: &Value) -> Result<Option<Node>, JsonError> {
    let dialect = node.draft().dialect();
    let siblings = without_keywords(node.schema(), SIBLING_ANNOTATIONS);
    if dialect.ref_overrides_siblings() || !has_constraints(&siblings) {
        return Ok(Some(target));
    }
    let merged = merge_schemas(
        &with_absolute_references(target.schema(), target.scope_id(), target.draft().dialect()),
        &with_absolute_references(&siblings, node.scope_id(), dialect),
    );
    derive(node, &merged, pointer, data).map(Some)
}

fn reduce_ref(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let Some(token) = token(node, "$ref") else {
        return Ok(None);
    };
    let target = resolve_ref(node, token, pointer, data, ctx)?;
    reduce_to_target(node, target, pointer, data)
}

fn reduce_dynamic_ref(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let Some(token) = token(node, "$dynamicRef") else {
        return Ok(None);
    };
    let target = resolve_dynamic_ref(node, token, pointer, data, ctx)?;
    reduce_to_target(node, target, pointer, data)
}

fn reduce_recursive_ref(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let Some(token) = token(node, "$recursiveRef") else {
        return Ok(None);
    };
    let target = resolve_recursive_ref(node, token, pointer, data, ctx)?;
    reduce_to_target(node, target, pointer, data)
}
