//! Node reduction.
//!
//! Reduction replaces a node that branches on data (`$ref`, `oneOf`, `if`,
//! `dependentSchemas`, `allOf`, ...) by the single node describing the given
//! data. Each reducer removes the keyword it handled, so repeated application
//! reaches a node without reducers.

use crate::compile::Compiler;
use crate::error::{ErrorKind, JsonError};
use crate::merge::{has_constraints, merge_schemas, with_absolute_references};
use crate::node::Node;
use crate::validate::EvalContext;
use serde_json::{Value, json};
use tracing::trace;

/// Upper bound on reductions applied to one node
pub const MAX_REDUCE_STEPS: usize = 64;

const REFERENCE_KEYWORDS: &[&str] = &["$ref", "$dynamicRef", "$recursiveRef"];

/// Reduce a node against `data` until no reducer applies
pub fn reduce_node(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Node, JsonError> {
    reduce_with(node, data, pointer, ctx, true)
}

/// Like [`reduce_node`], leaving reference keywords for the caller to follow
pub(crate) fn reduce_branches(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Node, JsonError> {
    reduce_with(node, data, pointer, ctx, false)
}

fn reduce_with(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    follow_references: bool,
) -> Result<Node, JsonError> {
    let mut current = node.clone();
    for _ in 0..MAX_REDUCE_STEPS {
        match reduce_step(&current, data, pointer, ctx, follow_references)? {
            Some(next) => current = next,
            None => return Ok(current),
        }
    }
    trace!(path = node.evaluation_path(), "reduction did not converge");
    Err(current.error(
        ErrorKind::UnresolvableRef,
        pointer,
        data,
        json!({ "ref": current.evaluation_path() }),
    ))
}

fn reduce_step(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
    follow_references: bool,
) -> Result<Option<Node>, JsonError> {
    let keywords = node.draft().keywords();
    for &index in &node.data().reducers {
        let keyword = &keywords[index];
        if !follow_references && REFERENCE_KEYWORDS.contains(&keyword.keyword.as_str()) {
            continue;
        }
        let Some(reduce) = keyword.reduce else {
            continue;
        };
        if let Some(next) = ctx.with_node(node, pointer, |ctx| reduce(node, data, pointer, ctx))? {
            return Ok(Some(next));
        }
    }
    Ok(None)
}

/// Apply the first reference reducer of a node, if any
pub(crate) fn follow_reference(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let keywords = node.draft().keywords();
    for &index in &node.data().reducers {
        let keyword = &keywords[index];
        if !REFERENCE_KEYWORDS.contains(&keyword.keyword.as_str()) {
            continue;
        }
        if let Some(reduce) = keyword.reduce
            && let Some(next) = ctx.with_node(node, pointer, |ctx| reduce(node, data, pointer, ctx))?
        {
            return Ok(Some(next));
        }
    }
    Ok(None)
}

/// Merge `branches` into `base` and compile the result in place of `origin`.
///
/// `base` is read in `origin`'s scope and each branch in its own. A base
/// without constraints and a single branch yields the branch itself.
pub fn merge_into(
    origin: &Node,
    base: &Value,
    branches: &[&Node],
    pointer: &str,
    data: &Value,
) -> Result<Node, JsonError> {
    if let [branch] = branches
        && !has_constraints(base)
    {
        return Ok((*branch).clone());
    }
    let base = with_absolute_references(base, origin.scope_id(), origin.draft().dialect());
    let merged = branches.iter().fold(base, |merged, branch| {
        let branch = with_absolute_references(branch.schema(), branch.scope_id(), branch.draft().dialect());
        merge_schemas(&merged, &branch)
    });
    derive(origin, &merged, pointer, data)
}

/// Compile a schema value in place of `origin`
pub fn derive(origin: &Node, schema: &Value, pointer: &str, data: &Value) -> Result<Node, JsonError> {
    Compiler::derive(origin, schema).map_err(|error| {
        origin.error(
            ErrorKind::InvalidSchema,
            pointer,
            data,
            json!({
                "schemaPointer": origin.evaluation_path(),
                "reason": error.to_string(),
            }),
        )
    })
}
