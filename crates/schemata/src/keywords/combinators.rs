//! Composition keywords and their reducers.

use super::{parse_schema, parse_schema_list};
use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError};
use crate::merge::{merge_schemas, with_absolute_references, without_keywords};
use crate::node::Node;
use crate::options::OneOfMode;
use crate::reduce::{derive, merge_into};
use crate::resolve::resolve_reference;
use crate::scope::join_pointer;
use crate::validate::{EvalContext, is_valid_node, validate_node};
use serde_json::{Value, json};
use tracing::trace;

pub fn all_of() -> Keyword {
    Keyword::new("allOf")
        .with_parse(|compiler, id| {
            let branches = parse_schema_list(compiler, id, "allOf")?;
            compiler.children_mut(id).all_of = branches;
            Ok(())
        })
        .with_validate(has_keyword, validate_all_of)
        .with_reduce(has_keyword, reduce_all_of)
}

pub fn any_of() -> Keyword {
    Keyword::new("anyOf")
        .with_parse(|compiler, id| {
            let branches = parse_schema_list(compiler, id, "anyOf")?;
            compiler.children_mut(id).any_of = branches;
            Ok(())
        })
        .with_validate(has_keyword, validate_any_of)
}

pub fn one_of() -> Keyword {
    Keyword::new("oneOf")
        .with_parse(|compiler, id| {
            let branches = parse_schema_list(compiler, id, "oneOf")?;
            compiler.children_mut(id).one_of = branches;
            Ok(())
        })
        .with_validate(has_keyword, validate_one_of)
        .with_reduce(has_keyword, reduce_one_of)
}

pub fn not() -> Keyword {
    Keyword::new("not")
        .with_parse(|compiler, id| {
            let not = parse_schema(compiler, id, "not")?;
            compiler.children_mut(id).not = not;
            Ok(())
        })
        .with_validate(has_keyword, validate_not)
}

/// `if` with its `then` and `else` companions
pub fn if_then_else() -> Keyword {
    Keyword::new("if")
        .with_parse(|compiler, id| {
            let if_ = parse_schema(compiler, id, "if")?;
            let then = parse_schema(compiler, id, "then")?;
            let else_ = parse_schema(compiler, id, "else")?;
            let children = compiler.children_mut(id);
            children.if_ = if_;
            children.then = then;
            children.else_ = else_;
            Ok(())
        })
        .with_validate(has_keyword, validate_if)
        .with_reduce(has_keyword, reduce_if)
}

fn branches(node: &Node, ids: &[usize]) -> Vec<Node> {
    ids.iter().map(|&id| node.child(id)).collect()
}

fn validate_all_of(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    branches(node, &node.children().all_of)
        .iter()
        .flat_map(|branch| validate_node(branch, data, pointer, ctx))
        .collect()
}

fn validate_any_of(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    let any_of = branches(node, &node.children().any_of);
    if any_of.iter().any(|branch| is_valid_node(branch, data, pointer, ctx)) {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::AnyOf,
        pointer,
        data,
        json!({ "anyOf": node.keyword("anyOf") }),
    )]
}

/// Indices of the `oneOf` branches `data` validates against
fn one_of_matches(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<usize> {
    branches(node, &node.children().one_of)
        .iter()
        .enumerate()
        .filter(|(_, branch)| is_valid_node(branch, data, pointer, ctx))
        .map(|(index, _)| index)
        .collect()
}

fn one_of_error(node: &Node, data: &Value, pointer: &str) -> JsonError {
    node.error(
        ErrorKind::OneOf,
        pointer,
        data,
        json!({ "oneOf": node.keyword("oneOf") }),
    )
}

fn multiple_one_of_error(node: &Node, data: &Value, pointer: &str, matches: &[usize]) -> JsonError {
    node.error(
        ErrorKind::MultipleOneOf,
        pointer,
        data,
        json!({ "matches": matches }),
    )
}

fn validate_one_of(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    let matches = one_of_matches(node, data, pointer, ctx);
    match matches.len() {
        0 => vec![one_of_error(node, data, pointer)],
        1 => Vec::new(),
        _ if node.options().one_of == OneOfMode::Fuzzy => Vec::new(),
        _ => vec![multiple_one_of_error(node, data, pointer, &matches)],
    }
}

fn validate_not(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    let Some(not) = node.children().not else {
        return Vec::new();
    };
    if !is_valid_node(&node.child(not), data, pointer, ctx) {
        return Vec::new();
    }
    vec![node.error(ErrorKind::Not, pointer, data, json!({ "not": node.keyword("not") }))]
}

/// Branch selected by the `if` condition, `None` when it is missing
fn if_branch(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Option<Node> {
    let children = node.children();
    let condition = node.child(children.if_?);
    let taken = if is_valid_node(&condition, data, pointer, ctx) {
        children.then
    } else {
        children.else_
    };
    taken.map(|id| node.child(id))
}

fn validate_if(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> Vec<JsonError> {
    match if_branch(node, data, pointer, ctx) {
        Some(branch) => validate_node(&branch, data, pointer, ctx),
        None => Vec::new(),
    }
}

fn reduce_all_of(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let dialect = node.draft().dialect();
    let mut merged = with_absolute_references(
        &without_keywords(node.schema(), &["allOf"]),
        node.scope_id(),
        dialect,
    );
    for branch in branches(node, &node.children().all_of) {
        let own = with_absolute_references(branch.schema(), branch.scope_id(), dialect);
        let schema = match resolve_reference(&branch, pointer, data, ctx)? {
            Some(target) => merge_schemas(
                &with_absolute_references(target.schema(), target.scope_id(), target.draft().dialect()),
                &without_keywords(&own, &["$ref", "$dynamicRef", "$recursiveRef"]),
            ),
            None => own,
        };
        merged = merge_schemas(&merged, &schema);
    }
    derive(node, &merged, pointer, data).map(Some)
}

/// Number of properties declared by a branch that are present in `data` and valid
fn fuzzy_score(branch: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> usize {
    let Value::Object(map) = data else {
        return 0;
    };
    let target = match resolve_reference(branch, pointer, data, ctx) {
        Ok(Some(target)) => target,
        _ => branch.clone(),
    };
    let mut score = 0;
    for (name, &child) in &target.children().properties {
        if let Some(value) = map.get(name)
            && is_valid_node(&target.child(child), value, &join_pointer(pointer, name), ctx)
        {
            score += 1;
        }
    }
    score
}

fn reduce_one_of(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let one_of = branches(node, &node.children().one_of);
    let matches = one_of_matches(node, data, pointer, ctx);
    let fuzzy = node.options().one_of == OneOfMode::Fuzzy;

    let selected = match matches.as_slice() {
        [index] => *index,
        [] if fuzzy => {
            let mut best = (0, 0);
            for (index, branch) in one_of.iter().enumerate() {
                let score = fuzzy_score(branch, data, pointer, ctx);
                if score > best.1 {
                    best = (index, score);
                }
            }
            trace!(branch = best.0, score = best.1, "fuzzy oneOf selection");
            best.0
        }
        [] if ctx.fallback_first_branch && !one_of.is_empty() => 0,
        [] => return Err(one_of_error(node, data, pointer)),
        [first, ..] if fuzzy || ctx.fallback_first_branch => *first,
        _ => return Err(multiple_one_of_error(node, data, pointer, &matches)),
    };
    let Some(branch) = one_of.get(selected) else {
        return Err(one_of_error(node, data, pointer));
    };
    let base = without_keywords(node.schema(), &["oneOf"]);
    merge_into(node, &base, &[branch], pointer, data).map(Some)
}

fn reduce_if(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let base = without_keywords(node.schema(), &["if", "then", "else"]);
    match if_branch(node, data, pointer, ctx) {
        Some(branch) => merge_into(node, &base, &[&branch], pointer, data).map(Some),
        None => derive(node, &base, pointer, data).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use crate::JsonSchema;
    use crate::options::{CompileOptions, OneOfMode};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn codes_with(schema: Value, data: Value, options: &CompileOptions) -> Vec<String> {
        JsonSchema::compile(&schema, options)
            .unwrap()
            .validate(&data)
            .errors
            .into_iter()
            .map(|error| error.code)
            .collect()
    }

    fn codes(schema: Value, data: Value) -> Vec<String> {
        codes_with(schema, data, &CompileOptions::default())
    }

    #[test]
    fn test_all_of_collects_branch_errors() {
        let schema = json!({ "allOf": [{ "type": "string" }, { "minLength": 3 }] });
        assert!(codes(schema.clone(), json!("abc")).is_empty());
        assert_eq!(codes(schema, json!(1)), vec!["type-error"]);
        assert_eq!(
            codes(json!({ "allOf": [{ "minimum": 5 }, { "multipleOf": 2 }] }), json!(3)),
            vec!["minimum-error", "multiple-of-error"]
        );
    }

    #[test]
    fn test_any_of_reports_single_error() {
        let schema = json!({ "anyOf": [{ "type": "string" }, { "type": "number" }] });
        assert!(codes(schema.clone(), json!(1)).is_empty());
        assert_eq!(codes(schema, json!(true)), vec!["any-of-error"]);
    }

    #[test]
    fn test_one_of_strict_and_fuzzy() {
        let schema = json!({ "oneOf": [{ "required": ["bar"] }, { "required": ["foo"] }] });
        let data = json!({ "foo": "baz", "bar": 2 });

        let report = JsonSchema::compile(&schema, &CompileOptions::default())
            .unwrap()
            .validate(&data);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].name, "MultipleOneOfError");
        assert_eq!(report.errors[0].data["matches"], json!([0, 1]));

        let fuzzy = CompileOptions::default().with_one_of(OneOfMode::Fuzzy);
        assert!(codes_with(schema.clone(), data, &fuzzy).is_empty());
        assert_eq!(codes_with(schema, json!({}), &fuzzy), vec!["one-of-error"]);
    }

    #[test]
    fn test_not() {
        assert!(codes(json!({ "not": { "type": "string" } }), json!(1)).is_empty());
        assert_eq!(codes(json!({ "not": { "type": "string" } }), json!("x")), vec!["not-error"]);
        assert_eq!(codes(json!({ "not": true }), json!(null)), vec!["not-error"]);
    }

    #[test]
    fn test_if_then_else() {
        let schema = json!({
            "if": { "properties": { "kind": { "const": "a" } } },
            "then": { "required": ["a"] },
            "else": { "required": ["b"] }
        });
        assert!(codes(schema.clone(), json!({ "kind": "a", "a": 1 })).is_empty());
        assert_eq!(codes(schema.clone(), json!({ "kind": "a" })), vec!["required-property-error"]);
        assert!(codes(schema.clone(), json!({ "kind": "x", "b": 1 })).is_empty());
        assert_eq!(codes(schema, json!({ "kind": "x" })), vec!["required-property-error"]);

        assert!(codes(json!({ "if": { "type": "string" } }), json!(1)).is_empty());
    }
}
