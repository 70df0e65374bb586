// String length and pattern keywords

use crate::compile::Compiler;
use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError, SchemaResult};
use crate::node::{Node, NodeId, SchemaNode};
use crate::validate::EvalContext;
use serde_json::{Value, json};

pub fn min_length() -> Keyword {
    Keyword::new("minLength").with_validate(has_keyword, validate_min_length)
}

pub fn max_length() -> Keyword {
    Keyword::new("maxLength").with_validate(has_keyword, validate_max_length)
}

pub fn pattern() -> Keyword {
    Keyword::new("pattern")
        .with_parse(parse_pattern)
        .with_validate(has_pattern, validate_pattern)
}

fn parse_pattern(compiler: &mut Compiler<'_>, id: NodeId) -> SchemaResult<()> {
    if let Some(Value::String(pattern)) = compiler.keyword(id, "pattern") {
        let regex = compiler.regex(&pattern, id)?;
        compiler.set_pattern(id, regex);
    }
    Ok(())
}

fn has_pattern(node: &SchemaNode, _: &Keyword) -> bool {
    node.pattern.is_some()
}

fn validate_min_length(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let (Some(text), Some(min)) = (data.as_str(), node.keyword("minLength").and_then(Value::as_u64)) else {
        return Vec::new();
    };
    let length = text.chars().count();
    if length as u64 >= min {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::MinLength,
        pointer,
        data,
        json!({ "minLength": min, "length": length }),
    )]
}

fn validate_max_length(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let (Some(text), Some(max)) = (data.as_str(), node.keyword("maxLength").and_then(Value::as_u64)) else {
        return Vec::new();
    };
    let length = text.chars().count();
    if length as u64 <= max {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::MaxLength,
        pointer,
        data,
        json!({ "maxLength": max, "length": length }),
    )]
}

fn validate_pattern(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let (Some(text), Some(regex)) = (data.as_str(), node.data().pattern.as_ref()) else {
        return Vec::new();
    };
    if regex.is_match(text) {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::Pattern,
        pointer,
        data,
        json!({ "pattern": regex.as_str() }),
    )]
}
