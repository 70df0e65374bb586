// type, enum and const

use super::{is_type, json_equal, json_type_name};
use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError};
use crate::node::Node;
use crate::validate::EvalContext;
use serde_json::{Value, json};

pub fn type_keyword() -> Keyword {
    Keyword::new("type").with_validate(has_keyword, validate_type)
}

pub fn enum_keyword() -> Keyword {
    Keyword::new("enum").with_validate(has_keyword, validate_enum)
}

pub fn const_keyword() -> Keyword {
    Keyword::new("const").with_validate(has_keyword, validate_const)
}

fn validate_type(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let dialect = node.draft().dialect();
    let expected = node.keyword("type");
    let matches = match expected {
        Some(Value::String(name)) => is_type(data, name, dialect),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| is_type(data, name, dialect)),
        _ => true,
    };
    if matches {
        return Vec::new();
    }
    vec![node.error(
        ErrorKind::Type,
        pointer,
        data,
        json!({ "expected": expected, "received": json_type_name(data) }),
    )]
}

fn validate_enum(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let Some(Value::Array(values)) = node.keyword("enum") else {
        return Vec::new();
    };
    if values.iter().any(|value| json_equal(value, data)) {
        return Vec::new();
    }
    vec![node.error(ErrorKind::Enum, pointer, data, json!({ "values": values }))]
}

fn validate_const(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let Some(expected) = node.keyword("const") else {
        return Vec::new();
    };
    if json_equal(expected, data) {
        return Vec::new();
    }
    vec![node.error(ErrorKind::Const, pointer, data, json!({ "expected": expected }))]
}
