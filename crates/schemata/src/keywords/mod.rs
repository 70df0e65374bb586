//! Built-in keywords.
//!
//! Every keyword is a [`Keyword`] descriptor built by a small constructor
//! function; [`builtin`] assembles the ordered list of one dialect.

pub mod arrays;
pub mod combinators;
pub mod format;
pub mod numbers;
pub mod objects;
pub mod refs;
pub mod strings;
pub mod types;
pub mod unevaluated;

use crate::compile::Compiler;
use crate::draft::Keyword;
use crate::error::SchemaResult;
use crate::node::NodeId;
use crate::options::Dialect;
use indexmap::IndexMap;
use serde_json::Value;

/// Ordered keyword list of a dialect
pub(crate) fn builtin(dialect: Dialect) -> Vec<Keyword> {
    use Dialect::*;

    let mut keywords = vec![refs::reference()];
    match dialect {
        Draft2019_09 => keywords.push(refs::recursive_reference()),
        Draft2020_12 => keywords.push(refs::dynamic_reference()),
        _ => {}
    }
    keywords.push(refs::definitions("definitions"));
    if dialect >= Draft2019_09 {
        keywords.push(refs::definitions("$defs"));
    }

    keywords.extend([types::type_keyword(), types::enum_keyword()]);
    if dialect >= Draft06 {
        keywords.push(types::const_keyword());
    }

    if dialect == Draft04 {
        keywords.extend([numbers::minimum_draft04(), numbers::maximum_draft04()]);
    } else {
        keywords.extend([
            numbers::minimum(),
            numbers::maximum(),
            numbers::exclusive_minimum(),
            numbers::exclusive_maximum(),
        ]);
    }
    keywords.push(numbers::multiple_of());

    keywords.extend([
        strings::min_length(),
        strings::max_length(),
        strings::pattern(),
        format::format(),
    ]);

    keywords.extend([
        objects::properties(),
        objects::pattern_properties(),
        objects::additional_properties(),
        objects::required(),
        objects::min_properties(),
        objects::max_properties(),
    ]);
    if dialect >= Draft06 {
        keywords.push(objects::property_names());
    }
    if dialect <= Draft07 {
        keywords.push(objects::dependencies());
    } else {
        keywords.extend([objects::dependent_required(), objects::dependent_schemas()]);
    }

    if dialect == Draft2020_12 {
        keywords.extend([arrays::prefix_items(), arrays::items()]);
    } else {
        keywords.extend([arrays::items_legacy(), arrays::additional_items()]);
    }
    if dialect >= Draft06 {
        keywords.push(arrays::contains());
    }
    keywords.extend([arrays::min_items(), arrays::max_items(), arrays::unique_items()]);

    keywords.extend([
        combinators::all_of(),
        combinators::any_of(),
        combinators::one_of(),
        combinators::not(),
    ]);
    if dialect >= Draft07 {
        keywords.push(combinators::if_then_else());
    }

    if dialect >= Draft2019_09 {
        keywords.extend([
            unevaluated::unevaluated_properties(),
            unevaluated::unevaluated_items(),
        ]);
    }
    keywords
}

/// Compile the single sub-schema stored under `keyword`
pub(crate) fn parse_schema(
    compiler: &mut Compiler<'_>,
    id: NodeId,
    keyword: &str,
) -> SchemaResult<Option<NodeId>> {
    match compiler.keyword(id, keyword) {
        Some(schema) => compiler.compile_child(id, &[keyword], &schema).map(Some),
        None => Ok(None),
    }
}

/// Compile an array of sub-schemas stored under `keyword`
pub(crate) fn parse_schema_list(
    compiler: &mut Compiler<'_>,
    id: NodeId,
    keyword: &str,
) -> SchemaResult<Vec<NodeId>> {
    let Some(Value::Array(schemas)) = compiler.keyword(id, keyword) else {
        return Ok(Vec::new());
    };
    schemas
        .iter()
        .enumerate()
        .map(|(index, schema)| compiler.compile_child(id, &[keyword, &index.to_string()], schema))
        .collect()
}

/// Compile a map of named sub-schemas stored under `keyword`
pub(crate) fn parse_schema_map(
    compiler: &mut Compiler<'_>,
    id: NodeId,
    keyword: &str,
) -> SchemaResult<IndexMap<String, NodeId>> {
    let Some(Value::Object(schemas)) = compiler.keyword(id, keyword) else {
        return Ok(IndexMap::new());
    };
    schemas
        .iter()
        .map(|(name, schema)| {
            compiler
                .compile_child(id, &[keyword, name], schema)
                .map(|child| (name.clone(), child))
        })
        .collect()
}

/// JSON type name of a value, with integral numbers reported as `integer`
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check a value against a `type` name.
///
/// Draft 4 only counts numbers without a fractional part in their JSON text as
/// integers, so `1.0` is an integer from draft 6 on but not in draft 4.
pub fn is_type(value: &Value, name: &str, dialect: Dialect) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => true,
            Value::Number(n) => {
                dialect != Dialect::Draft04 && n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        _ => false,
    }
}

/// JSON equality where `1` and `1.0` are the same number
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| json_equal(value, other)))
        }
        _ => a == b,
    }
}
