//! Numeric bounds and `multipleOf`.
//!
//! Draft 4 expresses exclusive bounds as booleans next to `minimum` and
//! `maximum`; later drafts use standalone numeric `exclusiveMinimum` and
//! `exclusiveMaximum`. Each dialect registers only its own form.

use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError};
use crate::node::Node;
use crate::validate::EvalContext;
use serde_json::{Value, json};

pub fn minimum() -> Keyword {
    Keyword::new("minimum").with_validate(has_keyword, validate_minimum)
}

pub fn maximum() -> Keyword {
    Keyword::new("maximum").with_validate(has_keyword, validate_maximum)
}

pub fn minimum_draft04() -> Keyword {
    Keyword::new("minimum").with_validate(has_keyword, validate_minimum_draft04)
}

pub fn maximum_draft04() -> Keyword {
    Keyword::new("maximum").with_validate(has_keyword, validate_maximum_draft04)
}

pub fn exclusive_minimum() -> Keyword {
    Keyword::new("exclusiveMinimum").with_validate(has_keyword, validate_exclusive_minimum)
}

pub fn exclusive_maximum() -> Keyword {
    Keyword::new("exclusiveMaximum").with_validate(has_keyword, validate_exclusive_maximum)
}

pub fn multiple_of() -> Keyword {
    Keyword::new("multipleOf").with_validate(has_keyword, validate_multiple_of)
}

/// Data value and keyword bound, when both are numbers
fn operands<'n>(node: &'n Node, data: &Value, keyword: &str) -> Option<(f64, f64, &'n Value)> {
    let bound = node.keyword(keyword)?;
    Some((data.as_f64()?, bound.as_f64()?, bound))
}

fn validate_minimum(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    match operands(node, data, "minimum") {
        Some((value, minimum, bound)) if value < minimum => {
            vec![node.error(ErrorKind::Minimum, pointer, data, json!({ "minimum": bound }))]
        }
        _ => Vec::new(),
    }
}

fn validate_maximum(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    match operands(node, data, "maximum") {
        Some((value, maximum, bound)) if value > maximum => {
            vec![node.error(ErrorKind::Maximum, pointer, data, json!({ "maximum": bound }))]
        }
        _ => Vec::new(),
    }
}

fn validate_minimum_draft04(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some((value, minimum, bound)) = operands(node, data, "minimum") else {
        return Vec::new();
    };
    let exclusive = node.keyword("exclusiveMinimum") == Some(&Value::Bool(true));
    if exclusive && value <= minimum {
        vec![node.error(ErrorKind::ExclusiveMinimum, pointer, data, json!({ "exclusiveMinimum": bound }))]
    } else if value < minimum {
        vec![node.error(ErrorKind::Minimum, pointer, data, json!({ "minimum": bound }))]
    } else {
        Vec::new()
    }
}

fn validate_maximum_draft04(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let Some((value, maximum, bound)) = operands(node, data, "maximum") else {
        return Vec::new();
    };
    let exclusive = node.keyword("exclusiveMaximum") == Some(&Value::Bool(true));
    if exclusive && value >= maximum {
        vec![node.error(ErrorKind::ExclusiveMaximum, pointer, data, json!({ "exclusiveMaximum": bound }))]
    } else if value > maximum {
        vec![node.error(ErrorKind::Maximum, pointer, data, json!({ "maximum": bound }))]
    } else {
        Vec::new()
    }
}

fn validate_exclusive_minimum(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    match operands(node, data, "exclusiveMinimum") {
        Some((value, minimum, bound)) if value <= minimum => vec![node.error(
            ErrorKind::ExclusiveMinimum,
            pointer,
            data,
            json!({ "exclusiveMinimum": bound }),
        )],
        _ => Vec::new(),
    }
}

fn validate_exclusive_maximum(
    node: &Node,
    data: &Value,
    pointer: &str,
    _: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    match operands(node, data, "exclusiveMaximum") {
        Some((value, maximum, bound)) if value >= maximum => vec![node.error(
            ErrorKind::ExclusiveMaximum,
            pointer,
            data,
            json!({ "exclusiveMaximum": bound }),
        )],
        _ => Vec::new(),
    }
}

fn validate_multiple_of(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    let Some(divisor) = node.keyword("multipleOf") else {
        return Vec::new();
    };
    let multiple = match (data.as_i64(), divisor.as_i64()) {
        (Some(value), Some(divisor)) if divisor != 0 => {
            value.checked_rem(divisor).is_none_or(|rest| rest == 0)
        }
        _ => match (data.as_f64(), divisor.as_f64()) {
            (Some(value), Some(divisor)) => is_multiple_of(value, divisor),
            _ => return Vec::new(),
        },
    };
    if multiple {
        return Vec::new();
    }
    vec![node.error(ErrorKind::MultipleOf, pointer, data, json!({ "multipleOf": divisor }))]
}

/// Multiple check at the decimal precision of the operands
pub fn is_multiple_of(value: f64, divisor: f64) -> bool {
    if divisor == 0.0 {
        return false;
    }
    let quotient = value / divisor;
    if !quotient.is_finite() {
        return false;
    }

    let precision = decimal_places(value).max(decimal_places(divisor));
    let factor = 10f64.powi(precision as i32);
    let scaled_value = (value * factor).round();
    let scaled_divisor = (divisor * factor).round();
    if precision > 15 || !scaled_value.is_finite() || scaled_divisor == 0.0 {
        return quotient.fract() == 0.0;
    }
    scaled_value % scaled_divisor == 0.0
}

/// Digits after the decimal point in the shortest round-trip rendering
fn decimal_places(value: f64) -> usize {
    let rendered = value.to_string();
    match rendered.split_once('.') {
        Some((_, fraction)) => fraction.len(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use crate::JsonSchema;

    fn codes(schema: Value, data: Value) -> Vec<String> {
        JsonSchema::compile(&schema, &CompileOptions::default())
            .unwrap()
            .validate(&data)
            .errors
            .into_iter()
            .map(|error| error.code)
            .collect()
    }

    #[test]
    fn test_is_multiple_of_uses_decimal_precision() {
        assert!(is_multiple_of(0.0075, 0.0001));
        assert!(!is_multiple_of(0.00751, 0.0001));
        assert!(is_multiple_of(4.5, 1.5));
        assert!(!is_multiple_of(35.0, 1.5));
        assert!(is_multiple_of(0.3, 0.1));
        assert!(!is_multiple_of(1e308, 0.123456789));
    }

    #[test]
    fn test_validate_bounds() {
        assert!(codes(json!({ "minimum": 1.1 }), json!(1.1)).is_empty());
        assert_eq!(codes(json!({ "minimum": 1.1 }), json!(0.6)), vec!["minimum-error"]);
        assert_eq!(codes(json!({ "maximum": 3 }), json!(3.5)), vec!["maximum-error"]);
        assert_eq!(
            codes(json!({ "exclusiveMinimum": 1.1 }), json!(1.1)),
            vec!["exclusive-minimum-error"]
        );
        assert!(codes(json!({ "exclusiveMaximum": 3 }), json!(2.9)).is_empty());
        assert!(codes(json!({ "minimum": 1 }), json!("x")).is_empty());
    }

    #[test]
    fn test_draft04_boolean_exclusive_bounds() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "maximum": 3,
            "exclusiveMaximum": true
        });
        assert_eq!(codes(schema.clone(), json!(3)), vec!["exclusive-maximum-error"]);
        assert!(codes(schema, json!(2.9)).is_empty());

        let schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "minimum": 1,
            "exclusiveMinimum": false
        });
        assert!(codes(schema, json!(1)).is_empty());
    }

    #[test]
    fn test_validate_multiple_of() {
        assert!(codes(json!({ "multipleOf": 2 }), json!(10)).is_empty());
        assert_eq!(codes(json!({ "multipleOf": 2 }), json!(7)), vec!["multiple-of-error"]);
        assert!(codes(json!({ "multipleOf": 0.01 }), json!(19.99)).is_empty());
    }
}
