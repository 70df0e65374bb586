// unevaluatedProperties and unevaluatedItems

use super::parse_schema;
use crate::draft::{Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError};
use crate::evaluated::{is_item_evaluated, is_property_evaluated};
use crate::node::Node;
use crate::scope::join_pointer;
use crate::validate::{EvalContext, validate_node};
use serde_json::{Value, json};

pub fn unevaluated_properties() -> Keyword {
    Keyword::new("unevaluatedProperties")
        .with_parse(|compiler, id| {
            let child = parse_schema(compiler, id, "unevaluatedProperties")?;
            compiler.children_mut(id).unevaluated_properties = child;
            Ok(())
        })
        .with_validate(has_keyword, validate_unevaluated_properties)
}

pub fn unevaluated_items() -> Keyword {
    Keyword::new("unevaluatedItems")
        .with_parse(|compiler, id| {
            let child = parse_schema(compiler, id, "unevaluatedItems")?;
            compiler.children_mut(id).unevaluated_items = child;
            Ok(())
        })
        .with_validate(has_keyword, validate_unevaluated_items)
}

fn validate_unevaluated_properties(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Value::Object(map), Some(child)) = (data, node.children().unevaluated_properties) else {
        return Vec::new();
    };
    let child = node.child(child);
    let mut errors = Vec::new();
    for (name, value) in map {
        if is_property_evaluated(node, data, name, pointer, ctx) {
            continue;
        }
        if child.is_false_schema() {
            errors.push(node.error(
                ErrorKind::UnevaluatedProperty,
                pointer,
                value,
                json!({ "property": name }),
            ));
        } else {
            errors.extend(validate_node(&child, value, &join_pointer(pointer, name), ctx));
        }
    }
    errors
}

fn validate_unevaluated_items(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    let (Value::Array(items), Some(child)) = (data, node.children().unevaluated_items) else {
        return Vec::new();
    };
    let child = node.child(child);
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if is_item_evaluated(node, data, index, pointer, ctx) {
            continue;
        }
        if child.is_false_schema() {
            errors.push(node.error(
                ErrorKind::UnevaluatedItems,
                pointer,
                item,
                json!({ "key": index }),
            ));
        } else {
            errors.extend(validate_node(
                &child,
                item,
                &join_pointer(pointer, &index.to_string()),
                ctx,
            ));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use crate::JsonSchema;
    use crate::options::CompileOptions;
    use insta::assert_snapshot;
    use serde_json::{Value, json};

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
    fn test_all_of_with_unevaluated_properties() {
        let schema = json!({
            "allOf": [{ "properties": { "foo": { "type": "string" } } }],
            "unevaluatedProperties": false
        });
        assert!(codes(schema.clone(), json!({ "foo": "x" })).is_empty());
        assert_eq!(
            codes(schema, json!({ "foo": "x", "bar": 1 })),
            vec!["unevaluated-property-error"]
        );
    }

    #[test]
    fn test_unevaluated_property_message() {
        let report = JsonSchema::compile(
            &json!({ "properties": { "a": true }, "unevaluatedProperties": false }),
            &CompileOptions::default(),
        )
        .unwrap()
        .validate(&json!({ "a": 1, "b": 2 }));
        assert_snapshot!(report.errors[0].message, @"Invalid unevaluated property `b` in `#`");
    }

    #[test]
    fn test_unevaluated_properties_schema() {
        let schema = json!({
            "properties": { "a": true },
            "unevaluatedProperties": { "type": "number" }
        });
        assert!(codes(schema.clone(), json!({ "a": "x", "b": 1 })).is_empty());
        assert_eq!(codes(schema, json!({ "b": "x" })), vec!["type-error"]);
    }

    #[test]
    fn test_unevaluated_items() {
        let schema = json!({
            "prefixItems": [{ "type": "string" }],
            "anyOf": [{ "prefixItems": [true, { "type": "number" }] }],
            "unevaluatedItems": false
        });
        assert!(codes(schema.clone(), json!(["a", 1])).is_empty());
        assert_eq!(codes(schema, json!(["a", 1, null])), vec!["unevaluated-items-error"]);
    }
}
