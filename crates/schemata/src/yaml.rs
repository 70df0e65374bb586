//! YAML input for schemas and instance data.

use crate::error::SchemaResult;
use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

/// Parse the first document of a YAML string into a JSON value.
///
/// An empty input yields `null`.
pub fn from_str(source: &str) -> SchemaResult<Value> {
    let documents = YamlLoader::load_from_str(source)?;
    Ok(documents.first().map(yaml_to_json_value).unwrap_or(Value::Null))
}

fn yaml_to_json_value(value: &Yaml) -> Value {
    match value {
        Yaml::Null | Yaml::BadValue | Yaml::Alias(_) => Value::Null,
        Yaml::Boolean(b) => Value::Bool(*b),
        Yaml::Integer(n) => Value::Number((*n).into()),
        Yaml::Real(s) => s
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Array(items) => Value::Array(items.iter().map(yaml_to_json_value).collect()),
        Yaml::Hash(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                if let Some(key) = key_string(key) {
                    map.insert(key, yaml_to_json_value(value));
                }
            }
            Value::Object(map)
        }
    }
}

/// Mapping keys become strings; keys without a scalar form are dropped
fn key_string(key: &Yaml) -> Option<String> {
    match key {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(n) => Some(n.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        Yaml::Null => Some("null".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonSchema;
    use crate::options::CompileOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_yaml_schema_round_trip() {
        let schema = from_str(
            r#"
type: object
required: [title]
properties:
  title:
    type: string
  ratio:
    type: number
    maximum: 1.5
"#,
        )
        .unwrap();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": { "type": "string" },
                    "ratio": { "type": "number", "maximum": 1.5 }
                }
            })
        );

        let compiled = JsonSchema::compile(&schema, &CompileOptions::default()).unwrap();
        let data = from_str("title: hello\nratio: 2.0\n").unwrap();
        assert_eq!(compiled.validate(&data).errors[0].code, "maximum-error");
    }

    #[test]
    fn test_yaml_scalars_and_keys() {
        assert_eq!(from_str("").unwrap(), Value::Null);
        assert_eq!(from_str("1: a\ntrue: b\n").unwrap(), json!({ "1": "a", "true": "b" }));
        assert_eq!(from_str("- ~\n- 3\n- x\n").unwrap(), json!([null, 3, "x"]));
    }

    #[test]
    fn test_yaml_syntax_error() {
        assert!(from_str("a: [1, 2").is_err());
    }
}
