//! Placeholder substitution for message templates.

use serde_json::{Map, Value};

/// Render `template`, replacing each `{{field}}` with `data[field]`.
///
/// Strings are inserted without quotes, every other value as compact JSON.
/// Unknown placeholders are left untouched so a broken template stays visible.
pub fn render(template: &str, data: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let field = after[..end].trim();
        match data.get(field) {
            Some(Value::String(s)) => out.push_str(s),
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_render_strings_and_values() {
        let rendered = render(
            "Expected `{{value}}` in `{{pointer}}` to be of type `{{expected}}`",
            &data(json!({ "value": 12, "pointer": "#/a", "expected": ["string", "null"] })),
        );
        assert_snapshot!(rendered, @r#"Expected `12` in `#/a` to be of type `["string","null"]`"#);
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        let rendered = render("at {{pointer}}: {{missing}}", &data(json!({ "pointer": "#" })));
        assert_eq!(rendered, "at #: {{missing}}");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let rendered = render("broken {{pointer", &data(json!({ "pointer": "#" })));
        assert_eq!(rendered, "broken {{pointer");
    }
}
