//! Configuration values threaded into compilation and data queries.
//!
//! Nothing here is global: a compiled root keeps its own copy of the
//! [`CompileOptions`] it was built with.

use serde::{Deserialize, Serialize};

/// A versioned set of keyword semantics, ordered by publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "draft-04")]
    Draft04,
    #[serde(rename = "draft-06")]
    Draft06,
    #[serde(rename = "draft-07")]
    Draft07,
    #[serde(rename = "2019-09")]
    Draft2019_09,
    #[serde(rename = "2020-12")]
    Draft2020_12,
}

impl Dialect {
    /// Detect the dialect named by a `$schema` URI.
    ///
    /// Returns `None` for meta-schema URIs that name no known dialect.
    pub fn from_meta_schema(uri: &str) -> Option<Dialect> {
        if uri.contains("draft-04") {
            Some(Dialect::Draft04)
        } else if uri.contains("draft-06") {
            Some(Dialect::Draft06)
        } else if uri.contains("draft-07") {
            Some(Dialect::Draft07)
        } else if uri.contains("2019-09") {
            Some(Dialect::Draft2019_09)
        } else if uri.contains("2020-12") {
            Some(Dialect::Draft2020_12)
        } else {
            None
        }
    }

    /// The canonical meta-schema URI of this dialect
    pub fn meta_schema(&self) -> &'static str {
        match self {
            Dialect::Draft04 => "http://json-schema.org/draft-04/schema#",
            Dialect::Draft06 => "http://json-schema.org/draft-06/schema#",
            Dialect::Draft07 => "http://json-schema.org/draft-07/schema#",
            Dialect::Draft2019_09 => "https://json-schema.org/draft/2019-09/schema",
            Dialect::Draft2020_12 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    /// Drafts 4 to 7 ignore every keyword next to `$ref`
    pub fn ref_overrides_siblings(&self) -> bool {
        matches!(self, Dialect::Draft04 | Dialect::Draft06 | Dialect::Draft07)
    }

    /// The keyword that declares a new scope
    pub fn id_keyword(&self) -> &'static str {
        match self {
            Dialect::Draft04 => "id",
            _ => "$id",
        }
    }
}

/// How `oneOf` treats more than one matching branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OneOfMode {
    /// Exactly one branch must match
    #[default]
    Strict,
    /// The first matching branch wins; with no match the best-scoring branch is used for reduction
    Fuzzy,
}

/// Flags applied to every `pattern` and `patternProperties` expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegexOptions {
    pub unicode: bool,
    pub case_insensitive: bool,
}

impl Default for RegexOptions {
    fn default() -> Self {
        Self {
            unicode: true,
            case_insensitive: false,
        }
    }
}

/// Options for [`crate::JsonSchema::compile`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Force a dialect regardless of `$schema`
    pub dialect: Option<Dialect>,
    /// Dialect used when `$schema` is missing or unknown
    pub default_dialect: Dialect,
    pub one_of: OneOfMode,
    pub regex: RegexOptions,
    pub validate_formats: bool,
    /// Scope of the root when it declares no `$id`
    pub base_uri: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: None,
            default_dialect: Dialect::Draft2020_12,
            one_of: OneOfMode::Strict,
            regex: RegexOptions::default(),
            validate_formats: true,
            base_uri: None,
        }
    }
}

impl CompileOptions {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_one_of(mut self, mode: OneOfMode) -> Self {
        self.one_of = mode;
        self
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Pick the dialect for a root document
    pub fn select_dialect(&self, schema: &serde_json::Value) -> Dialect {
        if let Some(dialect) = self.dialect {
            return dialect;
        }
        schema
            .get("$schema")
            .and_then(serde_json::Value::as_str)
            .and_then(Dialect::from_meta_schema)
            .unwrap_or(self.default_dialect)
    }
}

/// Options for [`crate::JsonSchema::get_data`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetDataOptions {
    /// How often one `$ref` target may be entered along a single branch
    pub recursion_limit: usize,
    /// Also synthesize properties that are not `required`
    pub add_optional_props: bool,
    /// Fall back to `""`, `0`, `false`, `{}`, `[]` when no const, enum or default exists
    pub use_type_defaults: bool,
}

impl Default for GetDataOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 1,
            add_optional_props: false,
            use_type_defaults: true,
        }
    }
}

/// Options for [`crate::JsonSchema::get_node`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetNodeOptions {
    /// Report a pointer that leaves the schema as an error instead of `None`
    pub require_schema: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dialect_from_meta_schema() {
        assert_eq!(
            Dialect::from_meta_schema("http://json-schema.org/draft-04/schema#"),
            Some(Dialect::Draft04)
        );
        assert_eq!(
            Dialect::from_meta_schema("https://json-schema.org/draft/2019-09/schema"),
            Some(Dialect::Draft2019_09)
        );
        assert_eq!(Dialect::from_meta_schema("https://example.com/custom"), None);
    }

    #[test]
    fn test_select_dialect_falls_back_to_default() {
        let options = CompileOptions {
            default_dialect: Dialect::Draft07,
            ..Default::default()
        };
        assert_eq!(options.select_dialect(&json!({})), Dialect::Draft07);
        assert_eq!(
            options.select_dialect(&json!({ "$schema": "https://example.com/unknown" })),
            Dialect::Draft07
        );
        assert_eq!(
            options.select_dialect(&json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema"
            })),
            Dialect::Draft2020_12
        );
    }

    #[test]
    fn test_forced_dialect_wins() {
        let options = CompileOptions::default().with_dialect(Dialect::Draft04);
        let schema = json!({ "$schema": "https://json-schema.org/draft/2020-12/schema" });
        assert_eq!(options.select_dialect(&schema), Dialect::Draft04);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: CompileOptions =
            serde_json::from_value(json!({ "oneOf": "fuzzy", "defaultDialect": "draft-07" }))
                .unwrap();
        assert_eq!(options.one_of, OneOfMode::Fuzzy);
        assert_eq!(options.default_dialect, Dialect::Draft07);
        assert!(options.validate_formats);
        assert!(options.regex.unicode);

        let data: GetDataOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(data.recursion_limit, 1);
    }
}
