// Error types for schema compilation and validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors raised while compiling or configuring schemas.
///
/// These are caller contract violations (broken schema documents, malformed
/// keyword registrations, bad options). Instance data that fails validation is
/// never reported through this type; see [`JsonError`].
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A keyword descriptor that cannot be registered
    #[error("Invalid keyword registration '{keyword}': {message}")]
    InvalidKeyword { keyword: String, message: String },

    /// A schema-valued location that holds something other than an object or boolean
    #[error("Invalid schema structure at {location}: {message}")]
    InvalidSchema { location: String, message: String },

    /// A `pattern` or `patternProperties` expression that does not compile
    #[error("Invalid regex pattern '{pattern}' at {location}: {source}")]
    InvalidRegex {
        pattern: String,
        location: String,
        #[source]
        source: regex::Error,
    },

    /// A `$ref` pointing into a document that was never registered
    #[error("Unresolvable remote schema '{url}' referenced by '{reference}' at {location}")]
    UnresolvableRemote {
        url: String,
        reference: String,
        location: String,
    },

    /// Compile options that contradict each other
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] yaml_rust2::ScanError),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for compilation and configuration
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Built-in data error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AdditionalItems,
    AnyOf,
    Const,
    Contains,
    ContainsMax,
    ContainsMin,
    Enum,
    ExclusiveMaximum,
    ExclusiveMinimum,
    FalseSchema,
    Format,
    InvalidPropertyName,
    InvalidSchema,
    MaxItems,
    MaxLength,
    MaxProperties,
    Maximum,
    MinItems,
    MinLength,
    MinProperties,
    Minimum,
    MissingDependency,
    MultipleOf,
    MultipleOneOf,
    NoAdditionalProperties,
    Not,
    OneOf,
    Pattern,
    Required,
    Type,
    UnevaluatedItems,
    UnevaluatedProperty,
    UniqueItems,
    UnknownProperty,
    UnresolvableRef,
    UnresolvableRemote,
}

impl ErrorKind {
    /// Kebab-case error code, the key into the message catalog
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::AdditionalItems => "additional-items-error",
            ErrorKind::AnyOf => "any-of-error",
            ErrorKind::Const => "const-error",
            ErrorKind::Contains => "contains-error",
            ErrorKind::ContainsMax => "contains-max-error",
            ErrorKind::ContainsMin => "contains-min-error",
            ErrorKind::Enum => "enum-error",
            ErrorKind::ExclusiveMaximum => "exclusive-maximum-error",
            ErrorKind::ExclusiveMinimum => "exclusive-minimum-error",
            ErrorKind::FalseSchema => "false-schema-error",
            ErrorKind::Format => "format-error",
            ErrorKind::InvalidPropertyName => "invalid-property-name-error",
            ErrorKind::InvalidSchema => "invalid-schema-error",
            ErrorKind::MaxItems => "max-items-error",
            ErrorKind::MaxLength => "max-length-error",
            ErrorKind::MaxProperties => "max-properties-error",
            ErrorKind::Maximum => "maximum-error",
            ErrorKind::MinItems => "min-items-error",
            ErrorKind::MinLength => "min-length-error",
            ErrorKind::MinProperties => "min-properties-error",
            ErrorKind::Minimum => "minimum-error",
            ErrorKind::MissingDependency => "missing-dependency-error",
            ErrorKind::MultipleOf => "multiple-of-error",
            ErrorKind::MultipleOneOf => "multiple-one-of-error",
            ErrorKind::NoAdditionalProperties => "no-additional-properties-error",
            ErrorKind::Not => "not-error",
            ErrorKind::OneOf => "one-of-error",
            ErrorKind::Pattern => "pattern-error",
            ErrorKind::Required => "required-property-error",
            ErrorKind::Type => "type-error",
            ErrorKind::UnevaluatedItems => "unevaluated-items-error",
            ErrorKind::UnevaluatedProperty => "unevaluated-property-error",
            ErrorKind::UniqueItems => "unique-items-error",
            ErrorKind::UnknownProperty => "unknown-property-error",
            ErrorKind::UnresolvableRef => "unresolvable-ref-error",
            ErrorKind::UnresolvableRemote => "unresolvable-remote-error",
        }
    }

    /// PascalCase error name
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::AdditionalItems => "AdditionalItemsError",
            ErrorKind::AnyOf => "AnyOfError",
            ErrorKind::Const => "ConstError",
            ErrorKind::Contains => "ContainsError",
            ErrorKind::ContainsMax => "ContainsMaxError",
            ErrorKind::ContainsMin => "ContainsMinError",
            ErrorKind::Enum => "EnumError",
            ErrorKind::ExclusiveMaximum => "ExclusiveMaximumError",
            ErrorKind::ExclusiveMinimum => "ExclusiveMinimumError",
            ErrorKind::FalseSchema => "FalseSchemaError",
            ErrorKind::Format => "FormatError",
            ErrorKind::InvalidPropertyName => "InvalidPropertyNameError",
            ErrorKind::InvalidSchema => "InvalidSchemaError",
            ErrorKind::MaxItems => "MaxItemsError",
            ErrorKind::MaxLength => "MaxLengthError",
            ErrorKind::MaxProperties => "MaxPropertiesError",
            ErrorKind::Maximum => "MaximumError",
            ErrorKind::MinItems => "MinItemsError",
            ErrorKind::MinLength => "MinLengthError",
            ErrorKind::MinProperties => "MinPropertiesError",
            ErrorKind::Minimum => "MinimumError",
            ErrorKind::MissingDependency => "MissingDependencyError",
            ErrorKind::MultipleOf => "MultipleOfError",
            ErrorKind::MultipleOneOf => "MultipleOneOfError",
            ErrorKind::NoAdditionalProperties => "NoAdditionalPropertiesError",
            ErrorKind::Not => "NotError",
            ErrorKind::OneOf => "OneOfError",
            ErrorKind::Pattern => "PatternError",
            ErrorKind::Required => "RequiredPropertyError",
            ErrorKind::Type => "TypeError",
            ErrorKind::UnevaluatedItems => "UnevaluatedItemsError",
            ErrorKind::UnevaluatedProperty => "UnevaluatedPropertyError",
            ErrorKind::UniqueItems => "UniqueItemsError",
            ErrorKind::UnknownProperty => "UnknownPropertyError",
            ErrorKind::UnresolvableRef => "UnresolvableRefError",
            ErrorKind::UnresolvableRemote => "UnresolvableRemoteError",
        }
    }
}

/// A data error: the instance does not conform to the schema.
///
/// Serializes to
/// `{ "type": "error", "code", "name", "message", "data": { "pointer", "schema", "value", ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub name: String,
    pub message: String,
    pub data: Map<String, Value>,
}

impl JsonError {
    /// Create an error record from its parts.
    ///
    /// Custom keywords use this directly; built-in keywords go through
    /// [`crate::Draft::error`] so their messages come from the draft's templates.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            error_type: "error".to_string(),
            code: code.into(),
            name: name.into(),
            message: message.into(),
            data,
        }
    }

    /// Data pointer of the failing value (e.g. `#/items/2`)
    pub fn pointer(&self) -> &str {
        self.data
            .get("pointer")
            .and_then(Value::as_str)
            .unwrap_or("#")
    }

    /// The failing value
    pub fn value(&self) -> Option<&Value> {
        self.data.get("value")
    }

    /// The schema fragment whose keyword failed
    pub fn schema(&self) -> Option<&Value> {
        self.data.get("schema")
    }

    /// Check if this error has the given built-in kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.code == kind.code()
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for JsonError {}

/// Outcome of validating one instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<JsonError>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<JsonError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_codes_match_catalog() {
        let kinds = [
            ErrorKind::Type,
            ErrorKind::OneOf,
            ErrorKind::MultipleOneOf,
            ErrorKind::UnevaluatedProperty,
            ErrorKind::UnresolvableRemote,
            ErrorKind::FalseSchema,
        ];
        for kind in kinds {
            assert_eq!(
                schemata_error_reporting::get_name(kind.code()),
                Some(kind.name()),
                "{:?}",
                kind
            );
        }
    }

    #[test]
    fn test_json_error_shape() {
        let mut data = Map::new();
        data.insert("pointer".to_string(), json!("#/a"));
        data.insert("value".to_string(), json!(3));
        let error = JsonError::new("minimum-error", "MinimumError", "too small", data);

        let serialized = serde_json::to_value(&error).unwrap();
        assert_eq!(serialized["type"], "error");
        assert_eq!(serialized["code"], "minimum-error");
        assert_eq!(serialized["data"]["pointer"], "#/a");
        assert_eq!(error.pointer(), "#/a");
        assert!(error.is(ErrorKind::Minimum));
    }

    #[test]
    fn test_report_validity_follows_errors() {
        assert!(ValidationReport::from_errors(Vec::new()).valid);
        let error = JsonError::new("x-error", "XError", "x", Map::new());
        assert!(!ValidationReport::from_errors(vec![error]).valid);
    }
}
