//! Error code catalog and lookup.
//!
//! Maps error codes (like `"min-length-error"`) to their metadata: the
//! PascalCase error name, the keyword that raises it and the default message
//! template.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// PascalCase error name (e.g., "MinLengthError")
    pub name: String,

    /// Keyword that produces this error (e.g., "minLength")
    pub keyword: String,

    /// Default message template with `{{field}}` placeholders
    pub message_template: String,
}

/// Global error catalog, embedded at compile time and parsed on first access.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid. This can only happen if
/// `error_catalog.json` is edited into an invalid state.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug in schemata")
});

/// Look up error code information.
///
/// Returns `None` if the error code is not found in the catalog.
///
/// ```
/// use schemata_error_reporting::get_error_info;
///
/// let info = get_error_info("type-error").unwrap();
/// assert_eq!(info.name, "TypeError");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the PascalCase name registered for an error code.
pub fn get_name(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.name.as_str())
}

/// Copy of every default template, keyed by error code.
///
/// Keyword registries start from this table and may override single entries
/// without touching the shared catalog.
pub fn default_templates() -> HashMap<String, String> {
    ERROR_CATALOG
        .iter()
        .map(|(code, info)| (code.clone(), info.message_template.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_codes_are_kebab_case_and_names_pascal_case() {
        for (code, info) in ERROR_CATALOG.iter() {
            assert!(code.ends_with("-error"), "{code}");
            assert!(
                code.chars().all(|c| c.is_ascii_lowercase() || c == '-'),
                "{code}"
            );
            assert!(info.name.ends_with("Error"), "{}", info.name);
            assert!(info.name.chars().next().unwrap().is_ascii_uppercase());
        }
    }

    #[test]
    fn test_one_of_errors_exist() {
        assert_eq!(get_name("one-of-error"), Some("OneOfError"));
        assert_eq!(get_name("multiple-one-of-error"), Some("MultipleOneOfError"));
    }

    #[test]
    fn test_nonexistent_code() {
        assert!(get_error_info("no-such-error").is_none());
        assert!(get_name("no-such-error").is_none());
    }

    #[test]
    fn test_default_templates_cover_catalog() {
        let templates = default_templates();
        assert_eq!(templates.len(), ERROR_CATALOG.len());
        assert!(templates["required-property-error"].contains("{{key}}"));
    }
}
