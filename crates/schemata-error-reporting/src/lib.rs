//! Error code catalog and message templates for schemata.
//!
//! Validation in `schemata` never formats messages on its own. Every data error
//! carries a kebab-case code (`min-length-error`), a PascalCase name
//! (`MinLengthError`) and a structured `data` object. This crate maps codes to
//! their default message templates and renders a template against that data.
//!
//! Templates use `{{field}}` placeholders, where `field` is a key of the error's
//! `data` object:
//!
//! ```
//! use schemata_error_reporting::render;
//! use serde_json::json;
//!
//! let data = json!({ "pointer": "#/title", "minLength": 3, "length": 1 });
//! let message = render(
//!     "Value `{{pointer}}` should have a minimum length of `{{minLength}}`, but got `{{length}}`",
//!     data.as_object().unwrap(),
//! );
//! assert_eq!(
//!     message,
//!     "Value `#/title` should have a minimum length of `3`, but got `1`"
//! );
//! ```

pub mod catalog;
pub mod template;

pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, default_templates, get_error_info, get_name};
pub use template::render;
