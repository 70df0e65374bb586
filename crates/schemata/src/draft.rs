//! Keyword registries.
//!
//! A [`Draft`] is an ordered list of [`Keyword`] descriptors plus the format
//! validators and message templates of one dialect. Registries are values:
//! `with_keyword`, `with_format` and `with_message` return a new registry and
//! leave the shared built-in one untouched.

use crate::compile::Compiler;
use crate::error::{ErrorKind, JsonError, SchemaError, SchemaResult};
use crate::keywords;
use crate::node::{Node, NodeId, SchemaNode};
use crate::options::Dialect;
use crate::validate::EvalContext;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Compile-time elaboration of a keyword's sub-schemas
pub type ParseFn = fn(&mut Compiler<'_>, NodeId) -> SchemaResult<()>;

/// Applicability test run once per node after parsing
pub type ApplicableFn = fn(&SchemaNode, &Keyword) -> bool;

pub type ValidateFn = fn(&Node, &Value, &str, &mut EvalContext<'_>) -> Vec<JsonError>;

/// Child lookup by property name or item index
pub type ResolveFn = fn(&Node, &str, Option<&Value>) -> Option<Node>;

/// Collapse data-dependent branching; `Ok(None)` leaves the node as is
pub type ReduceFn =
    fn(&Node, &Value, &str, &mut EvalContext<'_>) -> Result<Option<Node>, JsonError>;

/// Validator for a `format` value; non-string data is accepted by convention
pub type FormatFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A keyword descriptor
#[derive(Debug, Clone)]
pub struct Keyword {
    pub id: String,
    pub keyword: String,
    pub parse: Option<ParseFn>,
    pub add_validate: Option<ApplicableFn>,
    pub validate: Option<ValidateFn>,
    pub add_resolve: Option<ApplicableFn>,
    pub resolve: Option<ResolveFn>,
    pub add_reduce: Option<ApplicableFn>,
    pub reduce: Option<ReduceFn>,
}

/// Applicability test used by most keywords: the keyword is present
pub fn has_keyword(node: &SchemaNode, keyword: &Keyword) -> bool {
    node.has_keyword(&keyword.keyword)
}

impl Keyword {
    pub fn new(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            id: keyword.clone(),
            keyword,
            parse: None,
            add_validate: None,
            validate: None,
            add_resolve: None,
            resolve: None,
            add_reduce: None,
            reduce: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parse(mut self, parse: ParseFn) -> Self {
        self.parse = Some(parse);
        self
    }

    pub fn with_validate(mut self, applicable: ApplicableFn, validate: ValidateFn) -> Self {
        self.add_validate = Some(applicable);
        self.validate = Some(validate);
        self
    }

    pub fn with_resolve(mut self, applicable: ApplicableFn, resolve: ResolveFn) -> Self {
        self.add_resolve = Some(applicable);
        self.resolve = Some(resolve);
        self
    }

    pub fn with_reduce(mut self, applicable: ApplicableFn, reduce: ReduceFn) -> Self {
        self.add_reduce = Some(applicable);
        self.reduce = Some(reduce);
        self
    }

    /// Reject descriptors whose runtime hooks lack an applicability test
    fn check(&self) -> SchemaResult<()> {
        let invalid = |message: &str| SchemaError::InvalidKeyword {
            keyword: self.id.clone(),
            message: message.to_string(),
        };
        if self.keyword.is_empty() {
            return Err(invalid("keyword name must not be empty"));
        }
        if self.validate.is_some() && self.add_validate.is_none() {
            return Err(invalid("validate requires addValidate"));
        }
        if self.resolve.is_some() && self.add_resolve.is_none() {
            return Err(invalid("resolve requires addResolve"));
        }
        if self.reduce.is_some() && self.add_reduce.is_none() {
            return Err(invalid("reduce requires addReduce"));
        }
        Ok(())
    }
}

/// Keyword registry of one dialect
#[derive(Clone)]
pub struct Draft {
    dialect: Dialect,
    keywords: Vec<Keyword>,
    formats: HashMap<String, FormatFn>,
    templates: HashMap<String, String>,
}

static DRAFTS: Lazy<HashMap<Dialect, Arc<Draft>>> = Lazy::new(|| {
    [
        Dialect::Draft04,
        Dialect::Draft06,
        Dialect::Draft07,
        Dialect::Draft2019_09,
        Dialect::Draft2020_12,
    ]
    .into_iter()
    .map(|dialect| (dialect, Arc::new(Draft::new(dialect))))
    .collect()
});

impl Draft {
    /// Built-in registry for a dialect
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            keywords: keywords::builtin(dialect),
            formats: keywords::format::builtin_formats(),
            templates: schemata_error_reporting::default_templates(),
        }
    }

    /// Shared built-in registry for a dialect
    pub fn for_dialect(dialect: Dialect) -> Arc<Draft> {
        match DRAFTS.get(&dialect) {
            Some(draft) => Arc::clone(draft),
            None => Arc::new(Draft::new(dialect)),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Descriptor by id
    pub fn keyword(&self, id: &str) -> Option<&Keyword> {
        self.keywords.iter().find(|keyword| keyword.id == id)
    }

    pub fn format(&self, name: &str) -> Option<&FormatFn> {
        self.formats.get(name)
    }

    /// Registry with `keyword` added, replacing a descriptor of the same id
    pub fn with_keyword(&self, keyword: Keyword) -> SchemaResult<Draft> {
        keyword.check()?;
        let mut draft = self.clone();
        match draft.keywords.iter().position(|k| k.id == keyword.id) {
            Some(index) => draft.keywords[index] = keyword,
            None => draft.keywords.push(keyword),
        }
        Ok(draft)
    }

    pub fn without_keyword(&self, id: &str) -> Draft {
        let mut draft = self.clone();
        draft.keywords.retain(|keyword| keyword.id != id);
        draft
    }

    pub fn with_format<F>(&self, name: impl Into<String>, validate: F) -> Draft
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let mut draft = self.clone();
        draft.formats.insert(name.into(), Arc::new(validate));
        draft
    }

    /// Registry with the message template of an error code replaced
    pub fn with_message(&self, code: impl Into<String>, template: impl Into<String>) -> Draft {
        let mut draft = self.clone();
        draft.templates.insert(code.into(), template.into());
        draft
    }

    /// Build a built-in data error from its data fields
    pub fn error(&self, kind: ErrorKind, data: Map<String, Value>) -> JsonError {
        self.custom_error(kind.code(), kind.name(), data)
    }

    /// Build a data error for a custom code; unknown codes render their data as the message
    pub fn custom_error(&self, code: &str, name: &str, data: Map<String, Value>) -> JsonError {
        let message = match self.templates.get(code) {
            Some(template) => schemata_error_reporting::render(template, &data),
            None => Value::Object(data.clone()).to_string(),
        };
        JsonError::new(code, name, message, data)
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<&String> = self.formats.keys().collect();
        formats.sort();
        f.debug_struct("Draft")
            .field("dialect", &self.dialect)
            .field(
                "keywords",
                &self.keywords.iter().map(|k| k.id.as_str()).collect::<Vec<_>>(),
            )
            .field("formats", &formats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_errors(_: &Node, _: &Value, _: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
        Vec::new()
    }

    #[test]
    fn test_builtin_keyword_sets_differ_per_dialect() {
        let draft04 = Draft::for_dialect(Dialect::Draft04);
        let draft2020 = Draft::for_dialect(Dialect::Draft2020_12);

        assert!(draft04.keyword("const").is_none());
        assert!(draft04.keyword("exclusiveMinimum").is_none());
        assert!(draft2020.keyword("const").is_some());
        assert!(draft2020.keyword("$dynamicRef").is_some());
        assert!(draft2020.keyword("additionalItems").is_none());
        assert!(Draft::for_dialect(Dialect::Draft2019_09).keyword("$recursiveRef").is_some());
    }

    #[test]
    fn test_for_dialect_is_shared() {
        let a = Draft::for_dialect(Dialect::Draft07);
        let b = Draft::for_dialect(Dialect::Draft07);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_with_keyword_returns_new_registry() {
        let base = Draft::for_dialect(Dialect::Draft2020_12);
        let custom = base
            .with_keyword(Keyword::new("x-custom").with_validate(has_keyword, no_errors))
            .unwrap();

        assert!(custom.keyword("x-custom").is_some());
        assert!(base.keyword("x-custom").is_none());
    }

    #[test]
    fn test_validate_without_applicability_is_rejected() {
        let mut keyword = Keyword::new("x-broken");
        keyword.validate = Some(no_errors);

        let result = Draft::new(Dialect::Draft07).with_keyword(keyword);
        assert!(matches!(result, Err(SchemaError::InvalidKeyword { .. })));
    }

    #[test]
    fn test_with_message_overrides_template() {
        let draft = Draft::new(Dialect::Draft07).with_message("type-error", "bad type at {{pointer}}");
        let mut data = Map::new();
        data.insert("pointer".to_string(), json!("#/a"));

        let error = draft.error(ErrorKind::Type, data);
        assert_eq!(error.message, "bad type at #/a");
        assert_eq!(error.name, "TypeError");
    }

    #[test]
    fn test_with_format_adds_validator() {
        let draft = Draft::new(Dialect::Draft07).with_format("even", |value| {
            value.as_u64().is_none_or(|n| n % 2 == 0)
        });
        let format = draft.format("even").unwrap();
        assert!(format(&json!(4)));
        assert!(!format(&json!(3)));
    }
}
