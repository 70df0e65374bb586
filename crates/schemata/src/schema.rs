//! The compiled schema facade.

use crate::compile::Compiler;
use crate::data::get_data;
use crate::draft::Draft;
use crate::error::{JsonError, SchemaError, SchemaResult, ValidationReport};
use crate::node::{Node, SchemaRoot};
use crate::options::{CompileOptions, Dialect, GetDataOptions, GetNodeOptions};
use crate::resolve::{RemoteRegistry, Unresolved, locate};
use crate::traverse::{DataNode, get_node, to_data_nodes};
use crate::validate::{EvalContext, validate_node};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Anything [`JsonSchema::compile`] accepts.
///
/// Raw documents are compiled; an already compiled schema is returned as is.
pub trait SchemaSource {
    fn into_schema(self, options: &CompileOptions) -> SchemaResult<JsonSchema>;
}

impl SchemaSource for &Value {
    fn into_schema(self, options: &CompileOptions) -> SchemaResult<JsonSchema> {
        let draft = Draft::for_dialect(options.select_dialect(self));
        JsonSchema::compile_with_draft(self, draft, options)
    }
}

impl SchemaSource for Value {
    fn into_schema(self, options: &CompileOptions) -> SchemaResult<JsonSchema> {
        (&self).into_schema(options)
    }
}

impl SchemaSource for &JsonSchema {
    fn into_schema(self, _: &CompileOptions) -> SchemaResult<JsonSchema> {
        Ok(self.clone())
    }
}

impl SchemaSource for JsonSchema {
    fn into_schema(self, _: &CompileOptions) -> SchemaResult<JsonSchema> {
        Ok(self)
    }
}

/// A compiled schema together with the remote documents it may reference
#[derive(Debug, Clone)]
pub struct JsonSchema {
    root: Arc<SchemaRoot>,
    remotes: RemoteRegistry,
}

impl JsonSchema {
    /// Compile a schema document, selecting the draft from the options or `$schema`
    pub fn compile(source: impl SchemaSource, options: &CompileOptions) -> SchemaResult<Self> {
        source.into_schema(options)
    }

    /// Compile a schema document with an explicit (possibly customized) draft
    pub fn compile_with_draft(
        schema: &Value,
        draft: Arc<Draft>,
        options: &CompileOptions,
    ) -> SchemaResult<Self> {
        let root = Compiler::compile_root(schema, draft, options)?;
        let mut remotes = RemoteRegistry::new();
        let base = root.base_uri().to_string();
        if !base.is_empty() {
            remotes.insert(&base, Arc::clone(&root));
        }
        Ok(Self { root, remotes })
    }

    pub fn root_node(&self) -> Node {
        Node::new(Arc::clone(&self.root), 0)
    }

    /// The raw root document
    pub fn schema(&self) -> &Value {
        self.root.nodes()[0].schema()
    }

    pub fn draft(&self) -> &Arc<Draft> {
        self.root.draft()
    }

    pub fn remotes(&self) -> &RemoteRegistry {
        &self.remotes
    }

    /// Check if both handles share one compiled root
    pub fn is_same_root(&self, other: &JsonSchema) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Compile and register a document that `$ref`s may point into.
    ///
    /// The document uses its own `$schema` dialect when it declares a known
    /// one, and this schema's draft otherwise.
    pub fn add_remote_schema(&mut self, url: &str, schema: &Value) -> SchemaResult<()> {
        let draft = match schema
            .get("$schema")
            .and_then(Value::as_str)
            .and_then(Dialect::from_meta_schema)
        {
            Some(dialect) => Draft::for_dialect(dialect),
            None => Arc::clone(self.root.draft()),
        };
        let options = self.root.options().clone().with_base_uri(url);
        let remote = Compiler::compile_root(schema, draft, &options)?;

        let base = remote.base_uri().to_string();
        if !base.is_empty() && base != url {
            self.remotes.insert(&base, Arc::clone(&remote));
        }
        self.remotes.insert(url, remote);
        debug!(url, remotes = self.remotes.len(), "registered remote schema");
        Ok(())
    }

    /// Validate instance data
    pub fn validate(&self, data: &Value) -> ValidationReport {
        let mut ctx = EvalContext::new(&self.remotes);
        let errors = validate_node(&self.root_node(), data, "#", &mut ctx);
        debug!(errors = errors.len(), "validated data");
        ValidationReport::from_errors(errors)
    }

    pub fn is_valid(&self, data: &Value) -> bool {
        self.validate(data).valid
    }

    /// Complete `data` with the defaults the schema describes
    pub fn get_data(&self, data: Option<&Value>, options: &GetDataOptions) -> Value {
        let mut ctx = EvalContext::lenient(&self.remotes);
        get_data(&self.root_node(), data, options, &mut ctx)
    }

    /// Schema describing the data at `pointer`, `None` when the schema does not reach it
    pub fn get_node(
        &self,
        pointer: &str,
        data: Option<&Value>,
        options: &GetNodeOptions,
    ) -> Result<Option<Node>, JsonError> {
        let mut ctx = EvalContext::lenient(&self.remotes);
        get_node(&self.root_node(), pointer, data, options, &mut ctx)
    }

    /// Every location of `data` paired with the schema describing it
    pub fn to_data_nodes<'d>(&self, data: &'d Value) -> Vec<DataNode<'d>> {
        let mut ctx = EvalContext::lenient(&self.remotes);
        to_data_nodes(&self.root_node(), data, &mut ctx)
    }

    /// Fail on the first reference without a target.
    ///
    /// Validation reports such references as data errors; this check surfaces
    /// them before any data is seen.
    pub fn check_references(&self) -> SchemaResult<()> {
        let draft = self.root.draft();
        for (id, node) in self.root.nodes().iter().enumerate() {
            for keyword in ["$ref", "$dynamicRef", "$recursiveRef"] {
                if draft.keyword(keyword).is_none() {
                    continue;
                }
                let Some(token) = node.keyword(keyword).and_then(Value::as_str) else {
                    continue;
                };
                let handle = Node::new(Arc::clone(&self.root), id);
                match locate(&handle.resolution_root(), &node.scope_id, token, &self.remotes) {
                    Ok(_) => {}
                    Err(Unresolved::Remote(url)) => {
                        return Err(SchemaError::UnresolvableRemote {
                            url,
                            reference: token.to_string(),
                            location: node.evaluation_path.clone(),
                        });
                    }
                    Err(Unresolved::Local) => {
                        return Err(SchemaError::InvalidSchema {
                            location: node.evaluation_path.clone(),
                            message: format!("reference '{token}' has no target"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_compile_is_idempotent() {
        let schema = JsonSchema::compile(&json!({ "type": "string" }), &CompileOptions::default()).unwrap();
        let again = JsonSchema::compile(&schema, &CompileOptions::default()).unwrap();
        assert!(schema.is_same_root(&again));

        let fresh = JsonSchema::compile(json!({ "type": "string" }), &CompileOptions::default()).unwrap();
        assert!(!schema.is_same_root(&fresh));
    }

    #[test]
    fn test_dialect_selection() {
        let schema = JsonSchema::compile(
            &json!({ "$schema": "http://json-schema.org/draft-04/schema#" }),
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(schema.draft().dialect(), Dialect::Draft04);

        let forced = JsonSchema::compile(
            &json!({ "$schema": "http://json-schema.org/draft-04/schema#" }),
            &CompileOptions::default().with_dialect(Dialect::Draft07),
        )
        .unwrap();
        assert_eq!(forced.draft().dialect(), Dialect::Draft07);
    }

    #[test]
    fn test_validation_report_shape() {
        let schema = JsonSchema::compile(
            &json!({ "properties": { "a": { "minimum": 2 } } }),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(schema.is_valid(&json!({ "a": 3 })));

        let report = schema.validate(&json!({ "a": 1 }));
        assert!(!report.valid);
        let error = serde_json::to_value(&report.errors[0]).unwrap();
        assert_eq!(error["type"], json!("error"));
        assert_eq!(error["code"], json!("minimum-error"));
        assert_eq!(error["data"]["pointer"], json!("#/a"));
        assert_eq!(error["data"]["value"], json!(1));
        assert_eq!(error["data"]["schema"], json!({ "minimum": 2 }));
    }

    #[test]
    fn test_remote_schema_resolution() {
        let mut schema = JsonSchema::compile(
            &json!({ "properties": { "name": { "$ref": "http://example.com/defs.json#/$defs/name" } } }),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            schema.check_references(),
            Err(SchemaError::UnresolvableRemote { .. })
        ));

        schema
            .add_remote_schema(
                "http://example.com/defs.json",
                &json!({ "$defs": { "name": { "type": "string", "minLength": 1 } } }),
            )
            .unwrap();
        schema.check_references().unwrap();
        assert!(schema.is_valid(&json!({ "name": "x" })));
        assert_eq!(schema.validate(&json!({ "name": "" })).errors[0].code, "min-length-error");
    }

    #[test]
    fn test_check_references_reports_missing_local_target() {
        let schema = JsonSchema::compile(
            &json!({ "properties": { "a": { "$ref": "#/$defs/nothing" } } }),
            &CompileOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            schema.check_references(),
            Err(SchemaError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_invalid_pattern_fails_compilation() {
        let error = JsonSchema::compile(&json!({ "pattern": "(" }), &CompileOptions::default()).unwrap_err();
        assert!(matches!(error, SchemaError::InvalidRegex { .. }));
    }
}
