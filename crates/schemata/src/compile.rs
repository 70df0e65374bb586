//! Schema compilation.
//!
//! One pass over the raw document: every schema-valued location becomes a
//! [`SchemaNode`] with an evaluation path and a scope id, identifiers and
//! anchors are registered, and each present keyword's parse hook elaborates
//! its sub-schemas. Local `$ref` pointers whose target is not a keyword
//! location are compiled in a second pass so they resolve like any other node.

use crate::draft::Draft;
use crate::error::{SchemaError, SchemaResult};
use crate::keywords::json_type_name;
use crate::node::{Children, Node, NodeId, SchemaNode, SchemaRoot, ScopeContext};
use crate::options::{CompileOptions, Dialect, RegexOptions};
use crate::scope::{anchor_key, decode_fragment, join_pointer, join_scope, split_scope, strip_fragment};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Compilation state handed to keyword parse hooks
pub struct Compiler<'a> {
    draft: &'a Draft,
    options: &'a CompileOptions,
    document: Arc<Value>,
    nodes: Vec<SchemaNode>,
    scope: ScopeContext,
    references: Vec<(NodeId, String)>,
}

impl<'a> Compiler<'a> {
    fn new(draft: &'a Draft, options: &'a CompileOptions, document: Value) -> Self {
        Self {
            draft,
            options,
            document: Arc::new(document),
            nodes: Vec::new(),
            scope: ScopeContext::default(),
            references: Vec::new(),
        }
    }

    /// Compile a whole document into a new root
    pub(crate) fn compile_root(
        schema: &Value,
        draft: Arc<Draft>,
        options: &CompileOptions,
    ) -> SchemaResult<Arc<SchemaRoot>> {
        let mut compiler = Compiler::new(&draft, options, schema.clone());
        let base = options.base_uri.as_deref().unwrap_or("#");
        let root = compiler.compile_node(schema, "#".to_string(), String::new(), base)?;

        let base_uri = strip_fragment(&compiler.nodes[root].scope_id).to_string();
        if !base_uri.is_empty() {
            compiler.scope.ids.entry(base_uri).or_insert_with(|| "#".to_string());
        }
        compiler.compile_references()?;

        debug!(
            dialect = ?draft.dialect(),
            nodes = compiler.nodes.len(),
            ids = compiler.scope.ids.len(),
            anchors = compiler.scope.anchors.len(),
            "compiled schema"
        );
        let options = options.clone();
        Ok(Arc::new(compiler.finish(Arc::clone(&draft), options, None)))
    }

    /// Compile a merged schema in place of `origin`.
    ///
    /// The new root keeps `origin`'s draft and options, and resolves its
    /// references through the root `origin` belongs to.
    pub(crate) fn derive(origin: &Node, schema: &Value) -> SchemaResult<Node> {
        let draft = Arc::clone(origin.draft());
        let options = origin.options().clone();
        let mut compiler = Compiler::new(&draft, &options, schema.clone());
        let id = compiler.compile_node(
            schema,
            origin.evaluation_path().to_string(),
            String::new(),
            origin.scope_id(),
        )?;
        let root = compiler.finish(Arc::clone(&draft), options.clone(), Some(origin.resolution_root()));
        Ok(Node::new(Arc::new(root), id))
    }

    fn finish(
        self,
        draft: Arc<Draft>,
        options: CompileOptions,
        origin: Option<Arc<SchemaRoot>>,
    ) -> SchemaRoot {
        SchemaRoot {
            nodes: self.nodes,
            scope: self.scope,
            draft,
            options,
            origin,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.draft.dialect()
    }

    pub fn options(&self) -> &CompileOptions {
        self.options
    }

    /// Copy of a keyword value of a compiled node
    pub fn keyword(&self, id: NodeId, name: &str) -> Option<Value> {
        self.nodes[id].keyword(name).cloned()
    }

    pub fn children_mut(&mut self, id: NodeId) -> &mut Children {
        &mut self.nodes[id].children
    }

    pub fn set_pattern(&mut self, id: NodeId, pattern: Regex) {
        self.nodes[id].pattern = Some(pattern);
    }

    /// Record a reference token for the second compilation pass
    pub fn note_reference(&mut self, id: NodeId, token: &str) {
        self.references.push((id, token.to_string()));
    }

    /// Compile a regular expression with the configured flags
    pub fn regex(&self, pattern: &str, id: NodeId) -> SchemaResult<Regex> {
        build_regex(pattern, &self.options.regex).map_err(|source| SchemaError::InvalidRegex {
            pattern: pattern.to_string(),
            location: self.nodes[id].evaluation_path.clone(),
            source,
        })
    }

    /// Compile a sub-schema found at `segments` below `parent`
    pub fn compile_child(
        &mut self,
        parent: NodeId,
        segments: &[&str],
        schema: &Value,
    ) -> SchemaResult<NodeId> {
        let parent = &self.nodes[parent];
        let path = segments
            .iter()
            .fold(parent.evaluation_path.clone(), |path, segment| {
                join_pointer(&path, segment)
            });
        let location = segments
            .iter()
            .fold(parent.location.clone(), |location, segment| {
                join_pointer(&location, segment)
            });
        let scope = parent.scope_id.clone();
        self.compile_node(schema, path, location, &scope)
    }

    fn compile_node(
        &mut self,
        schema: &Value,
        evaluation_path: String,
        location: String,
        parent_scope: &str,
    ) -> SchemaResult<NodeId> {
        if let Some(id) = self.scope.node_at(&evaluation_path) {
            return Ok(id);
        }

        let object = match schema {
            Value::Bool(_) => None,
            Value::Object(map) => Some(map),
            other => {
                return Err(SchemaError::InvalidSchema {
                    location: evaluation_path,
                    message: format!("expected an object or boolean, found {}", json_type_name(other)),
                });
            }
        };

        let dialect = self.draft.dialect();
        let declared_id = object.and_then(|map| {
            if dialect.ref_overrides_siblings() && map.contains_key("$ref") {
                return None;
            }
            map.get(dialect.id_keyword()).and_then(Value::as_str)
        });
        let scope_id = join_scope(Some(parent_scope), declared_id);

        let id = self.nodes.len();
        self.nodes.push(SchemaNode::new(
            evaluation_path.clone(),
            Arc::clone(&self.document),
            location,
            scope_id.clone(),
        ));
        self.scope.paths.insert(evaluation_path.clone(), id);

        if let Some(map) = object {
            self.register_identifiers(map, declared_id, &scope_id, &evaluation_path);

            let draft = self.draft;
            for keyword in draft.keywords() {
                if let Some(parse) = keyword.parse
                    && map.contains_key(&keyword.keyword)
                {
                    parse(self, id)?;
                }
            }
            self.assign_keywords(id);
        }
        Ok(id)
    }

    fn register_identifiers(
        &mut self,
        map: &Map<String, Value>,
        declared_id: Option<&str>,
        scope_id: &str,
        evaluation_path: &str,
    ) {
        if let Some(token) = declared_id {
            if token.starts_with('#') {
                trace!(anchor = scope_id, path = evaluation_path, "registered fragment id");
                self.scope
                    .anchors
                    .insert(scope_id.to_string(), evaluation_path.to_string());
            } else {
                trace!(id = scope_id, path = evaluation_path, "registered id");
                self.scope
                    .ids
                    .insert(strip_fragment(scope_id).to_string(), evaluation_path.to_string());
            }
        }

        if let Some(name) = map.get("$anchor").and_then(Value::as_str) {
            trace!(anchor = name, path = evaluation_path, "registered anchor");
            self.scope
                .anchors
                .insert(anchor_key(scope_id, name), evaluation_path.to_string());
        }
        if let Some(name) = map.get("$dynamicAnchor").and_then(Value::as_str) {
            trace!(anchor = name, path = evaluation_path, "registered dynamic anchor");
            let key = anchor_key(scope_id, name);
            self.scope
                .anchors
                .entry(key.clone())
                .or_insert_with(|| evaluation_path.to_string());
            self.scope
                .dynamic_anchors
                .insert(key, evaluation_path.to_string());
        }
        if map.get("$recursiveAnchor") == Some(&Value::Bool(true)) {
            self.scope
                .dynamic_anchors
                .insert(anchor_key(scope_id, ""), evaluation_path.to_string());
        }
    }

    /// Cache which keywords apply to a node
    fn assign_keywords(&mut self, id: NodeId) {
        let draft = self.draft;
        let keywords = draft.keywords();
        let node = &self.nodes[id];
        let mut validators = Vec::new();
        let mut resolvers = Vec::new();
        let mut reducers = Vec::new();

        for (index, keyword) in keywords.iter().enumerate() {
            if keyword.validate.is_some() && keyword.add_validate.is_some_and(|f| f(node, keyword)) {
                validators.push(index);
            }
            if keyword.resolve.is_some() && keyword.add_resolve.is_some_and(|f| f(node, keyword)) {
                resolvers.push(index);
            }
            if keyword.reduce.is_some() && keyword.add_reduce.is_some_and(|f| f(node, keyword)) {
                reducers.push(index);
            }
        }

        if draft.dialect().ref_overrides_siblings() && node.has_keyword("$ref") {
            validators.retain(|&index| keywords[index].keyword == "$ref");
            reducers.retain(|&index| keywords[index].keyword == "$ref");
        }

        let node = &mut self.nodes[id];
        node.validators = validators;
        node.resolvers = resolvers;
        node.reducers = reducers;
    }

    /// Compile local pointer targets that no keyword location covered
    fn compile_references(&mut self) -> SchemaResult<()> {
        let root_base = strip_fragment(&self.nodes[0].scope_id).to_string();

        while let Some((id, token)) = self.references.pop() {
            let full = join_scope(Some(&self.nodes[id].scope_id), Some(&token));
            let (base, Some(fragment)) = split_scope(&full) else {
                continue;
            };
            if !fragment.starts_with('/') {
                continue;
            }

            let resource = if base.is_empty() || base == root_base {
                "#".to_string()
            } else {
                match self.scope.ids.get(base) {
                    Some(path) => path.clone(),
                    None => continue,
                }
            };
            let pointer = decode_fragment(fragment);
            let target_path = format!("{resource}{pointer}");
            if self.scope.paths.contains_key(&target_path) {
                continue;
            }

            let Some(resource_id) = self.scope.node_at(&resource) else {
                continue;
            };
            let resource_node = &self.nodes[resource_id];
            let Some(target) = resource_node.schema().pointer(&pointer).cloned() else {
                continue;
            };
            if !(target.is_object() || target.is_boolean()) {
                continue;
            }

            trace!(reference = %token, path = %target_path, "compiling reference target");
            let location = format!("{}{}", resource_node.location, pointer);
            let scope = resource_node.scope_id.clone();
            self.compile_node(&target, target_path, location, &scope)?;
        }
        Ok(())
    }
}

pub(crate) fn build_regex(pattern: &str, options: &RegexOptions) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .unicode(options.unicode)
        .case_insensitive(options.case_insensitive)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(schema: Value) -> Arc<SchemaRoot> {
        let options = CompileOptions::default();
        let draft = Draft::for_dialect(options.select_dialect(&schema));
        Compiler::compile_root(&schema, draft, &options).unwrap()
    }

    #[test]
    fn test_compile_assigns_evaluation_paths() {
        let root = compile(json!({
            "properties": {
                "a/b": { "oneOf": [{ "type": "string" }, true] }
            }
        }));

        assert!(root.scope().node_at("#").is_some());
        assert!(root.scope().node_at("#/properties/a~1b").is_some());
        assert!(root.scope().node_at("#/properties/a~1b/oneOf/1").is_some());
        let branch = root.scope().node_at("#/properties/a~1b/oneOf/1").unwrap();
        assert_eq!(root.nodes()[branch].schema(), &json!(true));
        assert_eq!(root.nodes()[branch].location, "/properties/a~1b/oneOf/1");
    }

    #[test]
    fn test_compile_registers_ids_and_anchors() {
        let root = compile(json!({
            "$id": "http://example.com/root.json",
            "$defs": {
                "a": { "$id": "nested/a.json", "$anchor": "alpha" },
                "b": { "$dynamicAnchor": "meta" }
            }
        }));
        let scope = root.scope();

        assert_eq!(scope.ids["http://example.com/root.json"], "#");
        assert_eq!(scope.ids["http://example.com/nested/a.json"], "#/$defs/a");
        assert_eq!(scope.anchors["http://example.com/nested/a.json#alpha"], "#/$defs/a");
        assert_eq!(scope.dynamic_anchors["http://example.com/root.json#meta"], "#/$defs/b");
        assert_eq!(root.base_uri(), "http://example.com/root.json");
    }

    #[test]
    fn test_ref_hides_sibling_id_in_draft07() {
        let root = compile(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {
                "a": { "$id": "http://example.com/a.json", "$ref": "#/definitions/b" },
                "b": { "type": "integer" }
            }
        }));
        assert!(!root.scope().ids.contains_key("http://example.com/a.json"));
    }

    #[test]
    fn test_non_schema_location_is_rejected() {
        let options = CompileOptions::default();
        let result = Compiler::compile_root(
            &json!({ "properties": { "a": 12 } }),
            Draft::for_dialect(Dialect::Draft2020_12),
            &options,
        );
        match result {
            Err(SchemaError::InvalidSchema { location, .. }) => {
                assert_eq!(location, "#/properties/a")
            }
            other => panic!("expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let options = CompileOptions::default();
        let result = Compiler::compile_root(
            &json!({ "pattern": "(unclosed" }),
            Draft::for_dialect(Dialect::Draft2020_12),
            &options,
        );
        assert!(matches!(result, Err(SchemaError::InvalidRegex { .. })));
    }

    #[test]
    fn test_pointer_reference_targets_are_compiled() {
        let root = compile(json!({
            "$ref": "#/x-extra/item",
            "x-extra": { "item": { "type": "string" } }
        }));
        assert!(root.scope().node_at("#/x-extra/item").is_some());
    }

    #[test]
    fn test_ref_suppresses_sibling_validators_in_draft04() {
        let root = compile(json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "$ref": "#/definitions/a",
            "maxLength": 2,
            "definitions": { "a": {} }
        }));
        let node = &root.nodes()[0];
        let names: Vec<&str> = node
            .validators
            .iter()
            .map(|&index| root.draft().keywords()[index].keyword.as_str())
            .collect();
        assert_eq!(names, vec!["$ref"]);
    }
}
