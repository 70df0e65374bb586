//! Reference resolution.
//!
//! Static references are answered from the scope tables of the referencing
//! node's document, falling back to the remote registry for other documents.
//! `$dynamicRef` and `$recursiveRef` additionally consult the validation path
//! of the running call.

use crate::error::{ErrorKind, JsonError};
use crate::node::{Node, SchemaRoot};
use crate::scope::{anchor_key, decode_fragment, join_scope, split_scope};
use crate::validate::EvalContext;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Compiled documents addressable by absolute scope
#[derive(Debug, Clone, Default)]
pub struct RemoteRegistry {
    roots: HashMap<String, Arc<SchemaRoot>>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled root under `url` (a trailing `#` is ignored)
    pub fn insert(&mut self, url: &str, root: Arc<SchemaRoot>) {
        self.roots.insert(join_scope(Some(url), None), root);
    }

    pub fn get(&self, url: &str) -> Option<&Arc<SchemaRoot>> {
        self.roots.get(&join_scope(Some(url), None))
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Root registered under `base`, or a root declaring `base` as an embedded id
    pub(crate) fn find(&self, base: &str) -> Option<Arc<SchemaRoot>> {
        if let Some(root) = self.roots.get(base) {
            return Some(Arc::clone(root));
        }
        self.roots
            .values()
            .find(|root| root.scope().ids.contains_key(base))
            .cloned()
    }
}

/// Why a reference has no target
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Unresolved {
    /// The document is known but holds nothing at the fragment
    Local,
    /// No document is registered for this base
    Remote(String),
}

/// Look up an absolute scope inside one root
pub(crate) fn lookup(root: &Arc<SchemaRoot>, full: &str) -> Option<Node> {
    let scope = root.scope();
    if let Some(path) = scope.ids.get(full).or_else(|| scope.anchors.get(full)) {
        return Node::at_path(root, path);
    }

    let (base, fragment) = split_scope(full);
    let resource = if base.is_empty() || base == root.base_uri() {
        "#"
    } else {
        scope.ids.get(base)?.as_str()
    };
    match fragment {
        None | Some("") => Node::at_path(root, resource),
        Some(pointer) if pointer.starts_with('/') => {
            Node::at_path(root, &format!("{}{}", resource, decode_fragment(pointer)))
        }
        Some(name) => scope
            .anchors
            .get(&anchor_key(base, name))
            .and_then(|path| Node::at_path(root, path)),
    }
}

/// Locate the target of `token` written at a node with scope `scope_id`
pub(crate) fn locate(
    root: &Arc<SchemaRoot>,
    scope_id: &str,
    token: &str,
    remotes: &RemoteRegistry,
) -> Result<Node, Unresolved> {
    let full = join_scope(Some(scope_id), Some(token));
    if let Some(node) = lookup(root, &full) {
        return Ok(node);
    }

    let (base, _) = split_scope(&full);
    let known_locally =
        base.is_empty() || base == root.base_uri() || root.scope().ids.contains_key(base);
    if known_locally {
        return Err(Unresolved::Local);
    }
    match remotes.find(base) {
        Some(remote) => lookup(&remote, &full).ok_or(Unresolved::Local),
        None => Err(Unresolved::Remote(base.to_string())),
    }
}

/// Resolve a static reference token written at `node`
pub fn resolve_ref(
    node: &Node,
    token: &str,
    pointer: &str,
    data: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Node, JsonError> {
    let root = node.resolution_root();
    match locate(&root, node.scope_id(), token, ctx.remotes()) {
        Ok(target) => {
            trace!(
                reference = token,
                from = node.evaluation_path(),
                to = target.evaluation_path(),
                "resolved reference"
            );
            Ok(target)
        }
        Err(Unresolved::Local) => {
            warn!(reference = token, scope = node.scope_id(), "unresolvable reference");
            Err(node.error(ErrorKind::UnresolvableRef, pointer, data, json!({ "ref": token })))
        }
        Err(Unresolved::Remote(url)) => {
            warn!(reference = token, url = %url, "reference into unregistered document");
            Err(node.error(
                ErrorKind::UnresolvableRemote,
                pointer,
                data,
                json!({ "ref": token, "url": url }),
            ))
        }
    }
}

/// Resolve a `$dynamicRef` token.
///
/// When the static target declares a `$dynamicAnchor` of the same name, the
/// outermost resource on the validation path that declares that anchor wins.
pub fn resolve_dynamic_ref(
    node: &Node,
    token: &str,
    pointer: &str,
    data: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Node, JsonError> {
    let target = resolve_ref(node, token, pointer, data, ctx)?;
    let full = join_scope(Some(node.scope_id()), Some(token));
    let Some(name) = split_scope(&full)
        .1
        .filter(|fragment| !fragment.is_empty() && !fragment.starts_with('/'))
    else {
        return Ok(target);
    };
    if target.keyword("$dynamicAnchor").and_then(Value::as_str) != Some(name) {
        return Ok(target);
    }
    Ok(outermost_dynamic_anchor(ctx, name).unwrap_or(target))
}

/// Resolve a `$recursiveRef` token against the outermost `$recursiveAnchor: true`
pub fn resolve_recursive_ref(
    node: &Node,
    token: &str,
    pointer: &str,
    data: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Node, JsonError> {
    let target = resolve_ref(node, token, pointer, data, ctx)?;
    if target.keyword("$recursiveAnchor") != Some(&Value::Bool(true)) {
        return Ok(target);
    }
    Ok(outermost_dynamic_anchor(ctx, "").unwrap_or(target))
}

fn outermost_dynamic_anchor(ctx: &EvalContext<'_>, name: &str) -> Option<Node> {
    ctx.path().iter().find_map(|entry| {
        let root = entry.node.resolution_root();
        let path = root
            .scope()
            .dynamic_anchors
            .get(&anchor_key(entry.node.scope_id(), name))?;
        Node::at_path(&root, path)
    })
}

/// Check if a node carries a reference keyword of its dialect
pub fn has_reference(node: &Node) -> bool {
    reference_keyword(node).is_some()
}

fn reference_keyword(node: &Node) -> Option<(&'static str, &str)> {
    let draft = node.draft();
    ["$ref", "$dynamicRef", "$recursiveRef"]
        .into_iter()
        .filter(|keyword| draft.keyword(keyword).is_some())
        .find_map(|keyword| Some((keyword, node.keyword(keyword)?.as_str()?)))
}

/// Target of whichever reference keyword a node carries
pub fn resolve_reference(
    node: &Node,
    pointer: &str,
    data: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Option<Node>, JsonError> {
    let Some((keyword, token)) = reference_keyword(node) else {
        return Ok(None);
    };
    let target = match keyword {
        "$dynamicRef" => resolve_dynamic_ref(node, token, pointer, data, ctx)?,
        "$recursiveRef" => resolve_recursive_ref(node, token, pointer, data, ctx)?,
        _ => resolve_ref(node, token, pointer, data, ctx)?,
    };
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonSchema;
    use crate::options::CompileOptions;
    use serde_json::json;

    fn target_path(schema: &JsonSchema, token: &str) -> Result<String, Unresolved> {
        let root = schema.root_node();
        locate(root.root(), root.scope_id(), token, schema.remotes())
            .map(|node| node.evaluation_path().to_string())
    }

    #[test]
    fn test_locate_pointer_and_anchor() {
        let schema = JsonSchema::compile(
            &json!({
                "$id": "http://example.com/root.json",
                "$defs": {
                    "a": { "$anchor": "alpha" },
                    "b": { "$id": "b.json", "$defs": { "c": { "type": "string" } } }
                }
            }),
            &CompileOptions::default(),
        )
        .unwrap();

        assert_eq!(target_path(&schema, "#/$defs/a").unwrap(), "#/$defs/a");
        assert_eq!(target_path(&schema, "#alpha").unwrap(), "#/$defs/a");
        assert_eq!(target_path(&schema, "b.json").unwrap(), "#/$defs/b");
        assert_eq!(target_path(&schema, "b.json#/$defs/c").unwrap(), "#/$defs/b/$defs/c");
        assert_eq!(target_path(&schema, "#missing"), Err(Unresolved::Local));
        assert_eq!(
            target_path(&schema, "http://other.com/x.json"),
            Err(Unresolved::Remote("http://other.com/x.json".to_string()))
        );
    }

    #[test]
    fn test_locate_percent_encoded_pointer() {
        let schema = JsonSchema::compile(
            &json!({ "$defs": { "a%b": { "type": "integer" } } }),
            &CompileOptions::default(),
        )
        .unwrap();
        assert_eq!(target_path(&schema, "#/$defs/a%25b").unwrap(), "#/$defs/a%b");
    }

    #[test]
    fn test_remote_lookup_by_embedded_id() {
        let mut schema = JsonSchema::compile(
            &json!({ "$ref": "http://localhost:1234/nested.json#/$defs/x" }),
            &CompileOptions::default(),
        )
        .unwrap();
        schema
            .add_remote_schema(
                "http://localhost:1234/doc.json",
                &json!({ "$defs": { "n": { "$id": "nested.json", "$defs": { "x": true } } } }),
            )
            .unwrap();

        assert_eq!(
            target_path(&schema, "http://localhost:1234/nested.json#/$defs/x").unwrap(),
            "#/$defs/n/$defs/x"
        );
    }

    #[test]
    fn test_registry_normalizes_trailing_hash() {
        let schema = JsonSchema::compile(&json!({}), &CompileOptions::default()).unwrap();
        let mut registry = RemoteRegistry::new();
        registry.insert("http://example.com/a.json#", Arc::clone(schema.root_node().root()));
        assert!(registry.get("http://example.com/a.json").is_some());
        assert_eq!(registry.len(), 1);
    }
}
