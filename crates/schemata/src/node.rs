//! Compiled schema graph.
//!
//! A [`SchemaRoot`] owns every node of one compiled document in an arena
//! indexed by [`NodeId`]. Sub-schemas reached through `$ref` are not copied:
//! references are looked up in the scope tables at evaluation time and yield a
//! [`Node`] handle pointing into whichever root owns the target.

use crate::draft::Draft;
use crate::error::{ErrorKind, JsonError};
use crate::options::CompileOptions;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a node inside its root's arena
pub type NodeId = usize;

/// A compiled `patternProperties` entry
#[derive(Debug, Clone)]
pub struct PatternChild {
    pub pattern: String,
    pub regex: Regex,
    pub node: NodeId,
}

/// Sub-schemas elaborated by keyword parse hooks
#[derive(Debug, Clone, Default)]
pub struct Children {
    pub properties: IndexMap<String, NodeId>,
    pub pattern_properties: Vec<PatternChild>,
    pub additional_properties: Option<NodeId>,
    pub property_names: Option<NodeId>,
    /// `dependentSchemas`, or the schema-valued entries of `dependencies`
    pub dependent_schemas: IndexMap<String, NodeId>,
    /// Positional item schemas (`prefixItems`, or an `items` array)
    pub prefix_items: Vec<NodeId>,
    /// Schema for every item past `prefix_items`
    pub items: Option<NodeId>,
    pub contains: Option<NodeId>,
    pub all_of: Vec<NodeId>,
    pub any_of: Vec<NodeId>,
    pub one_of: Vec<NodeId>,
    pub if_: Option<NodeId>,
    pub then: Option<NodeId>,
    pub else_: Option<NodeId>,
    pub not: Option<NodeId>,
    pub defs: IndexMap<String, NodeId>,
    pub unevaluated_properties: Option<NodeId>,
    pub unevaluated_items: Option<NodeId>,
}

static NULL: Value = Value::Null;

/// One compiled schema location
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// Pointer from the compiled root, e.g. `#/properties/x/oneOf/1`
    pub evaluation_path: String,
    /// The whole compiled document, shared by every node of a root
    document: Arc<Value>,
    /// JSON pointer of this node's fragment inside `document`
    pub location: String,
    /// Absolute scope in effect at this node
    pub scope_id: String,
    pub children: Children,
    pub(crate) pattern: Option<Regex>,
    pub(crate) validators: Vec<usize>,
    pub(crate) resolvers: Vec<usize>,
    pub(crate) reducers: Vec<usize>,
}

impl SchemaNode {
    pub(crate) fn new(
        evaluation_path: String,
        document: Arc<Value>,
        location: String,
        scope_id: String,
    ) -> Self {
        Self {
            evaluation_path,
            document,
            location,
            scope_id,
            children: Children::default(),
            pattern: None,
            validators: Vec::new(),
            resolvers: Vec::new(),
            reducers: Vec::new(),
        }
    }

    /// The raw fragment
    pub fn schema(&self) -> &Value {
        self.document.pointer(&self.location).unwrap_or(&NULL)
    }

    /// Value of a keyword in this node's schema
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.schema().get(name)
    }

    pub fn has_keyword(&self, name: &str) -> bool {
        self.keyword(name).is_some()
    }
}

/// Identifier and anchor tables of one compiled root.
///
/// Every table maps an absolute key (`http://x/a.json`, `http://x/a.json#name`)
/// to the evaluation path of the node that declared it.
#[derive(Debug, Clone, Default)]
pub struct ScopeContext {
    pub ids: HashMap<String, String>,
    pub anchors: HashMap<String, String>,
    pub dynamic_anchors: HashMap<String, String>,
    pub(crate) paths: HashMap<String, NodeId>,
}

impl ScopeContext {
    /// Node compiled at an evaluation path
    pub fn node_at(&self, evaluation_path: &str) -> Option<NodeId> {
        self.paths.get(evaluation_path).copied()
    }
}

/// An immutable compiled document
#[derive(Debug)]
pub struct SchemaRoot {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) scope: ScopeContext,
    pub(crate) draft: Arc<Draft>,
    pub(crate) options: CompileOptions,
    /// Set on roots built by merging during reduction; references resolve there
    pub(crate) origin: Option<Arc<SchemaRoot>>,
}

impl SchemaRoot {
    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn scope(&self) -> &ScopeContext {
        &self.scope
    }

    pub fn draft(&self) -> &Arc<Draft> {
        &self.draft
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Document part of the root node's scope, empty for anonymous documents
    pub fn base_uri(&self) -> &str {
        self.nodes
            .first()
            .map(|node| crate::scope::strip_fragment(&node.scope_id))
            .unwrap_or("")
    }
}

/// The root whose scope tables answer references made inside `root`
pub(crate) fn resolution_root(root: &Arc<SchemaRoot>) -> Arc<SchemaRoot> {
    let mut current = root;
    while let Some(origin) = &current.origin {
        current = origin;
    }
    Arc::clone(current)
}

/// Shared handle to a compiled node
#[derive(Clone)]
pub struct Node {
    root: Arc<SchemaRoot>,
    id: NodeId,
}

impl Node {
    pub(crate) fn new(root: Arc<SchemaRoot>, id: NodeId) -> Self {
        Self { root, id }
    }

    /// Handle for the node declared at `evaluation_path` of `root`
    pub(crate) fn at_path(root: &Arc<SchemaRoot>, evaluation_path: &str) -> Option<Self> {
        root.scope
            .node_at(evaluation_path)
            .map(|id| Self::new(Arc::clone(root), id))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn root(&self) -> &Arc<SchemaRoot> {
        &self.root
    }

    pub(crate) fn data(&self) -> &SchemaNode {
        &self.root.nodes[self.id]
    }

    pub fn schema(&self) -> &Value {
        self.data().schema()
    }

    pub fn evaluation_path(&self) -> &str {
        &self.data().evaluation_path
    }

    pub fn scope_id(&self) -> &str {
        &self.data().scope_id
    }

    pub fn children(&self) -> &Children {
        &self.data().children
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.data().keyword(name)
    }

    pub fn draft(&self) -> &Arc<Draft> {
        &self.root.draft
    }

    pub fn options(&self) -> &CompileOptions {
        &self.root.options
    }

    /// Handle for another node of the same root
    pub fn child(&self, id: NodeId) -> Node {
        Node::new(Arc::clone(&self.root), id)
    }

    pub(crate) fn resolution_root(&self) -> Arc<SchemaRoot> {
        resolution_root(&self.root)
    }

    /// Identity key, stable for the lifetime of the root
    pub(crate) fn key(&self) -> (usize, NodeId) {
        (Arc::as_ptr(&self.root) as usize, self.id)
    }

    /// Both handles point at the same compiled node
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.root, &other.root) && self.id == other.id
    }

    pub fn is_true_schema(&self) -> bool {
        matches!(self.schema(), Value::Bool(true))
    }

    pub fn is_false_schema(&self) -> bool {
        matches!(self.schema(), Value::Bool(false))
    }

    /// Build a data error for this node through its draft's templates.
    ///
    /// `extra` must be a JSON object; its fields are added next to
    /// `pointer`, `schema` and `value`.
    pub fn error(&self, kind: ErrorKind, pointer: &str, value: &Value, extra: Value) -> JsonError {
        let mut data = Map::new();
        data.insert("pointer".to_string(), Value::String(pointer.to_string()));
        data.insert("schema".to_string(), self.schema().clone());
        data.insert("value".to_string(), value.clone());
        if let Value::Object(extra) = extra {
            data.extend(extra);
        }
        self.draft().error(kind, data)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("evaluation_path", &self.evaluation_path())
            .field("scope_id", &self.scope_id())
            .field("schema", self.schema())
            .finish()
    }
}
