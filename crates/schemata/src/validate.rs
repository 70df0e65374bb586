//! Validation orchestration.

use crate::error::{ErrorKind, JsonError};
use crate::node::Node;
use crate::resolve::RemoteRegistry;
use serde_json::{Value, json};

/// One step of the validation path
#[derive(Debug, Clone)]
pub struct PathEntry {
    /// Data pointer the node was applied at
    pub pointer: String,
    pub node: Node,
}

/// Per-call evaluation state.
///
/// Created fresh for each `validate`, `get_data` or `get_node` call and
/// dropped at its end; nothing here outlives the call.
pub struct EvalContext<'r> {
    remotes: &'r RemoteRegistry,
    /// Nodes entered so far, outermost first
    path: Vec<PathEntry>,
    /// Reduce `oneOf` to the first (or first matching) branch instead of failing
    pub(crate) fallback_first_branch: bool,
}

impl<'r> EvalContext<'r> {
    pub fn new(remotes: &'r RemoteRegistry) -> Self {
        Self {
            remotes,
            path: Vec::new(),
            fallback_first_branch: false,
        }
    }

    /// Context for data queries, where an unmatched `oneOf` falls back to a branch
    pub(crate) fn lenient(remotes: &'r RemoteRegistry) -> Self {
        Self {
            fallback_first_branch: true,
            ..Self::new(remotes)
        }
    }

    pub fn remotes(&self) -> &'r RemoteRegistry {
        self.remotes
    }

    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// Execute a function with `node` pushed onto the validation path
    pub fn with_node<F, R>(&mut self, node: &Node, pointer: &str, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.path.push(PathEntry {
            pointer: pointer.to_string(),
            node: node.clone(),
        });
        let result = f(self);
        self.path.pop();
        result
    }
}

/// Validate `data` at `pointer` against a node.
///
/// Every applicable keyword runs and contributes its errors; type-specific
/// keywords ignore data of other types.
pub fn validate_node(
    node: &Node,
    data: &Value,
    pointer: &str,
    ctx: &mut EvalContext<'_>,
) -> Vec<JsonError> {
    match node.schema() {
        Value::Bool(true) => return Vec::new(),
        Value::Bool(false) => {
            return vec![node.error(ErrorKind::FalseSchema, pointer, data, json!({}))];
        }
        _ => {}
    }

    ctx.with_node(node, pointer, |ctx| {
        let keywords = node.draft().keywords();
        let mut errors = Vec::new();
        for &index in &node.data().validators {
            if let Some(validate) = keywords[index].validate {
                errors.extend(validate(node, data, pointer, ctx));
            }
        }
        errors
    })
}

/// Check if `data` validates against a node without errors
pub fn is_valid_node(node: &Node, data: &Value, pointer: &str, ctx: &mut EvalContext<'_>) -> bool {
    validate_node(node, data, pointer, ctx).is_empty()
}
