// Multi-dialect JSON Schema compiler, validator and data synthesizer
//
// A schema document is compiled once into an arena of nodes; validation,
// data-directed lookup and default data synthesis then run against that
// arena without touching the raw document again.

pub mod compile;
pub mod data;
pub mod draft;
pub mod error;
pub mod evaluated;
pub mod keywords;
pub mod merge;
pub mod node;
pub mod options;
pub mod reduce;
pub mod resolve;
pub mod schema;
pub mod scope;
pub mod traverse;
pub mod validate;
pub mod yaml;

pub use compile::Compiler;
pub use draft::{Draft, Keyword};
pub use error::{ErrorKind, JsonError, SchemaError, SchemaResult, ValidationReport};
pub use merge::merge_schemas;
pub use node::{Node, NodeId, SchemaNode, SchemaRoot};
pub use options::{CompileOptions, Dialect, GetDataOptions, GetNodeOptions, OneOfMode, RegexOptions};
pub use resolve::RemoteRegistry;
pub use schema::{JsonSchema, SchemaSource};
pub use scope::join_scope;
pub use traverse::DataNode;
pub use validate::EvalContext;
