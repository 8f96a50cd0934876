//! trajex named tree
//!
//! Hierarchical node registry addressed by dotted full names.
//!
//! # Core Concepts
//!
//! - [`NamedTree`]: Arena of groups and leaves with unique full names
//! - [`NameIndex`]: Radix trie over full names plus a short-name index
//! - [`LinkRegistry`]: Named cross references with a reverse index
//! - [`ResolveOptions`]: Shortcut, depth and link settings of a lookup
//!
//! Lookups never pick silently: [`NamedTree::find_all`] returns every
//! candidate and [`single_match`] turns zero or several of them into
//! [`TreeError::NotFound`] or [`TreeError::AmbiguousPath`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trajex_leaf::{LeafEntity, NodePath, ParameterKind, Value};
//! use trajex_tree::{NamedTree, ResolveOptions};
//!
//! let mut tree = NamedTree::new();
//! let path: NodePath = "a.b.c.d".parse().unwrap();
//! let id = tree
//!     .add_leaf(&path, LeafEntity::with_value(Arc::new(ParameterKind), Value::Int(1)))
//!     .unwrap();
//!
//! let query: NodePath = "a.d".parse().unwrap();
//! let found = tree.resolve(&NodePath::root(), &query, &ResolveOptions::default());
//! assert_eq!(found.unwrap(), id);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod error;
mod index;
mod links;
mod node;
mod tree;

pub use error::TreeError;
pub use index::NameIndex;
pub use links::{LinkEntry, LinkRegistry, LinkSources};
pub use node::{Node, NodeData, NodeId};
pub use tree::{single_match, Match, NamedTree, ResolveOptions};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
