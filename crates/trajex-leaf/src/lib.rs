//! trajex leaves
//!
//! Building blocks of a trajectory tree that know nothing about the tree itself.
//!
//! # Core Concepts
//!
//! - [`NodePath`]: Dotted full name of a node (`parameters.traffic.ncars`)
//! - [`Value`]: Data carried by a leaf
//! - [`LeafKind`]: Per-kind type compatibility and equality rules
//! - [`KindRegistry`]: Explicit tag → kind table
//! - [`LeafEntity`]: Lockable leaf with an optional exploration range
//!
//! # Example
//!
//! ```rust
//! use trajex_leaf::{KindRegistry, Value, kind::PARAMETER};
//!
//! let registry = KindRegistry::with_defaults();
//! let mut leaf = registry.instantiate_with(PARAMETER, Value::Int(1)).unwrap();
//! leaf.explore(vec![Value::Int(1), Value::Int(2)]).unwrap();
//! leaf.set_access_index(1).unwrap();
//! assert_eq!(leaf.value(), Some(&Value::Int(2)));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod kind;
mod leaf;
mod path;
mod registry;
mod value;

pub use kind::{ApproxParameterKind, LeafKind, ParameterKind, ResultKind};
pub use leaf::{LeafEntity, LeafError};
pub use path::{validate_segment, NodePath, PathError, SEPARATOR};
pub use registry::{KindError, KindRegistry};
pub use value::{Value, ValueType};

/// Error taxonomy shared by every trajex crate
///
/// Each crate error maps onto one class through its `class()` method, so
/// callers can branch on the category without matching nested enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Name already taken
    NameConflict,
    /// More than one node satisfies a lookup
    AmbiguousPath,
    /// Nothing satisfies a lookup
    NotFound,
    /// Mutation of a locked leaf
    LockedMutation,
    /// Exploration sequences of unequal length
    RangeLengthMismatch,
    /// Trajectories (or expansion keys) do not fit together
    IncompatibleMerge,
    /// Trial parameter values are not a contiguous `0..=T` set
    InvalidTrialRange,
    /// Every source run is a duplicate
    NothingToMerge,
    /// Link that could not be re-created
    UnresolvableLink,
    /// Malformed path or segment
    InvalidPath,
    /// Value of the wrong type
    TypeMismatch,
    /// Operation not allowed for this node or leaf kind
    Kind,
    /// Invalid configuration
    Config,
    /// Persistence collaborator failure
    Storage,
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn registry_leaf_and_path_together() {
        let registry = KindRegistry::with_defaults();
        let path: NodePath = "parameters.traffic.ncars".parse().unwrap();
        assert_eq!(path.last(), Some("ncars"));

        let mut leaf = registry.instantiate_with(kind::PARAMETER, Value::Int(10)).unwrap();
        leaf.explore(vec![Value::Int(10), Value::Int(20)]).unwrap();
        assert_eq!(leaf.range().len(), 2);
    }

    #[test]
    fn custom_kind_plugs_in() {
        #[derive(Debug)]
        struct CaseInsensitive;

        impl LeafKind for CaseInsensitive {
            fn tag(&self) -> &str {
                "ci_text"
            }

            fn is_parameter(&self) -> bool {
                true
            }

            fn equal_values(&self, a: &Value, b: &Value) -> bool {
                match (a.as_str(), b.as_str()) {
                    (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
                    _ => a == b,
                }
            }
        }

        let mut registry = KindRegistry::new();
        registry.register(Arc::new(CaseInsensitive));
        let leaf = registry.instantiate("ci_text").unwrap();
        assert!(leaf
            .kind()
            .equal_values(&Value::from("ABC"), &Value::from("abc")));
    }
}
