//! Error types for trajex core
//!
//! Structural failures abort the single operation and leave the trajectory
//! as it was. Storage failures are passed through unchanged.

use crate::config::ConfigError;
use crate::storage::StorageError;
use trajex_leaf::{ErrorClass, KindError, PathError};
use trajex_tree::TreeError;

/// Main trajectory error type
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    /// Tree operation failed
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Malformed path
    #[error(transparent)]
    Path(#[from] PathError),

    /// Unknown leaf kind
    #[error(transparent)]
    Kind(#[from] KindError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence collaborator failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Unknown run index or name
    #[error("run not found: {run}")]
    RunNotFound {
        /// Run as given
        run: String,
    },

    /// Exploration sequences of different lengths
    #[error("range length mismatch at '{path}': expected {expected}, found {found}")]
    RangeLengthMismatch {
        /// Offending leaf
        path: String,
        /// Required length
        expected: usize,
        /// Given length
        found: usize,
    },

    /// Explore after runs completed on an explored trajectory
    #[error("trajectory is explored and has completed runs; use expand")]
    MustExpand,

    /// Expansion keys differ from the explored set
    #[error("expansion keys differ from explored parameters (missing {missing:?}, unexpected {unexpected:?})")]
    IncompatibleExpansion {
        /// Explored parameters not given
        missing: Vec<String>,
        /// Given keys that are not explored
        unexpected: Vec<String>,
    },

    /// Target is not a parameter leaf
    #[error("'{path}' is not a parameter")]
    NotAParameter {
        /// Offending node
        path: String,
    },

    /// Two keys name the same leaf
    #[error("'{path}' is targeted more than once")]
    DuplicateTarget {
        /// Leaf full name
        path: String,
    },

    /// Node placed outside the four roots
    #[error("'{path}' is outside config, parameters, derived_parameters and results")]
    OutsideRoots {
        /// Offending path
        path: String,
    },

    /// Removal would drop an explored parameter
    #[error("'{path}' holds explored parameters; shrink first")]
    ExploredRemoval {
        /// Offending node
        path: String,
    },

    /// Shrink after the trajectory was stored
    #[error("trajectory was already stored")]
    AlreadyStored,

    /// Expansion of a stored trajectory without acknowledging pending storage
    #[error("trajectory was stored; expansion must acknowledge pending storage")]
    PendingStorage,

    /// Value access on a leaf without data
    #[error("leaf '{path}' is empty")]
    EmptyLeaf {
        /// Leaf full name
        path: String,
    },
}

impl TrajectoryError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Tree(e) => e.class(),
            Self::Path(e) => e.class(),
            Self::Kind(e) => e.class(),
            Self::Config(e) => e.class(),
            Self::Storage(_) => ErrorClass::Storage,
            Self::RunNotFound { .. } | Self::EmptyLeaf { .. } => ErrorClass::NotFound,
            Self::RangeLengthMismatch { .. } => ErrorClass::RangeLengthMismatch,
            Self::IncompatibleExpansion { .. } => ErrorClass::IncompatibleMerge,
            Self::DuplicateTarget { .. } => ErrorClass::NameConflict,
            Self::MustExpand
            | Self::NotAParameter { .. }
            | Self::OutsideRoots { .. }
            | Self::ExploredRemoval { .. }
            | Self::AlreadyStored
            | Self::PendingStorage => ErrorClass::Kind,
        }
    }

    /// Run lookup failure for a displayable run reference
    #[must_use]
    pub fn run_not_found(run: impl ToString) -> Self {
        Self::RunNotFound {
            run: run.to_string(),
        }
    }
}

/// Result alias for trajectory operations
pub type Result<T, E = TrajectoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use trajex_leaf::LeafError;

    #[test]
    fn nested_classes_surface() {
        let locked = TrajectoryError::from(TreeError::leaf("parameters.x", LeafError::Locked));
        assert_eq!(locked.class(), ErrorClass::LockedMutation);

        let ambiguous = TrajectoryError::from(TreeError::AmbiguousPath {
            query: "z".into(),
            candidates: vec![],
        });
        assert_eq!(ambiguous.class(), ErrorClass::AmbiguousPath);
    }

    #[test]
    fn expansion_mismatch_is_incompatible() {
        let err = TrajectoryError::IncompatibleExpansion {
            missing: vec!["parameters.x".into()],
            unexpected: vec![],
        };
        assert_eq!(err.class(), ErrorClass::IncompatibleMerge);
        assert!(err.to_string().contains("parameters.x"));
    }
}
