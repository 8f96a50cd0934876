//! Tree error types

use trajex_leaf::{ErrorClass, LeafError, PathError};

/// Errors raised by [`NamedTree`](crate::NamedTree) operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Full name (or link name) already taken
    #[error("name conflict: '{path}' already exists")]
    NameConflict {
        /// Conflicting full name
        path: String,
    },

    /// More than one node matches a lookup
    #[error("ambiguous path '{query}': candidates {candidates:?}")]
    AmbiguousPath {
        /// Query as given
        query: String,
        /// Full names of every match
        candidates: Vec<String>,
    },

    /// Nothing matches a lookup
    #[error("not found: '{path}'")]
    NotFound {
        /// Path or query as given
        path: String,
    },

    /// Children or links requested on a leaf
    #[error("'{path}' is not a group")]
    NotAGroup {
        /// Offending node
        path: String,
    },

    /// Leaf operation on a group
    #[error("'{path}' is not a leaf")]
    NotALeaf {
        /// Offending node
        path: String,
    },

    /// Non-recursive removal of a group with children
    #[error("'{path}' has children; remove recursively")]
    HasChildren {
        /// Offending group
        path: String,
    },

    /// Add or remove on the root itself
    #[error("the root node cannot be added or removed")]
    RootImmutable,

    /// Malformed path
    #[error(transparent)]
    Path(#[from] PathError),

    /// Leaf operation failed
    #[error("leaf '{path}': {source}")]
    Leaf {
        /// Leaf full name
        path: String,
        /// Underlying failure
        #[source]
        source: LeafError,
    },
}

impl TreeError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NameConflict { .. } => ErrorClass::NameConflict,
            Self::AmbiguousPath { .. } => ErrorClass::AmbiguousPath,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::NotAGroup { .. }
            | Self::NotALeaf { .. }
            | Self::HasChildren { .. }
            | Self::RootImmutable => ErrorClass::Kind,
            Self::Path(e) => e.class(),
            Self::Leaf { source, .. } => source.class(),
        }
    }

    /// Wrap a leaf failure with the leaf's name
    #[must_use]
    pub fn leaf(path: impl ToString, source: LeafError) -> Self {
        Self::Leaf {
            path: path.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(
            TreeError::NameConflict { path: "a".into() }.class(),
            ErrorClass::NameConflict
        );
        assert_eq!(
            TreeError::Path(PathError::EmptySegment).class(),
            ErrorClass::InvalidPath
        );
        assert_eq!(
            TreeError::leaf("a.x", LeafError::Locked).class(),
            ErrorClass::LockedMutation
        );
    }

    #[test]
    fn ambiguity_message_lists_candidates() {
        let err = TreeError::AmbiguousPath {
            query: "a.val".into(),
            candidates: vec!["a.x.val".into(), "a.y.val".into()],
        };
        assert!(err.to_string().contains("a.x.val"));
    }
}
