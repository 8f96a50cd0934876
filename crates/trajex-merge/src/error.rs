//! Merge errors
//!
//! Every variant except [`MergeError::Trajectory`] is raised while the merge
//! plan is built, before the target is touched.

use crate::stage::MergeStage;
use trajex_core::TrajectoryError;
use trajex_leaf::ErrorClass;

/// Merge failure
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Parameter spaces differ
    #[error(
        "trajectories span different parameter spaces: only in target {only_in_target:?}, only in source {only_in_source:?}"
    )]
    IncompatibleSpace {
        /// Names found only in the target
        only_in_target: Vec<String>,
        /// Names found only in the source
        only_in_source: Vec<String>,
    },

    /// Same name, values of different types
    #[error("parameter '{name}' holds values of different types")]
    IncompatibleTypes {
        /// Offending parameter
        name: String,
    },

    /// Trial parameter is unknown or its values are not `0..=T`
    #[error("invalid trial parameter '{name}': {reason}")]
    InvalidTrialRange {
        /// Trial parameter as given
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Trial parameter together with deduplication
    #[error("a trial parameter cannot be combined with duplicate removal")]
    TrialWithDeduplication,

    /// Every source run duplicates a target run
    #[error("every run of '{source_name}' is already present in the target")]
    NothingToMerge {
        /// Source trajectory name
        source_name: String,
    },

    /// Internal stage ordering violated
    #[error("illegal merge stage transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current stage
        from: MergeStage,
        /// Requested stage
        to: MergeStage,
    },

    /// Trajectory operation failed while applying the plan
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),
}

impl MergeError {
    /// Error class of this failure
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::IncompatibleSpace { .. } | Self::IncompatibleTypes { .. } => {
                ErrorClass::IncompatibleMerge
            }
            Self::InvalidTrialRange { .. } | Self::TrialWithDeduplication => {
                ErrorClass::InvalidTrialRange
            }
            Self::NothingToMerge { .. } => ErrorClass::NothingToMerge,
            Self::IllegalTransition { .. } => ErrorClass::Kind,
            Self::Trajectory(e) => e.class(),
        }
    }

    pub(crate) fn trial(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTrialRange {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<trajex_tree::TreeError> for MergeError {
    fn from(e: trajex_tree::TreeError) -> Self {
        Self::Trajectory(e.into())
    }
}

impl From<trajex_leaf::PathError> for MergeError {
    fn from(e: trajex_leaf::PathError) -> Self {
        Self::Trajectory(e.into())
    }
}
