//! Merge stages
//!
//! A merge walks these stages in order. Deduplication is the only optional
//! one; every other stage must be passed through.

use crate::error::MergeError;
use serde::Serialize;
use tracing::debug;

/// Stage of a running merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MergeStage {
    /// Parameter spaces and types are compared
    CheckCompatibility,
    /// Parameters needing new values are selected
    MarkChanges,
    /// Source runs already present in the target are dropped
    Dedup,
    /// Ranges in the target grow by the retained runs
    ExtendRanges,
    /// Retained runs receive target names
    RenumberRuns,
    /// Run subtrees, results and shared parameters are re-created
    RewriteSubtrees,
    /// Links are re-created with renamed endpoints
    RemapLinks,
    /// Finished
    Done,
}

/// Validates a stage transition
///
/// # Errors
/// Returns [`MergeError::IllegalTransition`] if `to` does not follow `from`
pub fn validate_transition(from: MergeStage, to: MergeStage) -> Result<(), MergeError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(MergeError::IllegalTransition { from, to })
    }
}

/// Stages reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: MergeStage) -> Vec<MergeStage> {
    use MergeStage::*;
    match from {
        CheckCompatibility => vec![MarkChanges],
        MarkChanges => vec![Dedup, ExtendRanges],
        Dedup => vec![ExtendRanges],
        ExtendRanges => vec![RenumberRuns],
        RenumberRuns => vec![RewriteSubtrees],
        RewriteSubtrees => vec![RemapLinks],
        RemapLinks => vec![Done],
        Done => vec![],
    }
}

fn allowed(from: MergeStage, to: MergeStage) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

/// Current stage of one merge
#[derive(Debug)]
pub(crate) struct StageTracker {
    stage: MergeStage,
}

impl StageTracker {
    pub(crate) fn new() -> Self {
        Self {
            stage: MergeStage::CheckCompatibility,
        }
    }

    pub(crate) fn stage(&self) -> MergeStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, to: MergeStage) -> Result<(), MergeError> {
        validate_transition(self.stage, to)?;
        debug!(from = ?self.stage, to = ?to, "merge stage");
        self.stage = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MergeStage::*;

    #[test]
    fn full_path_is_valid() {
        let path = [
            CheckCompatibility,
            MarkChanges,
            Dedup,
            ExtendRanges,
            RenumberRuns,
            RewriteSubtrees,
            RemapLinks,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok());
        }
    }

    #[test]
    fn dedup_is_optional() {
        assert!(validate_transition(MarkChanges, ExtendRanges).is_ok());
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(validate_transition(CheckCompatibility, ExtendRanges).is_err());
        assert!(validate_transition(RemapLinks, RewriteSubtrees).is_err());
        assert!(allowed_transitions(Done).is_empty());
    }

    #[test]
    fn tracker_refuses_skips() {
        let mut tracker = StageTracker::new();
        tracker.advance(MarkChanges).unwrap();
        assert!(matches!(
            tracker.advance(RenumberRuns),
            Err(MergeError::IllegalTransition { from: MarkChanges, to: RenumberRuns })
        ));
        assert_eq!(tracker.stage(), MarkChanges);
    }
}
