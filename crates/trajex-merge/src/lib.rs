//! Trajex Merge - combining trajectories
//!
//! Merging appends the runs of a source trajectory to a target trajectory
//! spanning the same parameter space.
//!
//! # Stages
//!
//! - [`MergeStage::CheckCompatibility`]: equal parameter names, same-typed values
//! - [`MergeStage::MarkChanges`]: parameters explored on either side or differing
//! - [`MergeStage::Dedup`]: optional removal of runs the target already has
//! - [`MergeStage::ExtendRanges`]: target ranges grow by the retained runs
//! - [`MergeStage::RenumberRuns`]: retained runs get the next target names
//! - [`MergeStage::RewriteSubtrees`]: run items, results and shared parameters
//! - [`MergeStage::RemapLinks`]: links with renamed endpoints
//!
//! The first three stages only read. The target changes from
//! [`MergeStage::ExtendRanges`] on.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod engine;
pub mod error;
mod info;
mod links;
mod options;
mod plan;
mod rename;
mod rewrite;
pub mod stage;

pub use engine::{MergeEngine, MergeOutcome};
pub use error::MergeError;
pub use info::{merge_name, MERGE_GROUP};
pub use links::{SkipReason, SkippedLink};
pub use options::MergeOptions;
pub use plan::MergePlan;
pub use stage::MergeStage;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use trajex_core::{RootGroup, RunRef};
    use trajex_leaf::Value;
    use trajex_test_utils::{add_run_results, create_explored_trajectory, ints};

    #[test]
    fn plan_leaves_target_untouched() {
        let a = create_explored_trajectory("a", &[1, 2]);
        let b = create_explored_trajectory("b", &[3, 4]);
        let plan = MergeEngine::default().plan(&a, &b).unwrap();
        assert_eq!(plan.retained_runs().len(), 2);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn merged_runs_keep_their_status() {
        let mut a = create_explored_trajectory("a", &[1]);
        let mut b = create_explored_trajectory("b", &[2, 3]);
        b.mark_run_completed(&RunRef::Index(1)).unwrap();
        add_run_results(&mut b, "z");

        let outcome = MergeEngine::default().merge(&mut a, &b).unwrap();
        assert_eq!(outcome.merged_runs, 2);
        assert!(!a.ledger().is_completed(Some(&RunRef::Index(1))).unwrap());
        assert!(a.ledger().is_completed(Some(&RunRef::Index(2))).unwrap());
        assert_eq!(a.explored_values()["parameters.x"], ints(&[1, 2, 3]));
        assert!(a.get("results.runs.run_00000002.z").is_ok());
    }

    #[test]
    fn keep_info_records_the_merge() {
        let mut a = create_explored_trajectory("a", &[1]);
        let b = create_explored_trajectory("b", &[2]);
        let outcome = MergeEngine::new(MergeOptions::new()).merge(&mut a, &b).unwrap();

        let base = format!("{MERGE_GROUP}.{}", outcome.merge_name);
        assert_eq!(
            a.value(&format!("{base}.length_before_merge")).unwrap(),
            &Value::Int(1)
        );
        assert_eq!(a.value(&format!("{base}.merged_runs")).unwrap(), &Value::Int(1));
        assert_eq!(
            a.value(&format!("{base}.other_trajectory.name")).unwrap(),
            &Value::Str("b".into())
        );
        assert_eq!(
            a.get(MERGE_GROUP).unwrap().comment(),
            "Settings and information of the different merges"
        );
    }

    #[test]
    fn outcome_serializes() {
        let mut a = create_explored_trajectory("a", &[1]);
        let mut b = create_explored_trajectory("b", &[2]);
        b.results().add_leaf("summary", Some(Value::Int(1))).unwrap();
        let outcome = MergeEngine::default().merge(&mut a, &b).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["run_names"]["run_00000000"], "run_00000001");
        assert_eq!(json["renames"][0][0], "results.summary");
        assert_eq!(outcome.storage_context(&a).other_trajectory.as_deref(), Some("b"));
    }
}
