//! Merge engine

use crate::error::MergeError;
use crate::info::{self, MergeRecord};
use crate::links::{self, SkippedLink};
use crate::options::MergeOptions;
use crate::plan::MergePlan;
use crate::rename::RunRenames;
use crate::rewrite;
use crate::stage::{MergeStage, StageTracker};
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;
use trajex_core::{StorageContext, Trajectory};
use trajex_leaf::NodePath;

/// What a merge did to the target
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    /// Identifier of this merge
    pub merge_name: String,
    /// Name of the trajectory merged in
    pub other_trajectory: String,
    /// Full names of the parameters that received new values
    pub changed_parameters: Vec<String>,
    /// Number of runs added to the target
    pub merged_runs: usize,
    /// Source runs dropped as duplicates
    pub duplicate_runs: Vec<String>,
    /// Source run name → new target run name
    pub run_names: IndexMap<String, String>,
    /// Source full name → target full name of every re-created leaf
    pub renames: Vec<(NodePath, NodePath)>,
    /// Source links that were not re-created
    pub skipped_links: Vec<SkippedLink>,
}

impl MergeOutcome {
    /// Storage context telling a service which data to copy over
    #[must_use]
    pub fn storage_context(&self, target: &Trajectory) -> StorageContext {
        target
            .storage_context()
            .with_merge(self.other_trajectory.clone(), self.renames.clone())
    }
}

/// Merges one trajectory into another
///
/// # Example
///
/// ```rust
/// use trajex_merge::{MergeEngine, MergeOptions};
/// use trajex_core::{RootGroup, Trajectory, TrajectoryConfig};
/// use trajex_leaf::Value;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut a = Trajectory::new(TrajectoryConfig::new().with_name("a"))?;
/// a.parameters().add_leaf("x", Some(Value::Int(0)))?;
/// a.explore([("x", vec![Value::Int(1), Value::Int(2)])])?;
///
/// let mut b = Trajectory::new(TrajectoryConfig::new().with_name("b"))?;
/// b.parameters().add_leaf("x", Some(Value::Int(0)))?;
/// b.explore([("x", vec![Value::Int(2), Value::Int(3)])])?;
///
/// let engine = MergeEngine::new(MergeOptions::new().with_remove_duplicates(true));
/// let outcome = engine.merge(&mut a, &b)?;
/// assert_eq!(outcome.merged_runs, 1);
/// assert_eq!(a.len(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: MergeOptions,
}

impl MergeEngine {
    /// Create engine
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[inline]
    #[must_use]
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Decide what a merge would do without changing anything
    ///
    /// # Errors
    /// Same planning errors as [`merge`](Self::merge)
    pub fn plan(&self, target: &Trajectory, source: &Trajectory) -> Result<MergePlan, MergeError> {
        MergePlan::build(target, source, &self.options, &mut StageTracker::new())
    }

    /// Merge `source` into `target`
    ///
    /// `target` is untouched when planning fails. Link failures are reported
    /// in [`MergeOutcome::skipped_links`] and never abort the merge.
    ///
    /// # Errors
    /// - [`MergeError::IncompatibleSpace`] / [`MergeError::IncompatibleTypes`]
    /// - [`MergeError::InvalidTrialRange`] / [`MergeError::TrialWithDeduplication`]
    /// - [`MergeError::NothingToMerge`] if deduplication drops every run
    /// - [`MergeError::Trajectory`] when re-creating nodes fails
    pub fn merge(&self, target: &mut Trajectory, source: &Trajectory) -> Result<MergeOutcome, MergeError> {
        let started = Utc::now();
        let mut stages = StageTracker::new();
        info!(target = target.name(), source = source.name(), "merging trajectories");

        let plan = MergePlan::build(target, source, &self.options, &mut stages)?;
        let changed_parameters = plan.changed_parameters();
        let duplicate_runs = plan.duplicate_runs().to_vec();
        let trial_parameter = plan.trial_parameter().cloned();
        let length_before = target.len();
        let (changes, retained) = plan.into_changes();
        let (merge_name, digest) = info::merge_name(target, source, started);
        let merge_name = info::unused_name(target, merge_name)?;

        stages.advance(MergeStage::ExtendRanges)?;
        let extensions = changes.into_iter().map(|c| (c.target, c.values)).collect();
        let added = target.append_runs(extensions, &retained)?;

        stages.advance(MergeStage::RenumberRuns)?;
        let names: IndexMap<String, String> = retained
            .iter()
            .zip(added)
            .map(|(record, (_, name))| (record.name.clone(), name))
            .collect();
        let renames = RunRenames::new(source.ledger().naming().clone(), names);

        stages.advance(MergeStage::RewriteSubtrees)?;
        let mut renamed = rewrite::run_subtrees(target, source, &renames)?;
        if !self.options.ignore_results {
            renamed.extend(rewrite::trajectory_results(target, source)?);
        }
        let mut skipped_links = Vec::new();
        if !self.options.ignore_derived_parameters {
            let (shared, skipped) = rewrite::shared_parameters(target, source, &renames)?;
            renamed.extend(shared);
            skipped_links.extend(skipped);
        }

        stages.advance(MergeStage::RemapLinks)?;
        skipped_links.extend(links::remap(target, source, &renames));

        let merged_runs = retained.len();
        if self.options.keep_info {
            MergeRecord {
                name: &merge_name,
                digest: &digest,
                at: started,
                options: &self.options,
                length_before,
                merged_runs,
                trial_parameter: trial_parameter.as_ref(),
            }
            .write(target, source)?;
        }
        if self.options.merge_config {
            info::copy_config(target, source)?;
        }

        stages.advance(MergeStage::Done)?;
        info!(
            merge = %merge_name,
            runs = target.len(),
            merged_runs,
            skipped_links = skipped_links.len(),
            "merged trajectories"
        );
        Ok(MergeOutcome {
            merge_name,
            other_trajectory: source.name().to_string(),
            changed_parameters,
            merged_runs,
            duplicate_runs,
            run_names: renames.into_names(),
            renames: renamed,
            skipped_links,
        })
    }
}
