//! Read-only merge plan
//!
//! Everything that decides what the target receives is computed here, from
//! shared references only. A plan that builds successfully can be applied
//! without further validation failures from the parameter space.

use crate::error::MergeError;
use crate::options::MergeOptions;
use crate::stage::{MergeStage, StageTracker};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use trajex_core::{RootKind, RunBranch, RunRecord, Trajectory};
use trajex_leaf::{LeafEntity, LeafKind, NodePath, Value};
use trajex_tree::NodeId;

/// One space-defining leaf present in both trajectories
#[derive(Debug, Clone)]
struct SpaceEntry {
    name: NodePath,
    target: NodeId,
    source: NodeId,
}

/// New values for one target leaf
#[derive(Debug, Clone)]
pub(crate) struct PlannedChange {
    pub(crate) name: NodePath,
    pub(crate) target: NodeId,
    pub(crate) values: Vec<Value>,
}

/// What a merge will do, before anything is changed
#[derive(Debug, Clone)]
pub struct MergePlan {
    changes: Vec<PlannedChange>,
    retained: Vec<RunRecord>,
    duplicates: Vec<String>,
    deduplicated: bool,
    trial_parameter: Option<NodePath>,
}

impl MergePlan {
    /// Full names of the parameters receiving new values
    #[must_use]
    pub fn changed_parameters(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.name.to_string()).collect()
    }

    /// Source runs to carry over, in source order
    #[inline]
    #[must_use]
    pub fn retained_runs(&self) -> &[RunRecord] {
        &self.retained
    }

    /// Source runs dropped as duplicates
    #[inline]
    #[must_use]
    pub fn duplicate_runs(&self) -> &[String] {
        &self.duplicates
    }

    /// Whether duplicate removal was applied
    #[inline]
    #[must_use]
    pub fn deduplicated(&self) -> bool {
        self.deduplicated
    }

    /// Full name of the trial parameter, if any
    #[inline]
    #[must_use]
    pub fn trial_parameter(&self) -> Option<&NodePath> {
        self.trial_parameter.as_ref()
    }

    pub(crate) fn into_changes(self) -> (Vec<PlannedChange>, Vec<RunRecord>) {
        (self.changes, self.retained)
    }

    pub(crate) fn build(
        target: &Trajectory,
        source: &Trajectory,
        options: &MergeOptions,
        stages: &mut StageTracker,
    ) -> Result<Self, MergeError> {
        if options.trial_parameter.is_some() && options.remove_duplicates {
            return Err(MergeError::TrialWithDeduplication);
        }

        let space = check_compatibility(target, source, options.ignore_derived_parameters)?;
        let trial = options
            .trial_parameter
            .as_deref()
            .map(|query| trial_shift(target, source, query, &space))
            .transpose()?;

        stages.advance(MergeStage::MarkChanges)?;
        let (marked, dedup_possible) = mark_changes(target, source, &space, trial.as_ref())?;

        let positions = source_positions(source)?;
        let mut retained: Vec<(usize, RunRecord)> = positions;
        let mut duplicates = Vec::new();
        let deduplicated = options.remove_duplicates && dedup_possible;
        if options.remove_duplicates && !dedup_possible {
            info!("fixed parameters differ, source runs cannot duplicate target runs");
        }
        if deduplicated {
            stages.advance(MergeStage::Dedup)?;
            let (kept, dropped): (Vec<_>, Vec<_>) = retained
                .into_iter()
                .partition(|(position, _)| !is_duplicate(target, source, &marked, *position));
            duplicates = dropped.into_iter().map(|(_, r)| r.name).collect();
            retained = kept;
            debug!(duplicates = duplicates.len(), "removed duplicate runs");
        }
        if retained.is_empty() {
            return Err(MergeError::NothingToMerge {
                source_name: source.name().to_string(),
            });
        }

        let mut changes = Vec::with_capacity(marked.len());
        for entry in &marked {
            let leaf = leaf_of(source, entry.source)?;
            let shift = trial
                .as_ref()
                .filter(|(name, _)| name == &entry.name)
                .map(|(_, shift)| *shift);
            let mut values = Vec::with_capacity(retained.len());
            for (position, _) in &retained {
                let value = leaf.value_at(*position).ok_or_else(|| {
                    trajex_core::TrajectoryError::EmptyLeaf {
                        path: entry.name.to_string(),
                    }
                })?;
                values.push(match (shift, value) {
                    (Some(shift), Value::Int(i)) => Value::Int(i + shift),
                    _ => value.clone(),
                });
            }
            changes.push(PlannedChange {
                name: entry.name.clone(),
                target: entry.target,
                values,
            });
        }

        Ok(Self {
            changes,
            retained: retained.into_iter().map(|(_, r)| r).collect(),
            duplicates,
            deduplicated,
            trial_parameter: trial.map(|(name, _)| name),
        })
    }
}

/// Space-defining leaves: every parameter and, unless ignored, every derived
/// parameter outside the run branches
fn space_of(traj: &Trajectory, ignore_derived: bool) -> BTreeMap<NodePath, NodeId> {
    traj.tree()
        .leaves()
        .filter(|(_, node)| match RootKind::of(node.full_name()) {
            Some(RootKind::Parameters) => true,
            Some(RootKind::DerivedParameters) => !ignore_derived,
            _ => false,
        })
        .filter(|(_, node)| traj.branch_of(node.full_name()) == RunBranch::Trajectory)
        .map(|(id, node)| (node.full_name().clone(), id))
        .collect()
}

fn check_compatibility(
    target: &Trajectory,
    source: &Trajectory,
    ignore_derived: bool,
) -> Result<Vec<SpaceEntry>, MergeError> {
    let ours = space_of(target, ignore_derived);
    let theirs = space_of(source, ignore_derived);

    let only_in_target: Vec<String> = ours
        .keys()
        .filter(|k| !theirs.contains_key(*k))
        .map(ToString::to_string)
        .collect();
    let only_in_source: Vec<String> = theirs
        .keys()
        .filter(|k| !ours.contains_key(*k))
        .map(ToString::to_string)
        .collect();
    if !only_in_target.is_empty() || !only_in_source.is_empty() {
        return Err(MergeError::IncompatibleSpace {
            only_in_target,
            only_in_source,
        });
    }

    let mut entries = Vec::with_capacity(ours.len());
    for (name, target_id) in ours {
        let source_id = theirs[&name];
        let ours = leaf_of(target, target_id)?;
        let theirs = leaf_of(source, source_id)?;
        let compatible = match (ours.default_value(), theirs.default_value()) {
            (Some(a), Some(b)) => ours.kind().same_type(a, b),
            (None, None) => true,
            _ => false,
        };
        if !compatible {
            return Err(MergeError::IncompatibleTypes {
                name: name.to_string(),
            });
        }
        entries.push(SpaceEntry {
            name,
            target: target_id,
            source: source_id,
        });
    }
    Ok(entries)
}

/// Full name of the trial parameter and the shift applied to source values
fn trial_shift(
    target: &Trajectory,
    source: &Trajectory,
    query: &str,
    space: &[SpaceEntry],
) -> Result<(NodePath, i64), MergeError> {
    let id = target
        .resolve(query)
        .map_err(|e| MergeError::trial(query, e.to_string()))?;
    let entry = space
        .iter()
        .find(|e| e.target == id)
        .ok_or_else(|| MergeError::trial(query, "not a parameter"))?;

    let highest_target = trial_maximum(leaf_of(target, entry.target)?, query, target.name())?;
    trial_maximum(leaf_of(source, entry.source)?, query, source.name())?;
    Ok((entry.name.clone(), highest_target + 1))
}

/// Largest trial value; the values must form exactly `0..=max`
fn trial_maximum(leaf: &LeafEntity, query: &str, owner: &str) -> Result<i64, MergeError> {
    let values: Vec<&Value> = if leaf.is_explored() {
        leaf.range().iter().collect()
    } else {
        leaf.default_value().into_iter().collect()
    };
    let mut seen = BTreeSet::new();
    for value in values {
        let i = value
            .as_int()
            .ok_or_else(|| MergeError::trial(query, format!("non-integer value in '{owner}'")))?;
        seen.insert(i);
    }
    let Some(&max) = seen.last() else {
        return Err(MergeError::trial(query, format!("no value in '{owner}'")));
    };
    let contiguous = seen.first() == Some(&0)
        && usize::try_from(max).is_ok_and(|m| m + 1 == seen.len());
    if !contiguous {
        return Err(MergeError::trial(
            query,
            format!("values in '{owner}' are not 0..={max}"),
        ));
    }
    Ok(max)
}

/// Entries needing new values, and whether duplicates can exist at all
fn mark_changes(
    target: &Trajectory,
    source: &Trajectory,
    space: &[SpaceEntry],
    trial: Option<&(NodePath, i64)>,
) -> Result<(Vec<SpaceEntry>, bool), MergeError> {
    let mut marked = Vec::new();
    let mut dedup_possible = true;
    for entry in space {
        if trial.is_some_and(|(name, _)| name == &entry.name) {
            marked.push(entry.clone());
            continue;
        }
        let ours = leaf_of(target, entry.target)?;
        let theirs = leaf_of(source, entry.source)?;
        if ours.is_explored() || theirs.is_explored() {
            marked.push(entry.clone());
            continue;
        }
        if !equal(ours.kind().as_ref(), ours.default_value(), theirs.default_value()) {
            debug!(parameter = %entry.name, "fixed parameter differs");
            dedup_possible = false;
            marked.push(entry.clone());
        }
    }
    if marked.is_empty() {
        warn!("no parameter differs between the trajectories");
    }
    Ok((marked, dedup_possible))
}

/// Whether the source run at `position` matches some target run on every
/// marked parameter
fn is_duplicate(
    target: &Trajectory,
    source: &Trajectory,
    marked: &[SpaceEntry],
    position: usize,
) -> bool {
    let pairs: Vec<(&LeafEntity, &LeafEntity)> = marked
        .iter()
        .filter_map(|e| Some((leaf_of(target, e.target).ok()?, leaf_of(source, e.source).ok()?)))
        .collect();
    (0..target.len()).any(|run| {
        pairs.iter().all(|(ours, theirs)| {
            equal(
                ours.kind().as_ref(),
                ours.value_at(run),
                theirs.value_at(position),
            )
        })
    })
}

fn equal(kind: &dyn LeafKind, a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => kind.equal_values(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Source records paired with their range position
fn source_positions(source: &Trajectory) -> Result<Vec<(usize, RunRecord)>, MergeError> {
    source
        .ledger()
        .records()
        .map(|record| {
            source
                .ledger()
                .position(record.index)
                .map(|position| (position, record.clone()))
                .ok_or_else(|| trajex_core::TrajectoryError::run_not_found(record.index).into())
        })
        .collect()
}

fn leaf_of(traj: &Trajectory, id: NodeId) -> Result<&LeafEntity, MergeError> {
    let node = traj.node(id)?;
    node.leaf().ok_or_else(|| {
        trajex_tree::TreeError::NotALeaf {
            path: node.full_name().to_string(),
        }
        .into()
    })
}
