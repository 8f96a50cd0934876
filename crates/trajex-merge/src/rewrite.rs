//! Re-creating source nodes in the target
//!
//! Leaves are created empty: their data is copied by the storage service
//! using the returned rename pairs.

use crate::error::MergeError;
use crate::links::{SkipReason, SkippedLink};
use crate::rename::RunRenames;
use tracing::{debug, warn};
use trajex_core::{RootKind, RunBranch, Trajectory};
use trajex_leaf::NodePath;
use trajex_tree::Node;

/// Old → new full names of the leaves created in the target
pub(crate) type Renamed = Vec<(NodePath, NodePath)>;

/// Re-create every node of the carried-over run branches
pub(crate) fn run_subtrees(
    target: &mut Trajectory,
    source: &Trajectory,
    renames: &RunRenames,
) -> Result<Renamed, MergeError> {
    let nodes = sorted_nodes(source, |node| {
        RootKind::of(node.full_name()).is_some_and(RootKind::is_run_scoped)
            && renames.is_moved(node.full_name())
    });

    let mut renamed = Vec::new();
    for node in nodes {
        let Some(path) = renames.rename(node.full_name()) else {
            continue;
        };
        if target.tree().contains(&path) {
            warn!(path = %path, "run item already present in target, keeping it");
            continue;
        }
        if create_empty(target, source, node, &path)? {
            renamed.push((node.full_name().clone(), path));
        }
    }
    debug!(items = renamed.len(), "re-created run items");
    Ok(renamed)
}

/// Re-create trajectory-level results missing from the target
pub(crate) fn trajectory_results(
    target: &mut Trajectory,
    source: &Trajectory,
) -> Result<Renamed, MergeError> {
    let nodes = sorted_nodes(source, |node| {
        let path = node.full_name();
        path.len() > 1
            && RootKind::of(path) == Some(RootKind::Results)
            && source.branch_of(path) == RunBranch::Trajectory
    });

    let mut renamed = Vec::new();
    for node in nodes {
        let path = node.full_name();
        if target.tree().contains(path) {
            if node.is_leaf() {
                warn!(path = %path, "result exists in both trajectories, keeping the target's");
            }
            continue;
        }
        if create_empty(target, source, node, path)? {
            renamed.push((path.clone(), path.clone()));
        }
    }
    Ok(renamed)
}

/// Materialize shared derived parameters under the first carried-over run
/// lacking the item and link them from the other runs lacking it
///
/// Runs that already hold their own item keep it. Links that cannot be
/// created are returned as skipped and never abort the merge.
pub(crate) fn shared_parameters(
    target: &mut Trajectory,
    source: &Trajectory,
    renames: &RunRenames,
) -> Result<(Renamed, Vec<SkippedLink>), MergeError> {
    let new_names: Vec<String> = renames.new_names().map(str::to_string).collect();
    let naming = renames.naming();

    let mut renamed = Vec::new();
    let mut skipped = Vec::new();
    for node in sorted_nodes(source, |node| {
        node.is_leaf()
            && RootKind::of(node.full_name()) == Some(RootKind::DerivedParameters)
            && source.branch_of(node.full_name()) == RunBranch::Shared
    }) {
        let path = node.full_name();
        let Some(leaf) = node.leaf() else { continue };
        if let Ok(existing) = target.tree().leaf(path) {
            let unchanged = !existing.is_explored()
                && !leaf.is_explored()
                && match (existing.default_value(), leaf.default_value()) {
                    (Some(a), Some(b)) => existing.kind().equal_values(a, b),
                    (a, b) => a.is_none() && b.is_none(),
                };
            if unchanged {
                debug!(path = %path, "shared parameter unchanged");
                continue;
            }
        }

        let positions = path.positions(|s| naming.is_shared(s));
        let mut materialized: Option<NodePath> = None;
        for run in &new_names {
            let item = path.with_replaced(&positions, run);
            if target.tree().contains(&item) {
                debug!(path = %item, "run keeps its own item");
                continue;
            }
            match materialized.clone() {
                None => {
                    target.add_leaf_at(&item, leaf.empty_like())?;
                    renamed.push((path.clone(), item.clone()));
                    materialized = Some(item);
                }
                Some(shared) => {
                    if let Err(why) = link_item(target, &item, &shared) {
                        let link = SkippedLink {
                            source: item.parent().map(|p| p.to_string()).unwrap_or_default(),
                            name: item.last().unwrap_or_default().to_string(),
                            target: shared.to_string(),
                            reason: SkipReason::Unresolvable(why),
                        };
                        warn!(link = %link, "skipped link");
                        skipped.push(link);
                    }
                }
            }
        }
    }
    Ok((renamed, skipped))
}

/// Link `item` (parent group + last segment) to `shared`
fn link_item(target: &mut Trajectory, item: &NodePath, shared: &NodePath) -> Result<(), String> {
    let (Some(parent), Some(name)) = (item.parent(), item.last()) else {
        return Err(format!("'{item}' has no parent group"));
    };
    let parent_id = target.ensure_group_at(&parent).map_err(|e| e.to_string())?;
    if let Some(existing) = target.tree().links().target(parent_id, name) {
        return if target.tree().id_of(shared) == Some(existing) {
            Ok(())
        } else {
            Err(format!("link name '{name}' taken in '{parent}'"))
        };
    }
    target
        .add_link(&parent.to_string(), name, &shared.to_string())
        .map_err(|e| e.to_string())
}

/// Source nodes satisfying `keep`, parents before children
fn sorted_nodes<'a>(source: &'a Trajectory, keep: impl Fn(&Node) -> bool) -> Vec<&'a Node> {
    let mut nodes: Vec<&Node> = source
        .tree()
        .iter()
        .map(|(_, node)| node)
        .filter(|node| keep(node))
        .collect();
    nodes.sort_by(|a, b| a.full_name().cmp(b.full_name()));
    nodes
}

/// Empty copy of a leaf, or a group when it carries a comment or is
/// linked from somewhere in `source`
///
/// Returns whether a leaf was created.
fn create_empty(
    target: &mut Trajectory,
    source: &Trajectory,
    node: &Node,
    path: &NodePath,
) -> Result<bool, MergeError> {
    if let Some(leaf) = node.leaf() {
        target.add_leaf_at(path, leaf.empty_like())?;
        return Ok(true);
    }
    let linked = source
        .tree()
        .id_of(node.full_name())
        .and_then(|id| source.tree().links().reverse_lookup(id))
        .is_some_and(|sources| !sources.is_empty());
    if !node.comment().is_empty() {
        target.ensure_group_at(path)?;
        target.set_comment(path, node.comment())?;
    } else if linked {
        target.ensure_group_at(path)?;
    }
    Ok(false)
}
