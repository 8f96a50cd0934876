//! Link remapping
//!
//! Link failures never abort a merge. Each skipped link is returned as a
//! [`SkippedLink`] and logged.

use crate::rename::RunRenames;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use tracing::{debug, error, warn};
use trajex_core::{RunBranch, Trajectory};
use trajex_leaf::ErrorClass;

/// Why a source link was not re-created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Source or target lies below the shared branch
    SharedBranch,
    /// Link name is the shared sentinel
    SharedName,
    /// An endpoint belongs to a run that was not carried over
    DiscardedRun,
    /// Link could not be created in the target
    Unresolvable(String),
}

/// Source link left out of the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLink {
    /// Full name of the group holding the link
    pub source: String,
    /// Link name
    pub name: String,
    /// Full name of the linked node
    pub target: String,
    /// Why it was skipped
    pub reason: SkipReason,
}

impl SkippedLink {
    /// Error class for links that should have been created but could not
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        matches!(self.reason, SkipReason::Unresolvable(_)).then_some(ErrorClass::UnresolvableLink)
    }
}

impl Display for SkippedLink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}: ", self.source, self.name, self.target)?;
        match &self.reason {
            SkipReason::SharedBranch => write!(f, "shared branch"),
            SkipReason::SharedName => write!(f, "shared link name"),
            SkipReason::DiscardedRun => write!(f, "run not merged"),
            SkipReason::Unresolvable(why) => write!(f, "unresolvable: {why}"),
        }
    }
}

/// Re-create every link of `source` in `target` with renamed endpoints
pub(crate) fn remap(
    target: &mut Trajectory,
    source: &Trajectory,
    renames: &RunRenames,
) -> Vec<SkippedLink> {
    let naming = renames.naming();
    let mut skipped = Vec::new();
    let mut created = 0_usize;

    for entry in source.tree().links().entries() {
        let (Some(from), Some(to)) = (
            source.tree().node(entry.source),
            source.tree().node(entry.target),
        ) else {
            continue;
        };
        let (from, to) = (from.full_name(), to.full_name());
        let skip = |reason| SkippedLink {
            source: from.to_string(),
            name: entry.name.clone(),
            target: to.to_string(),
            reason,
        };

        if naming.is_shared(&entry.name) {
            skipped.push(skip(SkipReason::SharedName));
            continue;
        }
        if source.branch_of(from) == RunBranch::Shared || source.branch_of(to) == RunBranch::Shared {
            skipped.push(skip(SkipReason::SharedBranch));
            continue;
        }
        let (Some(new_from), Some(new_to)) = (renames.rename(from), renames.rename(to)) else {
            skipped.push(skip(SkipReason::DiscardedRun));
            continue;
        };
        let name = renames.run(&entry.name).unwrap_or(&entry.name);

        if !target.tree().contains(&new_to) {
            skipped.push(skip(SkipReason::Unresolvable(format!(
                "'{new_to}' does not exist in the target"
            ))));
            continue;
        }
        let source_id = match target.ensure_group_at(&new_from) {
            Ok(id) => id,
            Err(e) => {
                skipped.push(skip(SkipReason::Unresolvable(e.to_string())));
                continue;
            }
        };
        if let Some(existing) = target.tree().links().target(source_id, name) {
            if target.tree().id_of(&new_to) == Some(existing) {
                debug!(source = %new_from, name, "link already present");
            } else {
                let taken_by = target
                    .tree()
                    .node(existing)
                    .map_or_else(String::new, |n| n.full_name().to_string());
                skipped.push(skip(SkipReason::Unresolvable(format!(
                    "link name taken by a link to '{taken_by}'"
                ))));
            }
            continue;
        }
        match target.add_link(&new_from.to_string(), name, &new_to.to_string()) {
            Ok(()) => created += 1,
            Err(e) => {
                error!(source = %new_from, name, error = %e, "could not create link");
                skipped.push(skip(SkipReason::Unresolvable(e.to_string())));
            }
        }
    }

    for link in &skipped {
        match link.reason {
            SkipReason::DiscardedRun => debug!(link = %link, "skipped link"),
            _ => warn!(link = %link, "skipped link"),
        }
    }
    debug!(created, skipped = skipped.len(), "remapped links");
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unresolvable_links_have_a_class() {
        let mut link = SkippedLink {
            source: "results".into(),
            name: "l".into(),
            target: "results.run_ALL.x".into(),
            reason: SkipReason::SharedBranch,
        };
        assert_eq!(link.class(), None);
        assert_eq!(link.to_string(), "results.l -> results.run_ALL.x: shared branch");
        link.reason = SkipReason::Unresolvable("gone".into());
        assert_eq!(link.class(), Some(ErrorClass::UnresolvableLink));
    }
}
