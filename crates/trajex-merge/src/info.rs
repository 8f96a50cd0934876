//! Merge bookkeeping below `config.merge`

use crate::error::MergeError;
use crate::options::MergeOptions;
use chrono::{DateTime, Utc};
use tracing::debug;
use trajex_core::{RootKind, Trajectory, TrajectoryError};
use trajex_leaf::{kind, NodePath, Value};

/// Group holding one entry per merge
pub const MERGE_GROUP: &str = "config.merge";

const MERGE_GROUP_COMMENT: &str = "Settings and information of the different merges";

/// Configuration groups copied from the source by a merge
const COPIED_CONFIG: [&str; 3] = ["config.git", "config.environment", MERGE_GROUP];

/// Identifier of one merge and the full digest it is derived from
///
/// The name reads `merge_<7 hex chars>_<%Y_%m_%d_%Hh%Mm%Ss>`. Both lengths
/// enter the digest, so successive merges of the same pair differ even
/// within one second.
#[must_use]
pub fn merge_name(target: &Trajectory, source: &Trajectory, at: DateTime<Utc>) -> (String, String) {
    let mut hasher = blake3::Hasher::new();
    hasher.update(target.name().as_bytes());
    hasher.update(target.created().to_rfc3339().as_bytes());
    hasher.update(target.len().to_string().as_bytes());
    hasher.update(source.name().as_bytes());
    hasher.update(source.created().to_rfc3339().as_bytes());
    hasher.update(source.len().to_string().as_bytes());
    hasher.update(crate::VERSION.as_bytes());
    let digest = hex::encode(hasher.finalize().as_bytes());
    let name = format!("merge_{}_{}", &digest[..7], at.format("%Y_%m_%d_%Hh%Mm%Ss"));
    (name, digest)
}

/// `name`, or `name_<n>` for the smallest `n` not yet recorded in `target`
pub(crate) fn unused_name(target: &Trajectory, name: String) -> Result<String, MergeError> {
    let group: NodePath = MERGE_GROUP.parse()?;
    if !target.tree().contains(&group.child(name.as_str())) {
        return Ok(name);
    }
    let mut n = 1_usize;
    loop {
        let candidate = format!("{name}_{n}");
        if !target.tree().contains(&group.child(candidate.as_str())) {
            debug!(merge = %candidate, "merge name taken, using suffix");
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Everything recorded about one merge
#[derive(Debug)]
pub(crate) struct MergeRecord<'a> {
    pub(crate) name: &'a str,
    pub(crate) digest: &'a str,
    pub(crate) at: DateTime<Utc>,
    pub(crate) options: &'a MergeOptions,
    pub(crate) length_before: usize,
    pub(crate) merged_runs: usize,
    pub(crate) trial_parameter: Option<&'a NodePath>,
}

impl MergeRecord<'_> {
    /// Write the record into `target`
    pub(crate) fn write(&self, target: &mut Trajectory, source: &Trajectory) -> Result<(), MergeError> {
        let group: NodePath = MERGE_GROUP.parse()?;
        target.ensure_group_at(&group)?;
        target.set_comment(&group, MERGE_GROUP_COMMENT)?;
        let base = group.child(self.name);

        let count = |n: usize| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
        let mut entries = vec![
            ("timestamp", Value::Int(self.at.timestamp()), "Timestamp of the merge"),
            ("hexsha", Value::Str(self.digest.to_string()), "Digest identifying the merge"),
            (
                "remove_duplicates",
                Value::Bool(self.options.remove_duplicates),
                "Whether duplicate runs were removed",
            ),
            (
                "ignore_derived_parameters",
                Value::Bool(self.options.ignore_derived_parameters),
                "Whether derived parameters were ignored",
            ),
            (
                "ignore_results",
                Value::Bool(self.options.ignore_results),
                "Whether trajectory results were ignored",
            ),
            (
                "length_before_merge",
                count(self.length_before),
                "Number of runs before the merge",
            ),
            ("merged_runs", count(self.merged_runs), "Number of runs added"),
        ];
        if let Some(trial) = self.trial_parameter {
            entries.push((
                "trial_parameter",
                Value::Str(trial.to_string()),
                "Parameter numbering repetitions",
            ));
        }
        if self.options.keep_other_info {
            entries.push((
                "other_trajectory.name",
                Value::Str(source.name().to_string()),
                "Name of the merged trajectory",
            ));
            entries.push((
                "other_trajectory.timestamp",
                Value::Str(source.created().to_rfc3339()),
                "Creation time of the merged trajectory",
            ));
            entries.push((
                "other_trajectory.length",
                count(source.len()),
                "Length of the merged trajectory",
            ));
            if !source.config().comment.is_empty() {
                entries.push((
                    "other_trajectory.comment",
                    Value::Str(source.config().comment.clone()),
                    "Comment of the merged trajectory",
                ));
            }
        }

        for (key, value, comment) in entries {
            let path = base.join(&key.parse()?);
            let leaf = target
                .kinds()
                .instantiate_with(kind::PARAMETER, value)
                .map_err(TrajectoryError::from)?
                .with_comment(comment);
            target.add_leaf_at(&path, leaf)?;
        }
        debug!(merge = self.name, "recorded merge");
        Ok(())
    }
}

/// Copy configuration records of `source` that `target` lacks
///
/// Returns the number of copied leaves.
pub(crate) fn copy_config(target: &mut Trajectory, source: &Trajectory) -> Result<usize, MergeError> {
    let groups = COPIED_CONFIG
        .iter()
        .map(|g| g.parse::<NodePath>())
        .collect::<Result<Vec<_>, _>>()?;
    let mut leaves: Vec<(NodePath, trajex_leaf::LeafEntity)> = source
        .tree()
        .leaves()
        .filter(|(_, node)| RootKind::of(node.full_name()) == Some(RootKind::Config))
        .filter(|(_, node)| groups.iter().any(|g| g.is_ancestor_of(node.full_name())))
        .filter(|(_, node)| !target.tree().contains(node.full_name()))
        .filter_map(|(_, node)| Some((node.full_name().clone(), node.leaf()?.clone())))
        .collect();
    leaves.sort_by(|a, b| a.0.cmp(&b.0));

    let copied = leaves.len();
    for (path, leaf) in leaves {
        target.add_leaf_at(&path, leaf)?;
    }
    if copied > 0 {
        debug!(copied, "copied configuration records");
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trajex_core::RootGroup;
    use trajex_test_utils::create_trajectory;

    #[test]
    fn merge_name_format() {
        let a = create_trajectory("a");
        let b = create_trajectory("b");
        let at = DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
            .unwrap()
            .with_timezone(&Utc);
        let (name, digest) = merge_name(&a, &b, at);
        assert_eq!(digest.len(), 64);
        assert_eq!(name, format!("merge_{}_2026_03_04_05h06m07s", &digest[..7]));
    }

    #[test]
    fn merge_name_changes_with_length() {
        let mut a = create_trajectory("a");
        a.parameters().add_leaf("x", Some(Value::Int(0))).unwrap();
        let b = a.full_copy();
        let at = Utc::now();
        let (before, _) = merge_name(&a, &b, at);
        a.explore([("x", vec![Value::Int(1), Value::Int(2)])]).unwrap();
        let (after, _) = merge_name(&a, &b, at);
        assert_ne!(before, after);
    }

    #[test]
    fn taken_names_get_a_suffix() {
        let mut a = create_trajectory("a");
        assert_eq!(unused_name(&a, "merge_x".into()).unwrap(), "merge_x");
        a.config_items().add_leaf("merge.merge_x.timestamp", Some(Value::Int(0))).unwrap();
        assert_eq!(unused_name(&a, "merge_x".into()).unwrap(), "merge_x_1");
        a.config_items().add_leaf("merge.merge_x_1.timestamp", Some(Value::Int(0))).unwrap();
        assert_eq!(unused_name(&a, "merge_x".into()).unwrap(), "merge_x_2");
    }

    #[test]
    fn copies_only_missing_records() {
        let mut a = create_trajectory("a");
        let mut b = create_trajectory("b");
        a.config_items()
            .add_leaf("git.commit", Some(Value::Str("abc".into())))
            .unwrap();
        b.config_items()
            .add_leaf("git.commit", Some(Value::Str("def".into())))
            .unwrap();
        b.config_items()
            .add_leaf("environment.host", Some(Value::Str("node1".into())))
            .unwrap();
        b.config_items()
            .add_leaf("other.flag", Some(Value::Bool(true)))
            .unwrap();

        assert_eq!(copy_config(&mut a, &b).unwrap(), 1);
        assert_eq!(a.value("config.git.commit").unwrap(), &Value::Str("abc".into()));
        assert_eq!(
            a.value("config.environment.host").unwrap(),
            &Value::Str("node1".into())
        );
        assert!(a.get("config.other.flag").is_err());
    }
}
