//! Exploration and expansion of the parameter space
//!
//! Exploring turns parameter leaves into per-run sequences of equal length
//! and sizes the run ledger to match. Every call validates all of its targets
//! before touching any leaf.

use crate::error::{Result, TrajectoryError};
use crate::ledger::{RunRecord, RunRef};
use crate::roots::RootKind;
use crate::trajectory::Trajectory;
use indexmap::IndexSet;
use tracing::{debug, info};
use trajex_leaf::{LeafEntity, LeafError, NodePath, Value};
use trajex_tree::{NodeId, TreeError};

/// Settings for [`Trajectory::expand_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Accept that runs added to a stored trajectory are not stored yet
    pub acknowledge_pending_storage: bool,
}

impl ExpandOptions {
    /// Default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge pending storage
    #[inline]
    #[must_use]
    pub fn acknowledging_pending_storage(mut self) -> Self {
        self.acknowledge_pending_storage = true;
        self
    }
}

struct Target {
    id: NodeId,
    path: NodePath,
    values: Vec<Value>,
}

impl Trajectory {
    /// Explore parameters, one sequence per leaf
    ///
    /// Keys are lookups (shortcuts allowed); all sequences must share one
    /// length. An empty input does nothing.
    ///
    /// # Errors
    /// - [`TrajectoryError::MustExpand`] if explored with completed runs
    /// - [`TrajectoryError::NotAParameter`] for targets outside `parameters`
    ///   or of a non-parameter kind
    /// - [`TrajectoryError::DuplicateTarget`] if two keys hit one leaf
    /// - [`TrajectoryError::RangeLengthMismatch`] for unequal lengths, or a
    ///   length differing from the current one once runs exist
    /// - leaf errors (locked, already explored, empty, type mismatch)
    pub fn explore<K, I>(&mut self, targets: I) -> Result<()>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Vec<Value>)>,
    {
        let targets = self.resolve_targets(targets)?;
        let Some(first) = targets.first() else {
            return Ok(());
        };
        if self.is_explored() && self.ledger().any_completed() {
            return Err(TrajectoryError::MustExpand);
        }

        let length = first.values.len();
        let required = (self.is_explored() || self.len() > 1).then_some(self.len());
        for target in &targets {
            let expected = required.unwrap_or(length);
            if target.values.len() != expected {
                return Err(TrajectoryError::RangeLengthMismatch {
                    path: target.path.to_string(),
                    expected,
                    found: target.values.len(),
                });
            }
            self.tree()
                .leaf(&target.path)?
                .check_explore(&target.values)
                .map_err(|e| TreeError::leaf(&target.path, e))?;
        }

        let count = targets.len();
        for target in targets {
            let (path, leaf) = self.leaf_by_id_mut(target.id)?;
            leaf.explore(target.values)
                .map_err(|e| TreeError::leaf(path, e))?;
            self.explored_mut().insert(target.id);
        }
        let first_new = self.len();
        while self.len() < length {
            self.ledger_mut().add_run();
        }
        self.refresh_summaries(0)?;
        self.apply_cursor()?;
        info!(parameters = count, runs = self.len(), new_runs = self.len() - first_new, "explored");
        Ok(())
    }

    /// Append values to every explored parameter
    ///
    /// # Errors
    /// Same as [`expand_with`](Self::expand_with) with default options
    pub fn expand<K, I>(&mut self, targets: I) -> Result<()>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Vec<Value>)>,
    {
        self.expand_with(targets, ExpandOptions::default())
    }

    /// Append values to every explored parameter
    ///
    /// The keys must resolve to exactly the explored set. Runs are added
    /// for the new values.
    ///
    /// # Errors
    /// - [`TrajectoryError::PendingStorage`] for a stored trajectory without
    ///   acknowledgement
    /// - [`TrajectoryError::IncompatibleExpansion`] if the keys differ from
    ///   the explored set
    /// - [`TrajectoryError::RangeLengthMismatch`] for unequal lengths
    /// - leaf errors (locked, type mismatch)
    pub fn expand_with<K, I>(&mut self, targets: I, options: ExpandOptions) -> Result<()>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Vec<Value>)>,
    {
        if self.stored && !options.acknowledge_pending_storage {
            return Err(TrajectoryError::PendingStorage);
        }
        let targets = self.resolve_targets(targets)?;

        let given: IndexSet<NodeId> = targets.iter().map(|t| t.id).collect();
        let explored: IndexSet<NodeId> = self.explored_ids().collect();
        if given != explored {
            let name = |id: &NodeId| {
                self.tree()
                    .node(*id)
                    .map(|n| n.full_name().to_string())
                    .unwrap_or_default()
            };
            return Err(TrajectoryError::IncompatibleExpansion {
                missing: explored.difference(&given).map(&name).collect(),
                unexpected: given.difference(&explored).map(&name).collect(),
            });
        }
        let Some(first) = targets.first() else {
            return Ok(());
        };

        let length = first.values.len();
        for target in &targets {
            if target.values.len() != length {
                return Err(TrajectoryError::RangeLengthMismatch {
                    path: target.path.to_string(),
                    expected: length,
                    found: target.values.len(),
                });
            }
            self.tree()
                .leaf(&target.path)?
                .check_expand(&target.values)
                .map_err(|e| TreeError::leaf(&target.path, e))?;
        }

        for target in targets {
            let (path, leaf) = self.leaf_by_id_mut(target.id)?;
            leaf.expand(target.values)
                .map_err(|e| TreeError::leaf(path, e))?;
        }
        let first_new = self.len();
        for _ in 0..length {
            self.ledger_mut().add_run();
        }
        if self.stored {
            self.expansion_not_stored = true;
        }
        self.refresh_summaries(first_new)?;
        info!(new_runs = length, runs = self.len(), "expanded");
        Ok(())
    }

    /// Drop every exploration range and go back to a single run
    ///
    /// # Errors
    /// - [`TrajectoryError::AlreadyStored`] once stored
    /// - a locked-leaf error if an explored leaf is locked
    pub fn shrink(&mut self) -> Result<()> {
        if self.stored {
            return Err(TrajectoryError::AlreadyStored);
        }
        let explored: Vec<NodeId> = self.explored_ids().collect();
        for &id in &explored {
            let node = self.node(id)?;
            if node.leaf().is_some_and(LeafEntity::is_locked) {
                return Err(TreeError::leaf(node.full_name(), LeafError::Locked).into());
            }
        }
        for id in explored {
            let (path, leaf) = self.leaf_by_id_mut(id)?;
            leaf.shrink().map_err(|e| TreeError::leaf(path, e))?;
        }
        self.explored_mut().clear();
        self.ledger_mut().reset();
        info!("shrunk trajectory to a single run");
        Ok(())
    }

    /// Append runs carried over from another trajectory
    ///
    /// Each extension lists the new values of one leaf, one per record.
    /// Explored leaves are expanded; unexplored ones are explored with one
    /// copy of their default per existing run followed by the new values.
    /// Leaves are unlocked first. Returns the new `(index, name)` pairs.
    ///
    /// # Errors
    /// - [`TrajectoryError::RangeLengthMismatch`] if an extension does not
    ///   hold one value per record
    /// - [`TrajectoryError::IncompatibleExpansion`] if an explored leaf has no
    ///   extension
    /// - [`TrajectoryError::EmptyLeaf`] for an unexplored leaf without default
    /// - leaf errors (type mismatch, non-parameter kind)
    pub fn append_runs(
        &mut self,
        extensions: Vec<(NodeId, Vec<Value>)>,
        records: &[RunRecord],
    ) -> Result<Vec<(usize, String)>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let length = self.len();
        let covered: IndexSet<NodeId> = extensions.iter().map(|(id, _)| *id).collect();
        let missing: Vec<String> = self
            .explored_ids()
            .filter(|id| !covered.contains(id))
            .filter_map(|id| self.tree().node(id).map(|n| n.full_name().to_string()))
            .collect();
        if !missing.is_empty() {
            return Err(TrajectoryError::IncompatibleExpansion {
                missing,
                unexpected: Vec::new(),
            });
        }

        let mut planned = Vec::with_capacity(extensions.len());
        for (id, values) in extensions {
            let node = self.node(id)?;
            let path = node.full_name().clone();
            if values.len() != records.len() {
                return Err(TrajectoryError::RangeLengthMismatch {
                    path: path.to_string(),
                    expected: records.len(),
                    found: values.len(),
                });
            }
            let leaf = node.leaf().ok_or_else(|| TreeError::NotALeaf {
                path: path.to_string(),
            })?;
            let mut probe = leaf.clone();
            probe.unlock();
            let checked = if probe.is_explored() {
                probe.check_expand(&values).map(|()| values)
            } else {
                let default = probe.default_value().cloned().ok_or_else(|| {
                    TrajectoryError::EmptyLeaf {
                        path: path.to_string(),
                    }
                })?;
                let mut full = vec![default; length];
                full.extend(values);
                probe.check_explore(&full).map(|()| full)
            };
            let values = checked.map_err(|e| TreeError::leaf(&path, e))?;
            planned.push((id, values));
        }

        for (id, values) in planned {
            let (path, leaf) = self.leaf_by_id_mut(id)?;
            leaf.unlock();
            let applied = if leaf.is_explored() {
                leaf.expand(values)
            } else {
                leaf.explore(values)
            };
            applied.map_err(|e| TreeError::leaf(path, e))?;
            self.explored_mut().insert(id);
        }

        let added: Vec<(usize, String)> = records
            .iter()
            .map(|record| self.ledger_mut().adopt(record))
            .collect();
        if self.stored {
            self.expansion_not_stored = true;
        }
        self.apply_cursor()?;
        debug!(runs = added.len(), "appended runs");
        Ok(added)
    }

    fn resolve_targets<K, I>(&self, targets: I) -> Result<Vec<Target>>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Vec<Value>)>,
    {
        let mut seen = IndexSet::new();
        let mut resolved = Vec::new();
        for (key, values) in targets {
            let id = self.resolve(key.as_ref())?;
            let node = self.node(id)?;
            let path = node.full_name().clone();
            let is_parameter = RootKind::of(&path) == Some(RootKind::Parameters)
                && node.leaf().is_some_and(|l| l.kind().is_parameter());
            if !is_parameter {
                return Err(TrajectoryError::NotAParameter {
                    path: path.to_string(),
                });
            }
            if !seen.insert(id) {
                return Err(TrajectoryError::DuplicateTarget {
                    path: path.to_string(),
                });
            }
            resolved.push(Target { id, path, values });
        }
        Ok(resolved)
    }

    /// Rewrite the summary of every run with index `first` or above
    fn refresh_summaries(&mut self, first: usize) -> Result<()> {
        let explored: Vec<(String, Vec<Value>)> = self.explored_values().into_iter().collect();
        let runs: Vec<(usize, usize)> = self
            .ledger()
            .records()
            .map(|r| r.index)
            .filter(|&index| index >= first)
            .filter_map(|index| Some((index, self.ledger().position(index)?)))
            .collect();
        for (index, position) in runs {
            let summary = explored
                .iter()
                .filter_map(|(name, range)| {
                    let short = name.rsplit('.').next().unwrap_or(name);
                    range.get(position).map(|v| format!("{short}: {v}"))
                })
                .collect::<Vec<_>>()
                .join(", ");
            self.ledger_mut().set_summary(&RunRef::Index(index), summary)?;
        }
        Ok(())
    }
}
