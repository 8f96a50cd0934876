//! Per-run views and bookkeeping

use crate::config::RunBranch;
use crate::error::{Result, TrajectoryError};
use crate::ledger::{RunRecord, RunRef};
use crate::roots::RootKind;
use crate::trajectory::Trajectory;
use chrono::Utc;
use indexmap::IndexMap;
use tracing::{debug, info};
use trajex_leaf::{NodePath, Value};
use trajex_tree::{NodeId, ResolveOptions};

impl Trajectory {
    /// Call `f` once per run with that run selected
    ///
    /// Defaults are restored afterwards, also when `f` fails.
    ///
    /// # Errors
    /// The first error returned by `f`
    pub fn for_each_run<F, E>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Self, &RunRecord) -> Result<(), E>,
        E: From<TrajectoryError>,
    {
        let records: Vec<RunRecord> = self.ledger().records().cloned().collect();
        let mut outcome = Ok(());
        for record in &records {
            if let Err(e) = self.set_cursor(Some(RunRef::Index(record.index))) {
                outcome = Err(e.into());
                break;
            }
            if let Err(e) = f(self, record) {
                outcome = Err(e);
                break;
            }
        }
        self.restore_default();
        outcome
    }

    /// Item `name` below each run branch, keyed by run name
    ///
    /// With `include_shared`, a match below the shared branch is listed
    /// under the shared name.
    ///
    /// # Errors
    /// Returns a path error for a malformed `name`
    pub fn get_from_runs(&self, name: &str, include_shared: bool) -> Result<IndexMap<String, NodeId>> {
        let query: NodePath = name.parse()?;
        let naming = self.ledger().naming();
        let options = ResolveOptions::default().without_links();

        let mut found = IndexMap::new();
        for m in self.tree().find_all(&NodePath::root(), &query, &options)? {
            let key = match naming.branch_of(&m.path) {
                RunBranch::Run(index) => match self.ledger().to_name(index) {
                    Ok(run) => run.to_string(),
                    Err(_) => continue,
                },
                RunBranch::Shared if include_shared => naming.shared().to_string(),
                _ => continue,
            };
            found.entry(key).or_insert(m.node);
        }
        found.sort_by(|a, _, b, _| a.cmp(b));
        debug!(name, runs = found.len(), "collected items from runs");
        Ok(found)
    }

    /// Indices of the runs whose values of `names` satisfy `predicate`
    ///
    /// The predicate sees one value per name, in the order given.
    ///
    /// # Errors
    /// Lookup failures and [`TrajectoryError::EmptyLeaf`]
    pub fn find_indices<P>(&self, names: &[&str], mut predicate: P) -> Result<Vec<usize>>
    where
        P: FnMut(&[&Value]) -> bool,
    {
        let mut leaves = Vec::with_capacity(names.len());
        for name in names {
            let id = self.resolve(name)?;
            let node = self.node(id)?;
            let leaf = node.leaf().ok_or_else(|| TrajectoryError::NotAParameter {
                path: node.full_name().to_string(),
            })?;
            leaves.push((node.full_name(), leaf));
        }

        let mut indices = Vec::new();
        for record in self.ledger().records() {
            let position = self
                .ledger()
                .position(record.index)
                .ok_or_else(|| TrajectoryError::run_not_found(record.index))?;
            let mut values = Vec::with_capacity(leaves.len());
            for (path, leaf) in &leaves {
                let value = leaf.value_at(position).ok_or_else(|| TrajectoryError::EmptyLeaf {
                    path: path.to_string(),
                })?;
                values.push(value);
            }
            if predicate(&values) {
                indices.push(record.index);
            }
        }
        Ok(indices)
    }

    /// Nodes named after run `index` below `derived_parameters` and `results`
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn run_branch_nodes(&self, run: &RunRef) -> Result<Vec<NodePath>> {
        let index = self.ledger().index_of(run)?;
        let mut paths: Vec<NodePath> = self
            .tree()
            .iter()
            .map(|(_, node)| node.full_name())
            .filter(|path| RootKind::of(path).is_some_and(RootKind::is_run_scoped))
            .filter(|path| self.ledger().naming().parse(path.last().unwrap_or_default()) == Some(index))
            .cloned()
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Record the start of a run
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn mark_run_started(&mut self, run: &RunRef) -> Result<()> {
        self.ledger_mut().mark_started(run, Utc::now())
    }

    /// Record the completion of a run
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn mark_run_completed(&mut self, run: &RunRef) -> Result<()> {
        self.ledger_mut().mark_completed(run, Utc::now())
    }

    /// Complete a run and drop its branches from the tree
    ///
    /// Nodes still linked from outside a branch stay. Returns the removed
    /// full names.
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn finalize_run(&mut self, run: &RunRef) -> Result<Vec<NodePath>> {
        self.mark_run_completed(run)?;
        let mut removed = Vec::new();
        for path in self.run_branch_nodes(run)? {
            if !self.tree().contains(&path) {
                continue;
            }
            removed.extend(self.tree_mut().remove_unreferenced(&path)?);
        }
        info!(run = %run, removed = removed.len(), "finalized run");
        Ok(removed)
    }
}
