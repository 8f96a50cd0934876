//! The trajectory aggregate
//!
//! A [`Trajectory`] owns the named tree, the run ledger and the set of
//! explored leaves, and keeps them consistent: every explored leaf has one
//! value per run, and while a run is selected every explored leaf reports
//! that run's value.

use crate::config::{RunBranch, TrajectoryConfig};
use crate::error::{Result, TrajectoryError};
use crate::ledger::{RunLedger, RunRef};
use crate::roots::{ensure_rooted, RootHandle, RootKind};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeMap;
use tracing::{debug, info};
use trajex_leaf::{KindRegistry, LeafEntity, NodePath, Value};
use trajex_tree::{single_match, Match, NamedTree, Node, NodeId, ResolveOptions, TreeError};

/// Where and how a lookup searches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Node the query is relative to
    pub start: NodePath,
    /// Shortcut, depth and link settings
    pub options: ResolveOptions,
    /// While a run is selected, ignore the shared branch
    pub exclude_shared: bool,
}

impl Lookup {
    /// Lookup from the tree root
    #[must_use]
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            start: NodePath::root(),
            options,
            exclude_shared: false,
        }
    }

    /// Start below another node
    #[inline]
    #[must_use]
    pub fn from_node(mut self, start: NodePath) -> Self {
        self.start = start;
        self
    }

    /// Ignore the shared branch while a run is selected
    #[inline]
    #[must_use]
    pub fn excluding_shared(mut self) -> Self {
        self.exclude_shared = true;
        self
    }
}

/// Hierarchical namespace evaluated over a set of runs
#[derive(Debug, Clone)]
pub struct Trajectory {
    config: TrajectoryConfig,
    kinds: KindRegistry,
    tree: NamedTree,
    ledger: RunLedger,
    explored: IndexSet<NodeId>,
    created: DateTime<Utc>,
    pub(crate) stored: bool,
    pub(crate) expansion_not_stored: bool,
}

impl Trajectory {
    /// Create trajectory with the built-in leaf kinds
    ///
    /// # Errors
    /// Returns [`TrajectoryError::Config`] for invalid configuration
    pub fn new(config: TrajectoryConfig) -> Result<Self> {
        Self::with_kinds(config, KindRegistry::with_defaults())
    }

    /// Create trajectory with a custom kind registry
    ///
    /// # Errors
    /// Returns [`TrajectoryError::Config`] for invalid configuration
    pub fn with_kinds(config: TrajectoryConfig, kinds: KindRegistry) -> Result<Self> {
        config.validate()?;
        let mut tree = NamedTree::new();
        for root in RootKind::ALL {
            tree.add_group(&root.path())?;
        }
        let ledger = RunLedger::new(config.naming());
        debug!(name = %config.name, "created trajectory");
        Ok(Self {
            config,
            kinds,
            tree,
            ledger,
            explored: IndexSet::new(),
            created: Utc::now(),
            stored: false,
            expansion_not_stored: false,
        })
    }

    /// Trajectory name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Leaf kind registry
    #[inline]
    #[must_use]
    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Read-only tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &NamedTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut NamedTree {
        &mut self.tree
    }

    /// Run ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut RunLedger {
        &mut self.ledger
    }

    /// Number of runs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    /// Always false: a trajectory holds at least one run
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Whether the trajectory was handed to storage
    #[inline]
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Whether runs were added after the last store
    #[inline]
    #[must_use]
    pub fn expansion_not_stored(&self) -> bool {
        self.expansion_not_stored
    }

    /// Branch of a full name with respect to run segments
    #[inline]
    #[must_use]
    pub fn branch_of(&self, path: &NodePath) -> RunBranch {
        self.ledger.naming().branch_of(path)
    }

    /// Handle to one of the roots
    pub fn root(&mut self, root: RootKind) -> RootHandle<'_> {
        RootHandle::new(self, root)
    }

    /// Handle to `config`
    pub fn config_items(&mut self) -> RootHandle<'_> {
        self.root(RootKind::Config)
    }

    /// Handle to `parameters`
    pub fn parameters(&mut self) -> RootHandle<'_> {
        self.root(RootKind::Parameters)
    }

    /// Handle to `derived_parameters`
    pub fn derived_parameters(&mut self) -> RootHandle<'_> {
        self.root(RootKind::DerivedParameters)
    }

    /// Handle to `results`
    pub fn results(&mut self) -> RootHandle<'_> {
        self.root(RootKind::Results)
    }

    /// Lookup with the configured defaults
    #[must_use]
    pub fn lookup(&self) -> Lookup {
        Lookup::new(self.config.resolve_options())
    }

    /// Every candidate for `query`, scoped to the selected run
    ///
    /// While a run is selected, candidates below another run's segment are
    /// dropped unless the query names that segment, and shared-branch
    /// candidates are dropped when the lookup excludes them.
    ///
    /// # Errors
    /// Returns path errors for malformed queries and a not-found error for
    /// a missing start node
    pub fn find_all(&self, query: &str, lookup: &Lookup) -> Result<Vec<Match>> {
        let query: NodePath = query.parse()?;
        let mut matches = self.tree.find_all(&lookup.start, &query, &lookup.options)?;
        self.scope_to_cursor(&query, &mut matches, lookup.exclude_shared);
        Ok(matches)
    }

    fn scope_to_cursor(&self, query: &NodePath, matches: &mut Vec<Match>, exclude_shared: bool) {
        let Some(current) = self.ledger.cursor() else {
            return;
        };
        let naming = self.ledger.naming();
        matches.retain(|m| {
            m.path.iter().all(|seg| {
                if query.contains_segment(seg) {
                    true
                } else if naming.is_shared(seg) {
                    !exclude_shared
                } else {
                    naming.parse(seg).map_or(true, |run| run == current)
                }
            })
        });
    }

    /// Resolve `query` with the configured defaults
    ///
    /// # Errors
    /// - not found for zero candidates
    /// - ambiguous path for several
    pub fn resolve(&self, query: &str) -> Result<NodeId> {
        self.resolve_with(query, &self.lookup())
    }

    /// Resolve `query` with explicit lookup settings
    ///
    /// # Errors
    /// - not found for zero candidates
    /// - ambiguous path for several
    pub fn resolve_with(&self, query: &str, lookup: &Lookup) -> Result<NodeId> {
        let matches = self.find_all(query, lookup)?;
        let query: NodePath = query.parse()?;
        Ok(single_match(&query, matches)?.node)
    }

    /// Node for `query`
    ///
    /// # Errors
    /// Same as [`resolve`](Self::resolve)
    pub fn get(&self, query: &str) -> Result<&Node> {
        let id = self.resolve(query)?;
        self.node(id)
    }

    /// Node by id
    ///
    /// # Errors
    /// Returns a not-found error for stale ids
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.tree.node(id).ok_or_else(|| {
            TreeError::NotFound {
                path: id.to_string(),
            }
            .into()
        })
    }

    /// Leaf for `query`
    ///
    /// # Errors
    /// Same as [`resolve`](Self::resolve), plus not-a-leaf for groups
    pub fn leaf(&self, query: &str) -> Result<&LeafEntity> {
        let node = self.get(query)?;
        node.leaf().ok_or_else(|| {
            TreeError::NotALeaf {
                path: node.full_name().to_string(),
            }
            .into()
        })
    }

    /// Value `query` currently presents
    ///
    /// # Errors
    /// Same as [`leaf`](Self::leaf), plus [`TrajectoryError::EmptyLeaf`]
    pub fn value(&self, query: &str) -> Result<&Value> {
        let node = self.get(query)?;
        node.leaf()
            .and_then(LeafEntity::value)
            .ok_or_else(|| TrajectoryError::EmptyLeaf {
                path: node.full_name().to_string(),
            })
    }

    /// Replace the default value of a leaf
    ///
    /// # Errors
    /// Lookup failures, locked or type-mismatched leaves
    pub fn set_value(&mut self, query: &str, value: Value) -> Result<()> {
        let id = self.resolve(query)?;
        let (path, leaf) = self.leaf_by_id_mut(id)?;
        leaf.set_value(value)
            .map_err(|e| TreeError::leaf(path, e).into())
    }

    /// Lock a leaf
    ///
    /// # Errors
    /// Lookup failures
    pub fn lock(&mut self, query: &str) -> Result<()> {
        let id = self.resolve(query)?;
        self.leaf_by_id_mut(id)?.1.lock();
        Ok(())
    }

    /// Unlock a leaf
    ///
    /// # Errors
    /// Lookup failures
    pub fn unlock(&mut self, query: &str) -> Result<()> {
        let id = self.resolve(query)?;
        self.leaf_by_id_mut(id)?.1.unlock();
        Ok(())
    }

    pub(crate) fn leaf_by_id_mut(&mut self, id: NodeId) -> Result<(NodePath, &mut LeafEntity)> {
        let node = self.tree.node_mut(id).ok_or_else(|| TreeError::NotFound {
            path: id.to_string(),
        })?;
        let path = node.full_name().clone();
        match node.leaf_mut() {
            Some(leaf) => Ok((path, leaf)),
            None => Err(TreeError::NotALeaf {
                path: path.to_string(),
            }
            .into()),
        }
    }

    /// Set a node's comment
    ///
    /// # Errors
    /// Returns a not-found error if the node is absent
    pub fn set_comment(&mut self, path: &NodePath, comment: &str) -> Result<()> {
        let id = self.tree.id_of(path).ok_or_else(|| TreeError::NotFound {
            path: path.to_string(),
        })?;
        if let Some(node) = self.tree.node_mut(id) {
            node.set_comment(comment);
        }
        Ok(())
    }

    /// Add a group at an absolute full name
    ///
    /// # Errors
    /// [`TrajectoryError::OutsideRoots`] or tree failures
    pub fn add_group_at(&mut self, path: &NodePath) -> Result<NodeId> {
        ensure_rooted(path)?;
        Ok(self.tree.add_group(path)?)
    }

    /// Return the group at an absolute full name, creating it if missing
    ///
    /// # Errors
    /// [`TrajectoryError::OutsideRoots`] or tree failures
    pub fn ensure_group_at(&mut self, path: &NodePath) -> Result<NodeId> {
        ensure_rooted(path)?;
        Ok(self.tree.ensure_group(path)?)
    }

    /// Add a leaf at an absolute full name
    ///
    /// An explored leaf must carry exactly one value per run.
    ///
    /// # Errors
    /// [`TrajectoryError::OutsideRoots`], [`TrajectoryError::RangeLengthMismatch`]
    /// or tree failures
    pub fn add_leaf_at(&mut self, path: &NodePath, leaf: LeafEntity) -> Result<NodeId> {
        ensure_rooted(path)?;
        let explored = leaf.is_explored();
        if explored && leaf.range().len() != self.len() {
            return Err(TrajectoryError::RangeLengthMismatch {
                path: path.to_string(),
                expected: self.len(),
                found: leaf.range().len(),
            });
        }
        let id = self.tree.add_leaf(path, leaf)?;
        if explored {
            self.explored.insert(id);
            self.apply_cursor()?;
        }
        Ok(id)
    }

    /// Create link `source.name` → `target`, both given as full names
    ///
    /// # Errors
    /// Path, root and tree failures
    pub fn add_link(&mut self, source: &str, name: &str, target: &str) -> Result<()> {
        let source: NodePath = source.parse()?;
        let target: NodePath = target.parse()?;
        ensure_rooted(&source)?;
        self.tree.add_link(&source, name, &target)?;
        Ok(())
    }

    /// Remove link `source.name`
    ///
    /// # Errors
    /// Path failures or a not-found error
    pub fn remove_link(&mut self, source: &str, name: &str) -> Result<()> {
        let source: NodePath = source.parse()?;
        self.tree.remove_link(&source, name)?;
        Ok(())
    }

    /// Remove nodes from the tree (not from storage)
    ///
    /// Every query is resolved and checked before anything is removed.
    ///
    /// # Errors
    /// - lookup failures
    /// - [`TreeError::RootImmutable`] for one of the four roots
    /// - [`TrajectoryError::ExploredRemoval`] if an explored leaf would go
    /// - tree failures (non-recursive removal of a non-empty group)
    pub fn remove_items(&mut self, queries: &[&str], recursive: bool) -> Result<Vec<NodePath>> {
        let mut targets = Vec::with_capacity(queries.len());
        for query in queries {
            let id = self.resolve(query)?;
            let node = self.node(id)?;
            if node.full_name().len() <= 1 {
                return Err(TreeError::RootImmutable.into());
            }
            if !recursive && !node.children().is_empty() {
                return Err(TreeError::HasChildren {
                    path: node.full_name().to_string(),
                }
                .into());
            }
            if self.holds_explored(id) {
                return Err(TrajectoryError::ExploredRemoval {
                    path: node.full_name().to_string(),
                });
            }
            targets.push(node.full_name().clone());
        }

        let mut removed = Vec::new();
        for path in targets {
            if self.tree.contains(&path) {
                removed.extend(self.tree.remove(&path, recursive)?);
            }
        }
        info!(count = removed.len(), "removed items");
        Ok(removed)
    }

    /// Full names of the explored leaves, in exploration order
    #[must_use]
    pub fn explored_parameters(&self) -> Vec<NodePath> {
        self.explored
            .iter()
            .filter_map(|id| self.tree.node(*id).map(|n| n.full_name().clone()))
            .collect()
    }

    /// Ids of the explored leaves, in exploration order
    pub fn explored_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.explored.iter().copied()
    }

    /// Whether any leaf is explored
    #[inline]
    #[must_use]
    pub fn is_explored(&self) -> bool {
        !self.explored.is_empty()
    }

    /// Whether the subtree at `id` contains an explored leaf
    pub(crate) fn holds_explored(&self, id: NodeId) -> bool {
        self.tree.subtree(id).iter().any(|n| self.explored.contains(n))
    }

    pub(crate) fn explored_mut(&mut self) -> &mut IndexSet<NodeId> {
        &mut self.explored
    }

    /// Select a run, or go back to defaults with `None` or the shared sentinel
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown runs
    pub fn set_cursor(&mut self, run: Option<RunRef>) -> Result<()> {
        match run {
            Some(RunRef::Name(name)) if self.ledger.naming().is_shared(&name) => {
                self.restore_default();
                Ok(())
            }
            Some(run) => {
                self.ledger.select(&run)?;
                self.apply_cursor()
            }
            None => {
                self.restore_default();
                Ok(())
            }
        }
    }

    /// Deselect the run; explored leaves report their defaults
    pub fn restore_default(&mut self) {
        self.ledger.clear_cursor();
        for id in self.explored.clone() {
            if let Ok((_, leaf)) = self.leaf_by_id_mut(id) {
                leaf.restore_default();
            }
        }
    }

    /// Point every explored leaf at the selected run
    pub(crate) fn apply_cursor(&mut self) -> Result<()> {
        let Some(index) = self.ledger.cursor() else {
            self.restore_default();
            return Ok(());
        };
        let position = self
            .ledger
            .position(index)
            .ok_or_else(|| TrajectoryError::run_not_found(index))?;
        for id in self.explored.clone() {
            let (path, leaf) = self.leaf_by_id_mut(id)?;
            leaf.set_access_index(position)
                .map_err(|e| TreeError::leaf(path, e))?;
        }
        Ok(())
    }

    /// Selected run index
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.ledger.cursor()
    }

    /// Selected run name
    #[inline]
    #[must_use]
    pub fn current_run_name(&self) -> Option<&str> {
        self.ledger.current_name()
    }

    /// Lock every parameter; returns how many were newly locked
    pub fn lock_parameters(&mut self) -> usize {
        self.lock_below(&RootKind::Parameters.path())
    }

    /// Lock every derived parameter; returns how many were newly locked
    pub fn lock_derived_parameters(&mut self) -> usize {
        self.lock_below(&RootKind::DerivedParameters.path())
    }

    pub(crate) fn lock_below(&mut self, path: &NodePath) -> usize {
        let Some(root) = self.tree.id_of(path) else {
            return 0;
        };
        let mut count = 0;
        for id in self.tree.subtree(root) {
            if let Some(leaf) = self.tree.node_mut(id).and_then(Node::leaf_mut) {
                if !leaf.is_locked() {
                    leaf.lock();
                    count += 1;
                }
            }
        }
        count
    }

    pub(crate) fn leaves_below(&self, path: &NodePath) -> Vec<NodePath> {
        let Some(root) = self.tree.id_of(path) else {
            return Vec::new();
        };
        self.tree
            .subtree(root)
            .into_iter()
            .filter_map(|id| self.tree.node(id))
            .filter(|n| n.is_leaf())
            .map(|n| n.full_name().clone())
            .collect()
    }

    /// Values currently presented by the leaves below a root, by full name
    #[must_use]
    pub fn parameter_values(&self, root: RootKind) -> BTreeMap<String, Value> {
        self.leaves_below(&root.path())
            .into_iter()
            .filter_map(|path| {
                let value = self.tree.leaf(&path).ok()?.value()?.clone();
                Some((path.to_string(), value))
            })
            .collect()
    }

    /// Ranges of the explored leaves, by full name
    #[must_use]
    pub fn explored_values(&self) -> IndexMap<String, Vec<Value>> {
        self.explored
            .iter()
            .filter_map(|id| {
                let node = self.tree.node(*id)?;
                Some((node.full_name().to_string(), node.leaf()?.range().to_vec()))
            })
            .collect()
    }

    /// Independent copy of everything
    #[inline]
    #[must_use]
    pub fn full_copy(&self) -> Self {
        self.clone()
    }

    /// Copy presenting only run `index`: its record and its range slot
    ///
    /// # Errors
    /// Returns [`TrajectoryError::RunNotFound`] for unknown indices
    pub fn narrow_copy(&self, index: usize) -> Result<Self> {
        let position = self
            .ledger
            .position(index)
            .ok_or_else(|| TrajectoryError::run_not_found(index))?;
        let mut copy = self.clone();
        copy.ledger = self.ledger.narrowed(index)?;
        for id in self.explored.clone() {
            let (path, leaf) = copy.leaf_by_id_mut(id)?;
            *leaf = leaf
                .narrowed(position)
                .map_err(|e| TreeError::leaf(path, e))?;
        }
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::RootGroup;
    use pretty_assertions::assert_eq;
    use trajex_leaf::ErrorClass;

    fn trajectory() -> Trajectory {
        Trajectory::new(TrajectoryConfig::new().with_name("test")).unwrap()
    }

    #[test]
    fn roots_exist() {
        let traj = trajectory();
        for root in RootKind::ALL {
            assert!(traj.tree().get(&root.path()).unwrap().is_group());
        }
        assert_eq!(traj.len(), 1);
    }

    #[test]
    fn root_handles_prefix_paths() {
        let mut traj = trajectory();
        traj.parameters()
            .add_leaf("traffic.ncars", Some(Value::Int(10)))
            .unwrap();
        traj.parameters()
            .add_leaf("parameters.speed", Some(Value::Float(1.5)))
            .unwrap();
        assert_eq!(traj.value("parameters.traffic.ncars").unwrap(), &Value::Int(10));
        assert_eq!(traj.value("speed").unwrap(), &Value::Float(1.5));
        assert_eq!(traj.parameters().leaves().len(), 2);
    }

    #[test]
    fn results_use_result_kind() {
        let mut traj = trajectory();
        traj.results().add_leaf("z", Some(Value::Int(1))).unwrap();
        assert_eq!(traj.leaf("results.z").unwrap().kind().tag(), "result");
    }

    #[test]
    fn outside_roots_rejected() {
        let mut traj = trajectory();
        let err = traj.add_group_at(&"elsewhere.g".parse().unwrap()).unwrap_err();
        assert!(matches!(err, TrajectoryError::OutsideRoots { .. }));
    }

    #[test]
    fn locked_set_value_fails() {
        let mut traj = trajectory();
        traj.parameters().add_leaf("x", Some(Value::Int(1))).unwrap();
        assert_eq!(traj.lock_parameters(), 1);
        let err = traj.set_value("x", Value::Int(2)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::LockedMutation);
        traj.unlock("x").unwrap();
        traj.set_value("x", Value::Int(2)).unwrap();
        assert_eq!(traj.value("x").unwrap(), &Value::Int(2));
    }

    #[test]
    fn empty_leaf_value_is_not_found() {
        let mut traj = trajectory();
        traj.results().add_leaf("z", None).unwrap();
        assert_eq!(traj.value("z").unwrap_err().class(), ErrorClass::NotFound);
    }

    #[test]
    fn remove_items_checks_before_removing() {
        let mut traj = trajectory();
        traj.results().add_leaf("a.z", Some(Value::Int(1))).unwrap();
        traj.results().add_leaf("b.z", Some(Value::Int(1))).unwrap();
        let err = traj
            .remove_items(&["results.a", "results.b"], false)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Kind);
        assert!(traj.tree().contains(&"results.a.z".parse().unwrap()));

        let removed = traj
            .remove_items(&["results.a", "results.b"], true)
            .unwrap();
        assert_eq!(removed.len(), 4);
        assert!(traj.remove_items(&["results"], true).is_err());
    }

    #[test]
    fn links_between_roots() {
        let mut traj = trajectory();
        traj.results().add_leaf("z", Some(Value::Int(1))).unwrap();
        traj.derived_parameters().add_group("g").unwrap();
        traj.add_link("derived_parameters.g", "zl", "results.z").unwrap();
        assert_eq!(traj.value("derived_parameters.g.zl").unwrap(), &Value::Int(1));
        traj.remove_link("derived_parameters.g", "zl").unwrap();
        assert!(traj.value("derived_parameters.g.zl").is_err());
    }
}
