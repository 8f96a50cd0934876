//! Testing utilities for the trajex workspace
//!
//! Shared fixtures, assertions and an in-memory storage double.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use trajex_core::{
    LoadDepth, LoadRequest, RootGroup, RunRef, StorageContext, StorageError, StorageItem,
    StorageService, Trajectory, TrajectoryConfig,
};
use trajex_leaf::{NodePath, Value};

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

pub fn path(s: &str) -> NodePath {
    s.parse().unwrap()
}

pub fn create_trajectory(name: &str) -> Trajectory {
    Trajectory::new(TrajectoryConfig::new().with_name(name)).unwrap()
}

/// Trajectory with parameters `x` (explored over `xs`) and `y` (fixed at 0)
pub fn create_explored_trajectory(name: &str, xs: &[i64]) -> Trajectory {
    let mut traj = create_trajectory(name);
    traj.parameters().add_leaf("x", Some(Value::Int(0))).unwrap();
    traj.parameters().add_leaf("y", Some(Value::Int(0))).unwrap();
    traj.explore([("x", ints(xs))]).unwrap();
    traj
}

/// Add `results.runs.<run>.<leaf>` holding the run index, for every run
pub fn add_run_results(traj: &mut Trajectory, leaf: &str) {
    let runs: Vec<(usize, String)> = traj
        .ledger()
        .records()
        .map(|r| (r.index, r.name.clone()))
        .collect();
    for (index, run) in runs {
        traj.results()
            .add_leaf(
                &format!("runs.{run}.{leaf}"),
                Some(Value::Int(i64::try_from(index).unwrap())),
            )
            .unwrap();
    }
}

pub fn complete_all_runs(traj: &mut Trajectory) {
    for index in 0..traj.len() {
        traj.mark_run_completed(&RunRef::Index(index)).unwrap();
    }
}

/// Every explored leaf holds one value per run and nothing else has a range
pub fn assert_length_invariant(traj: &Trajectory) {
    let explored: BTreeSet<NodePath> = traj.explored_parameters().into_iter().collect();
    for (_, node) in traj.tree().leaves() {
        let Some(leaf) = node.leaf() else { continue };
        if explored.contains(node.full_name()) {
            assert_eq!(
                leaf.range().len(),
                traj.len(),
                "explored leaf {} has {} values for {} runs",
                node.full_name(),
                leaf.range().len(),
                traj.len()
            );
        } else {
            assert!(
                leaf.range().is_empty(),
                "unexplored leaf {} has a range",
                node.full_name()
            );
        }
    }
    for index in 0..traj.len() {
        let name = traj.ledger().to_name(index).unwrap();
        assert_eq!(traj.ledger().to_index(name).unwrap(), index);
    }
}

/// Storage double keeping snapshots per trajectory in memory
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    items: BTreeMap<String, BTreeMap<NodePath, StorageItem>>,
    deleted_links: Vec<(String, NodePath, String)>,
    pub store_calls: usize,
    pub fail_with: Option<String>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn stored(&self, trajectory: &str) -> Vec<&StorageItem> {
        self.items
            .get(trajectory)
            .map(|items| items.values().collect())
            .unwrap_or_default()
    }

    pub fn deleted_links(&self) -> &[(String, NodePath, String)] {
        &self.deleted_links
    }

    fn check(&self) -> Result<(), StorageError> {
        match &self.fail_with {
            Some(message) => Err(StorageError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

impl StorageService for InMemoryStorage {
    fn store(&mut self, items: &[StorageItem], context: &StorageContext) -> Result<(), StorageError> {
        self.check()?;
        self.store_calls += 1;
        let stored = self.items.entry(context.trajectory.clone()).or_default();
        for item in items {
            stored.insert(item.path.clone(), item.clone());
        }
        Ok(())
    }

    fn load(
        &mut self,
        request: &LoadRequest,
        depth: LoadDepth,
        context: &StorageContext,
    ) -> Result<Vec<StorageItem>, StorageError> {
        self.check()?;
        let Some(stored) = self.items.get(&context.trajectory) else {
            return Err(StorageError::Missing {
                path: context.trajectory.clone(),
            });
        };
        let wanted = |p: &NodePath| match request {
            LoadRequest::WholeTree => true,
            LoadRequest::Items(roots) => roots.iter().any(|r| r.is_prefix_of(p)),
        };
        Ok(stored
            .values()
            .filter(|item| wanted(&item.path))
            .map(|item| match depth {
                LoadDepth::Full => item.clone(),
                _ => StorageItem {
                    default: None,
                    range: Vec::new(),
                    ..item.clone()
                },
            })
            .collect())
    }

    fn delete(&mut self, paths: &[NodePath], context: &StorageContext) -> Result<(), StorageError> {
        self.check()?;
        if let Some(stored) = self.items.get_mut(&context.trajectory) {
            stored.retain(|p, _| !paths.iter().any(|d| d.is_prefix_of(p)));
        }
        Ok(())
    }

    fn delete_links(
        &mut self,
        links: &[(NodePath, String)],
        context: &StorageContext,
    ) -> Result<(), StorageError> {
        self.check()?;
        self.deleted_links.extend(
            links
                .iter()
                .map(|(source, name)| (context.trajectory.clone(), source.clone(), name.clone())),
        );
        Ok(())
    }
}
