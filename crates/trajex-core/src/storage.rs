//! Persistence seam
//!
//! The core never writes files itself. It snapshots nodes into
//! [`StorageItem`]s, hands them to a [`StorageService`] and applies what the
//! service loads back.

use crate::error::{Result, TrajectoryError};
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trajex_leaf::{ErrorClass, LeafEntity, NodePath, Value};
use trajex_tree::{Node, NodeData, TreeError};

/// How much of each item to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadDepth {
    /// Load nothing
    Nothing,
    /// Create missing groups and empty leaves only
    Skeleton,
    /// Create missing nodes and fill empty leaves with data
    Full,
}

/// Which items to load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadRequest {
    /// Everything the service holds for the trajectory
    WholeTree,
    /// Only these full names (with their subtrees)
    Items(Vec<NodePath>),
}

/// Snapshot of one node
///
/// Groups carry no kind and no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    /// Full name
    pub path: NodePath,
    /// Leaf kind tag; `None` for groups
    pub kind: Option<String>,
    /// Default value
    pub default: Option<Value>,
    /// Exploration range
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range: Vec<Value>,
    /// Comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Lock state
    #[serde(default)]
    pub locked: bool,
}

impl StorageItem {
    /// Snapshot of a node
    #[must_use]
    pub fn of(node: &Node) -> Self {
        match node.data() {
            NodeData::Group => Self::group(node.full_name().clone()),
            NodeData::Leaf(leaf) => Self {
                path: node.full_name().clone(),
                kind: Some(leaf.kind().tag().to_string()),
                default: leaf.default_value().cloned(),
                range: leaf.range().to_vec(),
                comment: node.comment().to_string(),
                locked: leaf.is_locked(),
            },
        }
    }

    /// Group snapshot
    #[must_use]
    pub fn group(path: NodePath) -> Self {
        Self {
            path,
            kind: None,
            default: None,
            range: Vec::new(),
            comment: String::new(),
            locked: false,
        }
    }

    /// Whether this item is a group
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind.is_none()
    }
}

/// What the service needs to know about the trajectory
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageContext {
    /// Trajectory name
    pub trajectory: String,
    /// Number of runs
    pub length: usize,
    /// Runs were added since the last store
    pub expansion_pending: bool,
    /// Old → new full names after a merge
    pub renames: Vec<(NodePath, NodePath)>,
    /// Name of the trajectory merged in
    pub other_trajectory: Option<String>,
}

impl StorageContext {
    /// Attach merge renames and the other trajectory's name
    #[must_use]
    pub fn with_merge(
        mut self,
        other: impl Into<String>,
        renames: Vec<(NodePath, NodePath)>,
    ) -> Self {
        self.other_trajectory = Some(other.into());
        self.renames = renames;
        self
    }
}

/// Persistence collaborator
#[cfg_attr(test, mockall::automock)]
pub trait StorageService {
    /// Persist snapshots
    ///
    /// # Errors
    /// Backend failures
    fn store(&mut self, items: &[StorageItem], context: &StorageContext) -> Result<(), StorageError>;

    /// Fetch snapshots
    ///
    /// # Errors
    /// Backend failures or missing items
    fn load(
        &mut self,
        request: &LoadRequest,
        depth: LoadDepth,
        context: &StorageContext,
    ) -> Result<Vec<StorageItem>, StorageError>;

    /// Delete items and their subtrees from storage
    ///
    /// # Errors
    /// Backend failures
    fn delete(&mut self, paths: &[NodePath], context: &StorageContext) -> Result<(), StorageError>;

    /// Delete links `(source, name)` from storage
    ///
    /// # Errors
    /// Backend failures
    fn delete_links(
        &mut self,
        links: &[(NodePath, String)],
        context: &StorageContext,
    ) -> Result<(), StorageError>;
}

/// Storage failures, surfaced unchanged
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("storage backend: {0}")]
    Backend(String),

    /// Requested item is not stored
    #[error("not stored: {path}")]
    Missing {
        /// Full name
        path: String,
    },

    /// Operation not offered by the backend
    #[error("unsupported storage operation: {0}")]
    Unsupported(String),
}

impl StorageError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Storage
    }
}

impl Trajectory {
    /// Context describing this trajectory to a storage service
    #[must_use]
    pub fn storage_context(&self) -> StorageContext {
        StorageContext {
            trajectory: self.name().to_string(),
            length: self.len(),
            expansion_pending: self.expansion_not_stored,
            ..StorageContext::default()
        }
    }

    /// Store every node
    ///
    /// # Errors
    /// Storage failures
    pub fn store(&mut self, service: &mut dyn StorageService) -> Result<()> {
        let root = self.tree().root();
        let items: Vec<StorageItem> = self
            .tree()
            .subtree(root)
            .into_iter()
            .skip(1)
            .filter_map(|id| self.tree().node(id).map(StorageItem::of))
            .collect();
        service.store(&items, &self.storage_context())?;
        self.stored = true;
        self.expansion_not_stored = false;
        info!(trajectory = %self.name(), items = items.len(), "stored trajectory");
        Ok(())
    }

    /// Store selected nodes and their subtrees
    ///
    /// # Errors
    /// Lookup or storage failures
    pub fn store_items(&self, service: &mut dyn StorageService, queries: &[&str]) -> Result<()> {
        let mut items = Vec::new();
        for query in queries {
            let id = self.resolve(query)?;
            items.extend(
                self.tree()
                    .subtree(id)
                    .into_iter()
                    .filter_map(|n| self.tree().node(n).map(StorageItem::of)),
            );
        }
        service.store(&items, &self.storage_context())?;
        debug!(items = items.len(), "stored items");
        Ok(())
    }

    /// Load the whole tree; returns how many nodes were created or filled
    ///
    /// # Errors
    /// Storage failures, or loaded data that does not fit the trajectory
    pub fn load(&mut self, service: &mut dyn StorageService, depth: LoadDepth) -> Result<usize> {
        self.load_request(service, &LoadRequest::WholeTree, depth)
    }

    /// Load selected full names; returns how many nodes were created or filled
    ///
    /// # Errors
    /// Storage failures, or loaded data that does not fit the trajectory
    pub fn load_items(
        &mut self,
        service: &mut dyn StorageService,
        paths: Vec<NodePath>,
        depth: LoadDepth,
    ) -> Result<usize> {
        self.load_request(service, &LoadRequest::Items(paths), depth)
    }

    fn load_request(
        &mut self,
        service: &mut dyn StorageService,
        request: &LoadRequest,
        depth: LoadDepth,
    ) -> Result<usize> {
        if depth == LoadDepth::Nothing {
            return Ok(0);
        }
        let items = service.load(request, depth, &self.storage_context())?;
        for item in &items {
            if depth == LoadDepth::Full && !item.range.is_empty() && item.range.len() != self.len() {
                return Err(TrajectoryError::RangeLengthMismatch {
                    path: item.path.to_string(),
                    expected: self.len(),
                    found: item.range.len(),
                });
            }
        }

        let mut applied = 0;
        for item in &items {
            if self.apply_item(item, depth)? {
                applied += 1;
            }
        }
        debug!(loaded = items.len(), applied, "applied loaded items");
        Ok(applied)
    }

    fn apply_item(&mut self, item: &StorageItem, depth: LoadDepth) -> Result<bool> {
        let Some(tag) = item.kind.as_deref() else {
            if self.tree().contains(&item.path) {
                return Ok(false);
            }
            self.ensure_group_at(&item.path)?;
            return Ok(true);
        };

        let existing = match self.tree().get(&item.path) {
            Ok(node) => match node.leaf() {
                Some(leaf) => Some(leaf.is_empty()),
                None => {
                    return Err(TreeError::NotALeaf {
                        path: item.path.to_string(),
                    }
                    .into())
                }
            },
            Err(_) => None,
        };

        match (existing, depth) {
            (Some(false), _) | (Some(true), LoadDepth::Skeleton) => Ok(false),
            (None, LoadDepth::Skeleton) => {
                let leaf = self.kinds().instantiate(tag)?.with_comment(&item.comment);
                self.add_leaf_at(&item.path, leaf)?;
                Ok(true)
            }
            (None, _) => {
                let leaf = self.leaf_from_item(tag, item)?;
                self.add_leaf_at(&item.path, leaf)?;
                Ok(true)
            }
            (Some(true), _) => {
                let leaf = self.leaf_from_item(tag, item)?;
                let explored = leaf.is_explored();
                let id = self.tree().id_of(&item.path).ok_or_else(|| TreeError::NotFound {
                    path: item.path.to_string(),
                })?;
                *self.leaf_by_id_mut(id)?.1 = leaf;
                if explored {
                    self.explored_mut().insert(id);
                    self.apply_cursor()?;
                }
                Ok(true)
            }
        }
    }

    fn leaf_from_item(&self, tag: &str, item: &StorageItem) -> Result<LeafEntity> {
        let mut leaf = match &item.default {
            Some(v) => self.kinds().instantiate_with(tag, v.clone())?,
            None => self.kinds().instantiate(tag)?,
        }
        .with_comment(&item.comment);
        if !item.range.is_empty() {
            leaf.explore(item.range.clone())
                .map_err(|e| TreeError::leaf(&item.path, e))?;
        }
        if item.locked {
            leaf.lock();
        }
        Ok(leaf)
    }

    /// Delete items from storage, and from the tree too if asked
    ///
    /// # Errors
    /// - lookup failures
    /// - [`TrajectoryError::ExploredRemoval`] when tree removal would drop
    ///   an explored leaf (checked before storage is touched)
    /// - storage failures
    pub fn delete_items(
        &mut self,
        service: &mut dyn StorageService,
        queries: &[&str],
        remove_from_tree: bool,
    ) -> Result<Vec<NodePath>> {
        let mut paths = Vec::with_capacity(queries.len());
        for query in queries {
            let id = self.resolve(query)?;
            let node = self.node(id)?;
            if remove_from_tree && self.holds_explored(id) {
                return Err(TrajectoryError::ExploredRemoval {
                    path: node.full_name().to_string(),
                });
            }
            paths.push(node.full_name().clone());
        }
        service.delete(&paths, &self.storage_context())?;
        if remove_from_tree {
            self.remove_items(queries, true)?;
        }
        Ok(paths)
    }

    /// Delete links from storage, and from the tree too if asked
    ///
    /// `links` are `(source full name, link name)` pairs.
    ///
    /// # Errors
    /// Path, lookup or storage failures
    pub fn delete_links(
        &mut self,
        service: &mut dyn StorageService,
        links: &[(&str, &str)],
        remove_from_tree: bool,
    ) -> Result<()> {
        let mut pairs = Vec::with_capacity(links.len());
        for (source, name) in links {
            let source: NodePath = source.parse()?;
            let id = self.tree().id_of(&source).ok_or_else(|| TreeError::NotFound {
                path: source.to_string(),
            })?;
            if self.tree().links().target(id, name).is_none() {
                return Err(TreeError::NotFound {
                    path: source.child(*name).to_string(),
                }
                .into());
            }
            pairs.push((source, (*name).to_string()));
        }
        service.delete_links(&pairs, &self.storage_context())?;
        if remove_from_tree {
            for (source, name) in &pairs {
                self.remove_link(&source.to_string(), name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrajectoryConfig;
    use crate::roots::RootGroup;
    use mockall::predicate::{always, eq};
    use pretty_assertions::assert_eq;

    fn trajectory() -> Trajectory {
        let mut traj = Trajectory::new(TrajectoryConfig::new().with_name("stored")).unwrap();
        traj.parameters().add_leaf("x", Some(Value::Int(1))).unwrap();
        traj.results().add_leaf("z", Some(Value::Int(2))).unwrap();
        traj
    }

    #[test]
    fn store_snapshots_every_node() {
        let mut traj = trajectory();
        let mut mock = MockStorageService::new();
        mock.expect_store()
            .withf(|items, ctx| {
                ctx.trajectory == "stored"
                    && items.len() == 6
                    && items.iter().any(|i| i.path.to_string() == "parameters.x" && !i.is_group())
            })
            .times(1)
            .returning(|_, _| Ok(()));

        traj.store(&mut mock).unwrap();
        assert!(traj.is_stored());
    }

    #[test]
    fn storage_errors_pass_through() {
        let mut traj = trajectory();
        let mut mock = MockStorageService::new();
        mock.expect_store()
            .returning(|_, _| Err(StorageError::Backend("disk full".into())));

        let err = traj.store(&mut mock).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Storage);
        assert!(!traj.is_stored());
    }

    #[test]
    fn load_nothing_skips_service() {
        let mut traj = trajectory();
        let mut mock = MockStorageService::new();
        mock.expect_load().times(0);
        assert_eq!(traj.load(&mut mock, LoadDepth::Nothing).unwrap(), 0);
    }

    #[test]
    fn skeleton_load_creates_empty_leaves() {
        let mut traj = trajectory();
        let mut mock = MockStorageService::new();
        mock.expect_load()
            .with(eq(LoadRequest::WholeTree), eq(LoadDepth::Skeleton), always())
            .returning(|_, _, _| {
                Ok(vec![
                    StorageItem::group("results.extra".parse().unwrap()),
                    StorageItem {
                        path: "results.extra.y".parse().unwrap(),
                        kind: Some("result".into()),
                        default: Some(Value::Int(5)),
                        range: vec![],
                        comment: String::new(),
                        locked: false,
                    },
                ])
            });

        assert_eq!(traj.load(&mut mock, LoadDepth::Skeleton).unwrap(), 2);
        assert!(traj.leaf("results.extra.y").unwrap().is_empty());
    }

    #[test]
    fn full_load_rejects_wrong_length() {
        let mut traj = trajectory();
        let mut mock = MockStorageService::new();
        mock.expect_load().returning(|_, _, _| {
            Ok(vec![StorageItem {
                path: "parameters.y".parse().unwrap(),
                kind: Some("parameter".into()),
                default: Some(Value::Int(1)),
                range: vec![Value::Int(1), Value::Int(2)],
                comment: String::new(),
                locked: false,
            }])
        });

        let err = traj.load(&mut mock, LoadDepth::Full).unwrap_err();
        assert_eq!(err.class(), ErrorClass::RangeLengthMismatch);
        assert!(traj.get("parameters.y").is_err());
    }

    #[test]
    fn delete_items_optionally_removes_from_tree() {
        let mut traj = trajectory();
        let mut mock = MockStorageService::new();
        mock.expect_delete().times(2).returning(|_, _| Ok(()));

        traj.delete_items(&mut mock, &["results.z"], false).unwrap();
        assert!(traj.get("results.z").is_ok());
        traj.delete_items(&mut mock, &["results.z"], true).unwrap();
        assert!(traj.get("results.z").is_err());
    }

    #[test]
    fn delete_links_requires_existing_link() {
        let mut traj = trajectory();
        traj.add_link("parameters", "zl", "results.z").unwrap();
        let mut mock = MockStorageService::new();
        mock.expect_delete_links().times(1).returning(|_, _| Ok(()));

        assert!(traj.delete_links(&mut mock, &[("parameters", "nope")], true).is_err());
        traj.delete_links(&mut mock, &[("parameters", "zl")], true).unwrap();
        assert!(traj.tree().links().is_empty());
    }
}
