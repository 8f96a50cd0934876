//! The four top-level groups
//!
//! Every node lives below `config`, `parameters`, `derived_parameters` or
//! `results`. Each root is reached through a [`RootHandle`] implementing the
//! shared [`RootGroup`] capability.

use crate::error::{Result, TrajectoryError};
use crate::trajectory::Trajectory;
use trajex_leaf::{kind, NodePath, Value};
use trajex_tree::NodeId;

/// One of the four top-level groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RootKind {
    /// Settings of the experiment itself
    Config,
    /// Space-defining parameters
    Parameters,
    /// Parameters computed during runs
    DerivedParameters,
    /// Run output
    Results,
}

impl RootKind {
    /// All roots in tree order
    pub const ALL: [RootKind; 4] = [
        RootKind::Config,
        RootKind::Parameters,
        RootKind::DerivedParameters,
        RootKind::Results,
    ];

    /// Group name of this root
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Parameters => "parameters",
            Self::DerivedParameters => "derived_parameters",
            Self::Results => "results",
        }
    }

    /// Leaf kind used when none is given
    #[inline]
    #[must_use]
    pub fn default_kind(self) -> &'static str {
        match self {
            Self::Results => kind::RESULT,
            _ => kind::PARAMETER,
        }
    }

    /// Whether run branches live below this root
    #[inline]
    #[must_use]
    pub fn is_run_scoped(self) -> bool {
        matches!(self, Self::DerivedParameters | Self::Results)
    }

    /// Root path
    #[inline]
    #[must_use]
    pub fn path(self) -> NodePath {
        NodePath::single(self.name())
    }

    /// Root a full name belongs to
    #[must_use]
    pub fn of(path: &NodePath) -> Option<Self> {
        let first = path.first()?;
        Self::ALL.into_iter().find(|r| r.name() == first)
    }
}

/// Capabilities shared by the four roots
pub trait RootGroup {
    /// Which root this is
    fn root_kind(&self) -> RootKind;

    /// Add a group below this root
    ///
    /// # Errors
    /// Propagates tree and path failures
    fn add_group(&mut self, path: &str) -> Result<NodeId>;

    /// Add a leaf of the root's default kind
    ///
    /// # Errors
    /// Propagates tree and path failures
    fn add_leaf(&mut self, path: &str, value: Option<Value>) -> Result<NodeId>;

    /// Add a leaf of a registered kind
    ///
    /// # Errors
    /// Propagates kind, tree and path failures
    fn add_leaf_of_kind(&mut self, path: &str, tag: &str, value: Option<Value>) -> Result<NodeId>;

    /// Lock every leaf below this root; returns how many were newly locked
    fn lock_all(&mut self) -> usize;

    /// Full names of every leaf below this root, in creation order
    fn leaves(&self) -> Vec<NodePath>;
}

/// Mutable view of one root of a [`Trajectory`]
#[derive(Debug)]
pub struct RootHandle<'a> {
    trajectory: &'a mut Trajectory,
    root: RootKind,
}

impl<'a> RootHandle<'a> {
    pub(crate) fn new(trajectory: &'a mut Trajectory, root: RootKind) -> Self {
        Self { trajectory, root }
    }

    /// Full name for a path given relative to this root
    ///
    /// A path already starting with the root name is taken as is.
    ///
    /// # Errors
    /// Returns [`TrajectoryError::Path`] for malformed paths
    pub fn full_name(&self, path: &str) -> Result<NodePath> {
        let relative: NodePath = path.parse()?;
        if relative.first() == Some(self.root.name()) {
            Ok(relative)
        } else {
            Ok(self.root.path().join(&relative))
        }
    }

    /// Set the comment of a node below this root
    ///
    /// # Errors
    /// Returns a not-found error if the node is absent
    pub fn set_comment(&mut self, path: &str, comment: &str) -> Result<()> {
        let full = self.full_name(path)?;
        self.trajectory.set_comment(&full, comment)
    }
}

impl RootGroup for RootHandle<'_> {
    fn root_kind(&self) -> RootKind {
        self.root
    }

    fn add_group(&mut self, path: &str) -> Result<NodeId> {
        let full = self.full_name(path)?;
        self.trajectory.add_group_at(&full)
    }

    fn add_leaf(&mut self, path: &str, value: Option<Value>) -> Result<NodeId> {
        self.add_leaf_of_kind(path, self.root.default_kind(), value)
    }

    fn add_leaf_of_kind(&mut self, path: &str, tag: &str, value: Option<Value>) -> Result<NodeId> {
        let full = self.full_name(path)?;
        let leaf = match value {
            Some(v) => self.trajectory.kinds().instantiate_with(tag, v)?,
            None => self.trajectory.kinds().instantiate(tag)?,
        };
        self.trajectory.add_leaf_at(&full, leaf)
    }

    fn lock_all(&mut self) -> usize {
        self.trajectory.lock_below(&self.root.path())
    }

    fn leaves(&self) -> Vec<NodePath> {
        self.trajectory.leaves_below(&self.root.path())
    }
}

impl From<RootKind> for NodePath {
    fn from(root: RootKind) -> Self {
        root.path()
    }
}

/// Reject paths that do not start at one of the roots
pub(crate) fn ensure_rooted(path: &NodePath) -> Result<RootKind> {
    RootKind::of(path).ok_or_else(|| TrajectoryError::OutsideRoots {
        path: path.to_string(),
    })
}
