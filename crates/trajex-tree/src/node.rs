//! Tree nodes
//!
//! Nodes live in an arena owned by [`NamedTree`](crate::NamedTree) and are
//! addressed by a stable [`NodeId`]. Parent edges are ids, children are an
//! ordered name → id map.

use indexmap::IndexMap;
use std::fmt::{self, Display, Formatter};
use trajex_leaf::{LeafEntity, NodePath};

/// Stable arena index of a node
///
/// Ids are never reused while the tree lives, so a stale id simply stops
/// resolving after its node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Container of named children
    Group,
    /// Data holder
    Leaf(LeafEntity),
}

/// A group or leaf in the tree
#[derive(Debug, Clone)]
pub struct Node {
    full_name: NodePath,
    parent: Option<NodeId>,
    children: IndexMap<String, NodeId>,
    data: NodeData,
    comment: String,
}

impl Node {
    pub(crate) fn new(full_name: NodePath, parent: Option<NodeId>, data: NodeData) -> Self {
        Self {
            full_name,
            parent,
            children: IndexMap::new(),
            data,
            comment: String::new(),
        }
    }

    /// Full dotted name
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> &NodePath {
        &self.full_name
    }

    /// Last segment of the full name (empty for the root)
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.full_name.last().unwrap_or("")
    }

    /// Parent node (`None` for the root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &IndexMap<String, NodeId> {
        &self.children
    }

    /// Child by short name
    #[inline]
    #[must_use]
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    /// Payload
    #[inline]
    #[must_use]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Whether this is a group
    #[inline]
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.data, NodeData::Group)
    }

    /// Whether this is a leaf
    #[inline]
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.data, NodeData::Leaf(_))
    }

    /// Leaf payload, if any
    #[inline]
    #[must_use]
    pub fn leaf(&self) -> Option<&LeafEntity> {
        match &self.data {
            NodeData::Leaf(leaf) => Some(leaf),
            NodeData::Group => None,
        }
    }

    /// Mutable leaf payload, if any
    #[inline]
    pub fn leaf_mut(&mut self) -> Option<&mut LeafEntity> {
        match &mut self.data {
            NodeData::Leaf(leaf) => Some(leaf),
            NodeData::Group => None,
        }
    }

    /// Comment
    #[inline]
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Replace the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub(crate) fn children_mut(&mut self) -> &mut IndexMap<String, NodeId> {
        &mut self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use trajex_leaf::{ParameterKind, Value};

    #[test]
    fn group_node_accessors() {
        let node = Node::new("a.b".parse().unwrap(), Some(NodeId(0)), NodeData::Group);
        assert!(node.is_group());
        assert_eq!(node.short_name(), "b");
        assert_eq!(node.parent(), Some(NodeId(0)));
        assert!(node.leaf().is_none());
    }

    #[test]
    fn leaf_node_mutation() {
        let leaf = LeafEntity::with_value(Arc::new(ParameterKind), Value::Int(1));
        let mut node = Node::new("a.x".parse().unwrap(), None, NodeData::Leaf(leaf));
        node.leaf_mut().unwrap().lock();
        assert!(node.leaf().unwrap().is_locked());
        node.set_comment("speed");
        assert_eq!(node.comment(), "speed");
    }

    #[test]
    fn root_short_name_is_empty() {
        let root = Node::new(NodePath::root(), None, NodeData::Group);
        assert_eq!(root.short_name(), "");
        assert_eq!(NodeId(3).to_string(), "#3");
    }
}
