//! The named node tree
//!
//! Provides [`NamedTree`]: an arena of nodes addressed by dotted full names,
//! with incremental name indexes, links, and shortcut lookup.
//!
//! # Lookup
//!
//! [`NamedTree::find_all`] first walks the query segment by segment from the
//! start node. An exact hit wins. Otherwise, with shortcuts enabled, every node
//! below the start whose relative path contains the query as a subsequence
//! ending on its last segment is a candidate, provided each hop between two
//! matched segments stays within `max_depth`. Links whose name equals the last
//! query segment are candidates too, through their source's path.
//! [`NamedTree::resolve`] then insists on exactly one distinct node.

use crate::error::TreeError;
use crate::index::NameIndex;
use crate::links::LinkRegistry;
use crate::node::{Node, NodeData, NodeId};
use std::collections::HashSet;
use tracing::debug;
use trajex_leaf::{validate_segment, LeafEntity, NodePath};

const ROOT: NodeId = NodeId(0);

/// Options steering a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Allow skipping intermediate groups
    pub shortcuts: bool,
    /// Largest hop between two matched segments (`None` = unbounded)
    pub max_depth: Option<usize>,
    /// Follow links
    pub with_links: bool,
}

impl ResolveOptions {
    /// Exact walks only, following links
    #[inline]
    #[must_use]
    pub fn exact() -> Self {
        Self {
            shortcuts: false,
            ..Self::default()
        }
    }

    /// Limit the hop between matched segments
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Ignore links
    #[inline]
    #[must_use]
    pub fn without_links(mut self) -> Self {
        self.with_links = false;
        self
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            shortcuts: true,
            max_depth: None,
            with_links: true,
        }
    }
}

/// A lookup candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Node reached
    pub node: NodeId,
    /// Path it was reached by; differs from the node's full name when the
    /// last hop was a link
    pub path: NodePath,
}

/// Reduce candidates to exactly one
///
/// # Errors
/// - [`TreeError::NotFound`] for no candidate
/// - [`TreeError::AmbiguousPath`] for more than one
pub fn single_match(query: &NodePath, mut matches: Vec<Match>) -> Result<Match, TreeError> {
    match matches.len() {
        0 => Err(TreeError::NotFound {
            path: query.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(TreeError::AmbiguousPath {
            query: query.to_string(),
            candidates: matches.iter().map(|m| m.path.to_string()).collect(),
        }),
    }
}

/// Tree of groups and leaves addressed by unique full names
#[derive(Debug, Clone)]
pub struct NamedTree {
    nodes: Vec<Option<Node>>,
    index: NameIndex,
    links: LinkRegistry,
}

impl NamedTree {
    /// Create tree holding only the root group
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodePath::root(), None, NodeData::Group))],
            index: NameIndex::new(),
            links: LinkRegistry::new(),
        }
    }

    /// Root group
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)?.as_ref()
    }

    /// Mutable node by id
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    /// Id of the node with this exact full name
    #[must_use]
    pub fn id_of(&self, path: &NodePath) -> Option<NodeId> {
        if path.is_empty() {
            Some(ROOT)
        } else {
            self.index.get(path)
        }
    }

    /// Whether a node with this exact full name exists
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &NodePath) -> bool {
        self.id_of(path).is_some()
    }

    /// Node with this exact full name
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if absent
    pub fn get(&self, path: &NodePath) -> Result<&Node, TreeError> {
        self.require(path).and_then(|id| self.expect_node(id, path))
    }

    /// Leaf with this exact full name
    ///
    /// # Errors
    /// - [`TreeError::NotFound`] if absent
    /// - [`TreeError::NotALeaf`] if it is a group
    pub fn leaf(&self, path: &NodePath) -> Result<&LeafEntity, TreeError> {
        self.get(path)?.leaf().ok_or_else(|| TreeError::NotALeaf {
            path: path.to_string(),
        })
    }

    /// Mutable leaf with this exact full name
    ///
    /// # Errors
    /// - [`TreeError::NotFound`] if absent
    /// - [`TreeError::NotALeaf`] if it is a group
    pub fn leaf_mut(&mut self, path: &NodePath) -> Result<&mut LeafEntity, TreeError> {
        let id = self.require(path)?;
        self.node_mut(id)
            .and_then(Node::leaf_mut)
            .ok_or_else(|| TreeError::NotALeaf {
                path: path.to_string(),
            })
    }

    /// Number of nodes, root excluded
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if only the root exists
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All live nodes in creation order, root excluded
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    /// All live leaves in creation order
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.iter().filter(|(_, n)| n.is_leaf())
    }

    /// Link registry
    #[inline]
    #[must_use]
    pub fn links(&self) -> &LinkRegistry {
        &self.links
    }

    /// Add a group, creating missing intermediate groups
    ///
    /// # Errors
    /// - [`TreeError::NameConflict`] if the name (or a link of that name) exists
    /// - [`TreeError::NotAGroup`] if an intermediate node is a leaf
    /// - [`TreeError::Path`] for invalid segments
    pub fn add_group(&mut self, path: &NodePath) -> Result<NodeId, TreeError> {
        self.insert(path, NodeData::Group)
    }

    /// Return the group at `path`, creating it (and its parents) if missing
    ///
    /// # Errors
    /// - [`TreeError::NotAGroup`] if `path` or an intermediate node is a leaf
    /// - [`TreeError::NameConflict`] if a link occupies the name
    /// - [`TreeError::Path`] for invalid segments
    pub fn ensure_group(&mut self, path: &NodePath) -> Result<NodeId, TreeError> {
        match self.id_of(path) {
            Some(id) => {
                let node = self.expect_node(id, path)?;
                if node.is_group() {
                    Ok(id)
                } else {
                    Err(TreeError::NotAGroup {
                        path: path.to_string(),
                    })
                }
            }
            None => self.add_group(path),
        }
    }

    /// Add a leaf, creating missing intermediate groups
    ///
    /// # Errors
    /// Same as [`add_group`](Self::add_group)
    pub fn add_leaf(&mut self, path: &NodePath, leaf: LeafEntity) -> Result<NodeId, TreeError> {
        self.insert(path, NodeData::Leaf(leaf))
    }

    fn insert(&mut self, path: &NodePath, data: NodeData) -> Result<NodeId, TreeError> {
        let segments = path.segments();
        if segments.is_empty() {
            return Err(TreeError::RootImmutable);
        }
        for seg in segments {
            validate_segment(seg)?;
        }
        if self.index.get(path).is_some() {
            return Err(TreeError::NameConflict {
                path: path.to_string(),
            });
        }

        // Deepest existing group on the way down
        let mut parent = ROOT;
        let mut depth = 0;
        while depth + 1 < segments.len() {
            let node = self.expect_node(parent, path)?;
            let Some(child) = node.child(&segments[depth]) else {
                break;
            };
            let prefix = NodePath::from(&segments[..=depth]);
            if !self.expect_node(child, &prefix)?.is_group() {
                return Err(TreeError::NotAGroup {
                    path: prefix.to_string(),
                });
            }
            parent = child;
            depth += 1;
        }

        if self.links.target(parent, &segments[depth]).is_some() {
            return Err(TreeError::NameConflict {
                path: NodePath::from(&segments[..=depth]).to_string(),
            });
        }

        for i in depth..segments.len() - 1 {
            parent = self.push_node(NodePath::from(&segments[..=i]), parent, NodeData::Group);
        }
        Ok(self.push_node(path.clone(), parent, data))
    }

    fn push_node(&mut self, path: NodePath, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        let short = path.last().unwrap_or_default().to_string();
        self.index.insert(&path, id);
        self.nodes.push(Some(Node::new(path, Some(parent), data)));
        if let Some(p) = self.node_mut(parent) {
            p.children_mut().insert(short, id);
        }
        id
    }

    /// Remove a node; groups with children require `recursive`
    ///
    /// Links from or to removed nodes are dropped with them.
    ///
    /// # Errors
    /// - [`TreeError::NotFound`] if absent
    /// - [`TreeError::HasChildren`] for a non-empty group without `recursive`
    /// - [`TreeError::RootImmutable`] for the root
    pub fn remove(&mut self, path: &NodePath, recursive: bool) -> Result<Vec<NodePath>, TreeError> {
        let id = self.require(path)?;
        if id == ROOT {
            return Err(TreeError::RootImmutable);
        }
        if !recursive && !self.expect_node(id, path)?.children().is_empty() {
            return Err(TreeError::HasChildren {
                path: path.to_string(),
            });
        }
        let subtree = self.subtree(id);
        Ok(self.drop_nodes(&subtree))
    }

    /// Remove a subtree but keep every node still linked from outside it,
    /// together with the groups leading to such nodes
    ///
    /// Returns the removed full names.
    ///
    /// # Errors
    /// - [`TreeError::NotFound`] if absent
    /// - [`TreeError::RootImmutable`] for the root
    pub fn remove_unreferenced(&mut self, path: &NodePath) -> Result<Vec<NodePath>, TreeError> {
        let id = self.require(path)?;
        if id == ROOT {
            return Err(TreeError::RootImmutable);
        }
        let subtree = self.subtree(id);
        let members: HashSet<NodeId> = subtree.iter().copied().collect();

        let mut kept = HashSet::new();
        for &n in &subtree {
            if self
                .links
                .is_referenced_elsewhere(n, |source| members.contains(&source))
            {
                let mut cur = Some(n);
                while let Some(c) = cur {
                    if !kept.insert(c) || c == id {
                        break;
                    }
                    cur = self.node(c).and_then(Node::parent);
                }
            }
        }

        if !kept.is_empty() {
            debug!(path = %path, kept = kept.len(), "keeping linked nodes");
        }
        let doomed: Vec<NodeId> = subtree.into_iter().filter(|n| !kept.contains(n)).collect();
        Ok(self.drop_nodes(&doomed))
    }

    /// Node ids of the subtree rooted at `id`, parents before children
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(node) = self.node(n) {
                out.push(n);
                stack.extend(node.children().values().rev().copied());
            }
        }
        out
    }

    /// Full names strictly below `path`, sorted
    #[must_use]
    pub fn descendant_paths(&self, path: &NodePath) -> Vec<NodePath> {
        let mut paths: Vec<NodePath> = self
            .index
            .descendants(path)
            .into_iter()
            .filter_map(|(_, id)| self.node(id).map(|n| n.full_name().clone()))
            .collect();
        paths.sort();
        paths
    }

    // `ids` must list parents before children.
    fn drop_nodes(&mut self, ids: &[NodeId]) -> Vec<NodePath> {
        let mut removed = Vec::with_capacity(ids.len());
        for &id in ids.iter().rev() {
            for entry in self.links.detach(id) {
                debug!(source = %entry.source, name = %entry.name, target = %entry.target, "dropping link");
            }
            let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
                continue;
            };
            self.index.remove(node.full_name());
            if let Some(parent) = node.parent().and_then(|p| self.node_mut(p)) {
                parent.children_mut().shift_remove(node.short_name());
            }
            removed.push(node.full_name().clone());
        }
        removed.reverse();
        removed
    }

    /// Create link `source.name` → `target`
    ///
    /// # Errors
    /// - [`TreeError::NotFound`] if source or target is absent
    /// - [`TreeError::NotAGroup`] if the source is a leaf
    /// - [`TreeError::NameConflict`] if the source has a child or link `name`
    /// - [`TreeError::Path`] if `name` is not a valid segment
    pub fn add_link(
        &mut self,
        source: &NodePath,
        name: &str,
        target: &NodePath,
    ) -> Result<(), TreeError> {
        validate_segment(name)?;
        let src = self.require(source)?;
        let tgt = self.require(target)?;
        let node = self.expect_node(src, source)?;
        if !node.is_group() {
            return Err(TreeError::NotAGroup {
                path: source.to_string(),
            });
        }
        if node.child(name).is_some() || !self.links.add(src, name, tgt) {
            return Err(TreeError::NameConflict {
                path: source.child(name).to_string(),
            });
        }
        Ok(())
    }

    /// Remove link `source.name`, returning its target
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if there is no such link
    pub fn remove_link(&mut self, source: &NodePath, name: &str) -> Result<NodeId, TreeError> {
        let src = self.require(source)?;
        self.links
            .remove(src, name)
            .ok_or_else(|| TreeError::NotFound {
                path: source.child(name).to_string(),
            })
    }

    /// Collect every candidate for `query` below `start`
    ///
    /// Distinct nodes only, sorted by the path they were reached by.
    ///
    /// # Errors
    /// Returns [`TreeError::NotFound`] if `start` is absent
    pub fn find_all(
        &self,
        start: &NodePath,
        query: &NodePath,
        options: &ResolveOptions,
    ) -> Result<Vec<Match>, TreeError> {
        let start_id = self.require(start)?;
        if let Some(hit) = self.walk_exact(start_id, start, query, options.with_links) {
            return Ok(vec![hit]);
        }
        let Some(last) = query.last() else {
            return Ok(Vec::new());
        };
        if !options.shortcuts {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for full in self.index.with_short_name(last) {
            let Some((id, node)) = self
                .index
                .get_str(full)
                .and_then(|id| self.node(id).map(|n| (id, n)))
            else {
                continue;
            };
            if self.embeds_below(start, node.full_name(), query, options.max_depth) {
                matches.push(Match {
                    node: id,
                    path: node.full_name().clone(),
                });
            }
        }

        if options.with_links {
            for source in self.links.sources_named(last) {
                let (Some(src), Some(target)) = (self.node(source), self.links.target(source, last))
                else {
                    continue;
                };
                let through = src.full_name().child(last);
                if self.embeds_below(start, &through, query, options.max_depth) {
                    matches.push(Match {
                        node: target,
                        path: through,
                    });
                }
            }
        }

        matches.sort_by(|a, b| a.path.cmp(&b.path));
        let mut seen = HashSet::new();
        matches.retain(|m| seen.insert(m.node));
        Ok(matches)
    }

    /// Resolve `query` below `start` to exactly one node
    ///
    /// # Errors
    /// - [`TreeError::NotFound`] for zero candidates
    /// - [`TreeError::AmbiguousPath`] for several
    pub fn resolve(
        &self,
        start: &NodePath,
        query: &NodePath,
        options: &ResolveOptions,
    ) -> Result<NodeId, TreeError> {
        let matches = self.find_all(start, query, options)?;
        single_match(query, matches).map(|m| m.node)
    }

    fn walk_exact(
        &self,
        start_id: NodeId,
        start: &NodePath,
        query: &NodePath,
        with_links: bool,
    ) -> Option<Match> {
        let mut cur = start_id;
        for seg in query.iter() {
            let node = self.node(cur)?;
            cur = match node.child(seg) {
                Some(child) => child,
                None if with_links => self.links.target(cur, seg)?,
                None => return None,
            };
        }
        Some(Match {
            node: cur,
            path: start.join(query),
        })
    }

    fn embeds_below(
        &self,
        start: &NodePath,
        candidate: &NodePath,
        query: &NodePath,
        max_depth: Option<usize>,
    ) -> bool {
        start.is_ancestor_of(candidate)
            && embeds(
                &candidate.segments()[start.len()..],
                query.segments(),
                max_depth,
            )
    }

    fn require(&self, path: &NodePath) -> Result<NodeId, TreeError> {
        self.id_of(path).ok_or_else(|| TreeError::NotFound {
            path: path.to_string(),
        })
    }

    fn expect_node(&self, id: NodeId, path: &NodePath) -> Result<&Node, TreeError> {
        self.node(id).ok_or_else(|| TreeError::NotFound {
            path: path.to_string(),
        })
    }
}

impl Default for NamedTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `query` is a subsequence of `relative` ending on its last
/// segment, with every hop (from the start, then between matched segments)
/// at most `max_depth` deep
fn embeds(relative: &[String], query: &[String], max_depth: Option<usize>) -> bool {
    fn place(
        relative: &[String],
        query: &[String],
        qi: usize,
        prev: usize,
        max_depth: Option<usize>,
    ) -> bool {
        let hop_ok = |depth: usize| !matches!(max_depth, Some(m) if depth - prev > m);
        let remaining = query.len() - qi - 1;
        if remaining == 0 {
            let depth = relative.len();
            return depth > prev && relative[depth - 1] == query[qi] && hop_ok(depth);
        }
        let deepest = relative.len().saturating_sub(remaining);
        for depth in prev + 1..=deepest {
            if !hop_ok(depth) {
                break;
            }
            if relative[depth - 1] == query[qi] && place(relative, query, qi + 1, depth, max_depth) {
                return true;
            }
        }
        false
    }

    !relative.is_empty() && !query.is_empty() && place(relative, query, 0, 0, max_depth)
}
