//! Name indexes
//!
//! Provides [`NameIndex`]: a radix trie over full names for exact and subtree
//! lookups, and a short-name index (short name → set of full names) that
//! narrows shortcut candidates.

use crate::node::NodeId;
use radix_trie::{Trie, TrieCommon};
use std::collections::{BTreeSet, HashMap};
use trajex_leaf::{NodePath, SEPARATOR};

/// Full-name and short-name index over every non-root node
#[derive(Debug, Clone)]
pub struct NameIndex {
    /// Radix trie mapping full name -> node
    full: Trie<String, NodeId>,

    /// Short name -> full names carrying it
    short: HashMap<String, BTreeSet<String>>,
}

impl NameIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            full: Trie::new(),
            short: HashMap::new(),
        }
    }

    /// Index a node under its full name
    pub fn insert(&mut self, path: &NodePath, id: NodeId) {
        let key = path.to_string();
        if let Some(short) = path.last() {
            self.short
                .entry(short.to_string())
                .or_default()
                .insert(key.clone());
        }
        self.full.insert(key, id);
    }

    /// Drop a node from both indexes
    pub fn remove(&mut self, path: &NodePath) -> Option<NodeId> {
        let key = path.to_string();
        if let Some(short) = path.last() {
            if let Some(set) = self.short.get_mut(short) {
                set.remove(&key);
                if set.is_empty() {
                    self.short.remove(short);
                }
            }
        }
        self.full.remove(&key)
    }

    /// Exact lookup
    #[inline]
    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<NodeId> {
        self.full.get(&path.to_string()).copied()
    }

    /// Exact lookup by rendered full name
    #[inline]
    #[must_use]
    pub fn get_str(&self, full_name: &str) -> Option<NodeId> {
        self.full.get(full_name).copied()
    }

    /// Full names whose last segment is `short`, in sorted order
    pub fn with_short_name<'a>(&'a self, short: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.short
            .get(short)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Strict descendants of `path` as (full name, node) pairs
    #[must_use]
    pub fn descendants(&self, path: &NodePath) -> Vec<(String, NodeId)> {
        if path.is_empty() {
            return self.full.iter().map(|(k, v)| (k.clone(), *v)).collect();
        }
        // The trailing separator keeps `a.b` from matching `a.bc`.
        let prefix = format!("{path}{SEPARATOR}");
        self.full
            .get_raw_descendant(&prefix)
            .map(|subtrie| {
                subtrie
                    .iter()
                    .filter(|(k, _)| k.starts_with(&prefix))
                    .map(|(k, v)| (k.clone(), *v))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of indexed nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.full.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

impl Default for NameIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    fn populated() -> NameIndex {
        let mut index = NameIndex::new();
        for (i, path) in ["a", "a.b", "a.b.val", "a.bc", "a.bc.val", "z"]
            .iter()
            .enumerate()
        {
            index.insert(&p(path), NodeId(i + 1));
        }
        index
    }

    #[test]
    fn exact_lookup() {
        let index = populated();
        assert_eq!(index.get(&p("a.b.val")), Some(NodeId(3)));
        assert_eq!(index.get(&p("a.c")), None);
        assert_eq!(index.len(), 6);
    }

    #[test]
    fn short_name_candidates_sorted() {
        let index = populated();
        let names: Vec<_> = index.with_short_name("val").collect();
        assert_eq!(names, vec!["a.b.val", "a.bc.val"]);
        assert_eq!(index.with_short_name("nothing").count(), 0);
    }

    #[test]
    fn descendants_respect_segment_boundary() {
        let index = populated();
        let mut names: Vec<_> = index
            .descendants(&p("a.b"))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.b.val".to_string()]);
        assert_eq!(index.descendants(&NodePath::root()).len(), 6);
    }

    #[test]
    fn remove_updates_both_indexes() {
        let mut index = populated();
        assert_eq!(index.remove(&p("a.b.val")), Some(NodeId(3)));
        assert_eq!(index.with_short_name("val").collect::<Vec<_>>(), vec!["a.bc.val"]);
        assert!(index.get(&p("a.b.val")).is_none());
    }
}
