//! Link registry
//!
//! Links are named, non-owning edges from a group to any node. The registry
//! keeps the forward table, a reverse index (target → source → names) and a
//! name index, all updated in the same call.

use crate::node::NodeId;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sources (and link names) pointing at one target
pub type LinkSources = BTreeMap<NodeId, BTreeSet<String>>;

/// Forward and reverse link tables
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    forward: HashMap<NodeId, IndexMap<String, NodeId>>,
    reverse: HashMap<NodeId, LinkSources>,
    by_name: HashMap<String, BTreeSet<NodeId>>,
}

/// One link as stored in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    /// Group holding the link
    pub source: NodeId,
    /// Link name, unique among the source's children and links
    pub name: String,
    /// Linked node
    pub target: NodeId,
}

impl LinkRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link; returns `false` if `source` already has a link `name`
    pub fn add(&mut self, source: NodeId, name: &str, target: NodeId) -> bool {
        let links = self.forward.entry(source).or_default();
        if links.contains_key(name) {
            return false;
        }
        links.insert(name.to_string(), target);
        self.reverse
            .entry(target)
            .or_default()
            .entry(source)
            .or_default()
            .insert(name.to_string());
        self.by_name
            .entry(name.to_string())
            .or_default()
            .insert(source);
        true
    }

    /// Unregister a link, returning its target
    pub fn remove(&mut self, source: NodeId, name: &str) -> Option<NodeId> {
        let links = self.forward.get_mut(&source)?;
        let target = links.shift_remove(name)?;
        if links.is_empty() {
            self.forward.remove(&source);
        }

        if let Some(sources) = self.reverse.get_mut(&target) {
            if let Some(names) = sources.get_mut(&source) {
                names.remove(name);
                if names.is_empty() {
                    sources.remove(&source);
                }
            }
            if sources.is_empty() {
                self.reverse.remove(&target);
            }
        }

        if let Some(set) = self.by_name.get_mut(name) {
            set.remove(&source);
            if set.is_empty() {
                self.by_name.remove(name);
            }
        }
        Some(target)
    }

    /// Target of `source.name`
    #[inline]
    #[must_use]
    pub fn target(&self, source: NodeId, name: &str) -> Option<NodeId> {
        self.forward.get(&source)?.get(name).copied()
    }

    /// Links held by `source`, in insertion order
    pub fn links_from(&self, source: NodeId) -> impl Iterator<Item = (&str, NodeId)> {
        self.forward
            .get(&source)
            .into_iter()
            .flat_map(|links| links.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Every source holding a link called `name`
    pub fn sources_named<'a>(&'a self, name: &str) -> impl Iterator<Item = NodeId> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Who links to `target`, and under which names
    #[inline]
    #[must_use]
    pub fn reverse_lookup(&self, target: NodeId) -> Option<&LinkSources> {
        self.reverse.get(&target)
    }

    /// Whether a source not accepted by `excluded` links to `target`
    #[must_use]
    pub fn is_referenced_elsewhere(
        &self,
        target: NodeId,
        excluded: impl Fn(NodeId) -> bool,
    ) -> bool {
        self.reverse
            .get(&target)
            .is_some_and(|sources| sources.keys().any(|s| !excluded(*s)))
    }

    /// Remove every link from or to `node`
    pub fn detach(&mut self, node: NodeId) -> Vec<LinkEntry> {
        let mut doomed: Vec<(NodeId, String)> = self
            .links_from(node)
            .map(|(name, _)| (node, name.to_string()))
            .collect();
        if let Some(sources) = self.reverse.get(&node) {
            for (source, names) in sources {
                doomed.extend(names.iter().map(|n| (*source, n.clone())));
            }
        }

        doomed
            .into_iter()
            .filter_map(|(source, name)| {
                self.remove(source, &name).map(|target| LinkEntry {
                    source,
                    name,
                    target,
                })
            })
            .collect()
    }

    /// All links, sorted by source then insertion order
    #[must_use]
    pub fn entries(&self) -> Vec<LinkEntry> {
        let mut sources: Vec<_> = self.forward.keys().copied().collect();
        sources.sort_unstable();
        sources
            .into_iter()
            .flat_map(|source| {
                self.links_from(source).map(move |(name, target)| LinkEntry {
                    source,
                    name: name.to_string(),
                    target,
                })
            })
            .collect()
    }

    /// Number of links
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.values().map(IndexMap::len).sum()
    }

    /// Check if no link is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_and_lookup_both_directions() {
        let mut links = LinkRegistry::new();
        assert!(links.add(NodeId(1), "l", NodeId(5)));
        assert!(links.add(NodeId(2), "l", NodeId(5)));
        assert!(links.add(NodeId(2), "m", NodeId(5)));

        assert_eq!(links.target(NodeId(1), "l"), Some(NodeId(5)));
        let sources = links.reverse_lookup(NodeId(5)).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[&NodeId(2)].len(), 2);
        assert_eq!(
            links.sources_named("l").collect::<Vec<_>>(),
            vec![NodeId(1), NodeId(2)]
        );
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut links = LinkRegistry::new();
        assert!(links.add(NodeId(1), "l", NodeId(5)));
        assert!(!links.add(NodeId(1), "l", NodeId(6)));
        assert_eq!(links.target(NodeId(1), "l"), Some(NodeId(5)));
    }

    #[test]
    fn remove_clears_reverse_entry() {
        let mut links = LinkRegistry::new();
        links.add(NodeId(1), "l", NodeId(5));
        assert_eq!(links.remove(NodeId(1), "l"), Some(NodeId(5)));
        assert!(links.reverse_lookup(NodeId(5)).is_none());
        assert_eq!(links.sources_named("l").count(), 0);
        assert!(links.is_empty());
        assert_eq!(links.remove(NodeId(1), "l"), None);
    }

    #[test]
    fn referenced_elsewhere_honours_exclusion() {
        let mut links = LinkRegistry::new();
        links.add(NodeId(1), "l", NodeId(5));
        assert!(links.is_referenced_elsewhere(NodeId(5), |_| false));
        assert!(!links.is_referenced_elsewhere(NodeId(5), |s| s == NodeId(1)));
        assert!(!links.is_referenced_elsewhere(NodeId(9), |_| false));
    }

    #[test]
    fn detach_drops_incoming_and_outgoing() {
        let mut links = LinkRegistry::new();
        links.add(NodeId(1), "out", NodeId(2));
        links.add(NodeId(3), "in", NodeId(1));
        links.add(NodeId(3), "other", NodeId(2));

        let removed = links.detach(NodeId(1));
        assert_eq!(removed.len(), 2);
        assert_eq!(links.entries().len(), 1);
        assert_eq!(links.target(NodeId(3), "other"), Some(NodeId(2)));
    }
}
