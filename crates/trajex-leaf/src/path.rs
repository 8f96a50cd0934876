//! Dotted node paths
//!
//! Provides [`NodePath`] for hierarchical addressing of nodes in a trajectory tree.

use crate::ErrorClass;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator between path segments
pub const SEPARATOR: char = '.';

/// Full name of a node in a trajectory tree
///
/// The empty path addresses the tree root.
///
/// # Examples
/// - `["parameters", "traffic", "ncars"]` → `parameters.traffic.ncars`
/// - `["results", "run_00000003", "z"]` → `results.run_00000003.z`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// Create new path from already validated segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Short name: the last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Get first segment (if not root)
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Concatenate another path
    #[inline]
    #[must_use]
    pub fn join(&self, tail: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(tail.0.iter().cloned());
        new
    }

    /// Check if this path is a prefix of another
    ///
    /// # Examples
    /// - `parameters.traffic` is prefix of `parameters.traffic.ncars`
    /// - `parameters.traffic` is NOT prefix of `parameters.other`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this path is an ancestor of another (strict prefix)
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Get relative path from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not a descendant of `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, PathError> {
        if !ancestor.is_prefix_of(self) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Whether any segment equals `segment`
    #[inline]
    #[must_use]
    pub fn contains_segment(&self, segment: &str) -> bool {
        self.0.iter().any(|s| s == segment)
    }

    /// Positions of the segments matching `predicate`
    #[must_use]
    pub fn positions(&self, predicate: impl Fn(&str) -> bool) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, s)| predicate(s))
            .map(|(i, _)| i)
            .collect()
    }

    /// Copy of this path with the segments at `positions` replaced by `replacement`
    ///
    /// Positions outside the path are ignored.
    #[must_use]
    pub fn with_replaced(&self, positions: &[usize], replacement: &str) -> Self {
        let mut new = self.clone();
        for &pos in positions {
            if let Some(seg) = new.0.get_mut(pos) {
                replacement.clone_into(seg);
            }
        }
        new
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Validate a single path segment
///
/// # Errors
/// Returns error if the segment is empty or contains anything but
/// alphanumerics and underscores (the separator included)
pub fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        Err(PathError::EmptySegment)
    } else if segment.contains(|c: char| !c.is_alphanumeric() && c != '_') {
        Err(PathError::InvalidSegment(segment.to_string()))
    } else {
        Ok(())
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s
            .split(SEPARATOR)
            .map(|seg| validate_segment(seg).map(|()| seg.to_string()))
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<&[String]> for NodePath {
    fn from(segments: &[String]) -> Self {
        Self(segments.to_vec())
    }
}

impl Default for NodePath {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors related to node paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant {
        /// Path that was expected below `ancestor`
        path: String,
        /// Expected ancestor
        ancestor: String,
    },
}

impl PathError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::InvalidPath
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn path_new_and_segments() {
        let path = NodePath::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(path.segments(), &["a", "b"]);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn path_root() {
        let path = NodePath::root();
        assert!(path.is_empty());
        assert!(path.parent().is_none());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn path_parent_and_last() {
        let path = p("parameters.traffic.ncars");
        assert_eq!(path.parent().unwrap(), p("parameters.traffic"));
        assert_eq!(path.last(), Some("ncars"));
        assert_eq!(path.first(), Some("parameters"));
    }

    #[test]
    fn path_child_and_join() {
        let base = p("results");
        assert_eq!(base.child("z"), p("results.z"));
        assert_eq!(base.join(&p("run_00000001.z")), p("results.run_00000001.z"));
    }

    #[test]
    fn path_prefix_and_ancestor() {
        let a = p("a.b");
        let b = p("a.b.c");
        assert!(a.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
        assert!(a.is_ancestor_of(&b));
        assert!(!a.is_ancestor_of(&a.clone()));
        assert!(!p("a.bc").is_prefix_of(&p("a.b")));
    }

    #[test]
    fn path_relative_to() {
        let full = p("a.b.c.d");
        assert_eq!(full.relative_to(&p("a.b")).unwrap(), p("c.d"));
        assert!(matches!(
            full.relative_to(&p("x")),
            Err(PathError::NotDescendant { .. })
        ));
    }

    #[test]
    fn path_positional_replace() {
        let path = p("results.run_00000000.sub.run_00000000.x");
        let positions = path.positions(|s| s.starts_with("run_"));
        assert_eq!(positions, vec![1, 3]);
        assert_eq!(
            path.with_replaced(&positions, "run_00000005"),
            p("results.run_00000005.sub.run_00000005.x")
        );
    }

    #[test]
    fn path_from_str_rejects_bad_segments() {
        assert!(matches!("a..b".parse::<NodePath>(), Err(PathError::EmptySegment)));
        assert!(matches!(
            "a.b-c".parse::<NodePath>(),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(validate_segment("a.b").is_err());
        assert!(validate_segment("run_ALL").is_ok());
    }

    #[test]
    fn path_serde_as_string() {
        let path = p("config.merge.flag");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"config.merge.flag\"");
        let back: NodePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<NodePath>("\"a..b\"").is_err());
    }
}
