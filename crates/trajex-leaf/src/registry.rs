//! Leaf kind registry
//!
//! Provides [`KindRegistry`], the explicit tag → kind table used whenever a
//! leaf is created from a tag (user input, storage, merging).

use crate::kind::{ApproxParameterKind, LeafKind, ParameterKind, ResultKind};
use crate::leaf::LeafEntity;
use crate::value::Value;
use crate::ErrorClass;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of leaf kinds, populated at configuration time
#[derive(Debug, Default, Clone)]
pub struct KindRegistry {
    kinds: BTreeMap<String, Arc<dyn LeafKind>>,
}

impl KindRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Create registry with the built-in kinds
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ParameterKind));
        registry.register(Arc::new(ApproxParameterKind::default()));
        registry.register(Arc::new(ResultKind));
        registry
    }

    /// Register a kind under its tag, replacing any previous one
    pub fn register(&mut self, kind: Arc<dyn LeafKind>) -> Option<Arc<dyn LeafKind>> {
        self.kinds.insert(kind.tag().to_string(), kind)
    }

    /// Check if a tag is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.kinds.contains_key(tag)
    }

    /// Look up a kind
    ///
    /// # Errors
    /// Returns [`KindError::UnknownKind`] for unregistered tags
    pub fn get(&self, tag: &str) -> Result<Arc<dyn LeafKind>, KindError> {
        self.kinds
            .get(tag)
            .cloned()
            .ok_or_else(|| KindError::UnknownKind(tag.to_string()))
    }

    /// Construct an empty leaf of the given kind
    ///
    /// # Errors
    /// Returns [`KindError::UnknownKind`] for unregistered tags
    pub fn instantiate(&self, tag: &str) -> Result<LeafEntity, KindError> {
        Ok(LeafEntity::new(self.get(tag)?))
    }

    /// Construct a leaf of the given kind holding `value`
    ///
    /// # Errors
    /// Returns [`KindError::UnknownKind`] for unregistered tags
    pub fn instantiate_with(&self, tag: &str, value: Value) -> Result<LeafEntity, KindError> {
        Ok(LeafEntity::with_value(self.get(tag)?, value))
    }

    /// List all registered tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    /// Get number of registered kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Errors raised by the kind registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KindError {
    /// Tag not registered
    #[error("unknown leaf kind: {0}")]
    UnknownKind(String),
}

impl KindError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{APPROX_PARAMETER, PARAMETER, RESULT};

    #[test]
    fn defaults_registered() {
        let registry = KindRegistry::with_defaults();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.tags(), vec![APPROX_PARAMETER, PARAMETER, RESULT]);
    }

    #[test]
    fn instantiate_known_tag() {
        let registry = KindRegistry::with_defaults();
        let leaf = registry.instantiate_with(PARAMETER, Value::Int(3)).unwrap();
        assert_eq!(leaf.kind().tag(), PARAMETER);
        assert_eq!(leaf.value(), Some(&Value::Int(3)));
    }

    #[test]
    fn unknown_tag_is_not_found() {
        let registry = KindRegistry::new();
        let err = registry.instantiate("matrix").unwrap_err();
        assert_eq!(err, KindError::UnknownKind("matrix".into()));
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn register_replaces() {
        let mut registry = KindRegistry::with_defaults();
        let previous = registry.register(Arc::new(ApproxParameterKind::new(0.5)));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 3);
    }
}
