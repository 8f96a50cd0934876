//! Lockable leaf entities
//!
//! A [`LeafEntity`] holds a default value and, once explored, one value per
//! run. The access index selects which of them [`LeafEntity::value`] reports.

use crate::kind::LeafKind;
use crate::value::{Value, ValueType};
use crate::ErrorClass;
use std::sync::Arc;

/// Typed data holder with an optional exploration range
///
/// # Invariants
/// - explored ⇔ `range` is non-empty
/// - the access index, when set, is within `range`
/// - locked leaves reject every mutation of value or range
#[derive(Debug, Clone)]
pub struct LeafEntity {
    kind: Arc<dyn LeafKind>,
    default: Option<Value>,
    range: Vec<Value>,
    locked: bool,
    access: Option<usize>,
    comment: String,
}

impl LeafEntity {
    /// Create empty leaf of the given kind
    #[must_use]
    pub fn new(kind: Arc<dyn LeafKind>) -> Self {
        Self {
            kind,
            default: None,
            range: Vec::new(),
            locked: false,
            access: None,
            comment: String::new(),
        }
    }

    /// Create leaf holding a default value
    #[must_use]
    pub fn with_value(kind: Arc<dyn LeafKind>, value: Value) -> Self {
        let mut leaf = Self::new(kind);
        leaf.default = Some(value);
        leaf
    }

    /// Attach a comment
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Kind of this leaf
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &Arc<dyn LeafKind> {
        &self.kind
    }

    /// Comment
    #[inline]
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Externally visible value: `range[access]` when an access index is
    /// set, the default otherwise
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self.access {
            Some(i) => self.range.get(i),
            None => self.default.as_ref(),
        }
    }

    /// Default value, independent of the access index
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Exploration range (empty when unexplored)
    #[inline]
    #[must_use]
    pub fn range(&self) -> &[Value] {
        &self.range
    }

    /// Value a run sees: `range[run]` when explored, the default otherwise
    #[must_use]
    pub fn value_at(&self, run: usize) -> Option<&Value> {
        if self.is_explored() {
            self.range.get(run)
        } else {
            self.default.as_ref()
        }
    }

    /// Whether a range is set
    #[inline]
    #[must_use]
    pub fn is_explored(&self) -> bool {
        !self.range.is_empty()
    }

    /// Whether the leaf holds neither default nor range
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.range.is_empty()
    }

    /// Whether the leaf is locked
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Current access index
    #[inline]
    #[must_use]
    pub fn access_index(&self) -> Option<usize> {
        self.access
    }

    /// Lock against mutation
    #[inline]
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Unlock
    #[inline]
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Replace the default value
    ///
    /// # Errors
    /// - [`LeafError::Locked`] if locked
    /// - [`LeafError::TypeMismatch`] if `value` differs in type from the
    ///   current default
    pub fn set_value(&mut self, value: Value) -> Result<(), LeafError> {
        self.ensure_unlocked()?;
        if let Some(current) = &self.default {
            self.ensure_same_type(current, &value)?;
        }
        self.default = Some(value);
        Ok(())
    }

    /// Set the exploration range
    ///
    /// An empty leaf takes `values[0]` as its default.
    ///
    /// # Errors
    /// - [`LeafError::Locked`] if locked
    /// - [`LeafError::AlreadyExplored`] if a range is set
    /// - [`LeafError::NotExplorable`] for non-parameter kinds
    /// - [`LeafError::EmptyRange`] if `values` is empty
    /// - [`LeafError::TypeMismatch`] if a value differs in type from the default
    pub fn explore(&mut self, values: Vec<Value>) -> Result<(), LeafError> {
        self.check_explore(&values)?;
        if self.default.is_none() {
            self.default = values.first().cloned();
        }
        self.range = values;
        Ok(())
    }

    /// Validate an [`explore`](Self::explore) call without applying it
    ///
    /// # Errors
    /// Same as [`explore`](Self::explore)
    pub fn check_explore(&self, values: &[Value]) -> Result<(), LeafError> {
        self.ensure_unlocked()?;
        if !self.kind.is_parameter() {
            return Err(LeafError::NotExplorable {
                kind: self.kind.tag().to_string(),
            });
        }
        if self.is_explored() {
            return Err(LeafError::AlreadyExplored);
        }
        if values.is_empty() {
            return Err(LeafError::EmptyRange);
        }
        let reference = self.default.as_ref().unwrap_or(&values[0]);
        values
            .iter()
            .try_for_each(|v| self.ensure_same_type(reference, v))
    }

    /// Append to the exploration range
    ///
    /// # Errors
    /// - [`LeafError::Locked`] if locked
    /// - [`LeafError::NotExplored`] if no range is set
    /// - [`LeafError::TypeMismatch`] if a value differs in type from the default
    pub fn expand(&mut self, values: Vec<Value>) -> Result<(), LeafError> {
        self.check_expand(&values)?;
        self.range.extend(values);
        Ok(())
    }

    /// Validate an [`expand`](Self::expand) call without applying it
    ///
    /// # Errors
    /// Same as [`expand`](Self::expand)
    pub fn check_expand(&self, values: &[Value]) -> Result<(), LeafError> {
        self.ensure_unlocked()?;
        if !self.is_explored() {
            return Err(LeafError::NotExplored);
        }
        let reference = self.default.as_ref().unwrap_or(&self.range[0]);
        values
            .iter()
            .try_for_each(|v| self.ensure_same_type(reference, v))
    }

    /// Drop the exploration range
    ///
    /// # Errors
    /// Returns [`LeafError::Locked`] if locked
    pub fn shrink(&mut self) -> Result<(), LeafError> {
        self.ensure_unlocked()?;
        self.range.clear();
        self.access = None;
        Ok(())
    }

    /// Make [`value`](Self::value) report the default again
    #[inline]
    pub fn restore_default(&mut self) {
        self.access = None;
    }

    /// Make [`value`](Self::value) report `range[index]`
    ///
    /// # Errors
    /// - [`LeafError::NotExplored`] if no range is set
    /// - [`LeafError::IndexOutOfRange`] if `index >= range.len()`
    pub fn set_access_index(&mut self, index: usize) -> Result<(), LeafError> {
        if !self.is_explored() {
            return Err(LeafError::NotExplored);
        }
        if index >= self.range.len() {
            return Err(LeafError::IndexOutOfRange {
                index,
                len: self.range.len(),
            });
        }
        self.access = Some(index);
        Ok(())
    }

    /// Copy retaining only `range[index]`, with access set to it
    ///
    /// Unexplored leaves are copied unchanged.
    ///
    /// # Errors
    /// Returns [`LeafError::IndexOutOfRange`] if `index >= range.len()`
    pub fn narrowed(&self, index: usize) -> Result<Self, LeafError> {
        if !self.is_explored() {
            return Ok(self.clone());
        }
        let value = self
            .range
            .get(index)
            .cloned()
            .ok_or(LeafError::IndexOutOfRange {
                index,
                len: self.range.len(),
            })?;
        let mut copy = self.clone();
        copy.range = vec![value];
        copy.access = Some(0);
        Ok(copy)
    }

    /// Empty leaf of the same kind carrying the same comment
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new(Arc::clone(&self.kind)).with_comment(self.comment.clone())
    }

    fn ensure_unlocked(&self) -> Result<(), LeafError> {
        if self.locked {
            Err(LeafError::Locked)
        } else {
            Ok(())
        }
    }

    fn ensure_same_type(&self, reference: &Value, value: &Value) -> Result<(), LeafError> {
        if self.kind.same_type(reference, value) {
            Ok(())
        } else {
            Err(LeafError::TypeMismatch {
                expected: reference.value_type(),
                actual: value.value_type(),
            })
        }
    }
}

impl PartialEq for LeafEntity {
    fn eq(&self, other: &Self) -> bool {
        self.kind.tag() == other.kind.tag()
            && self.default == other.default
            && self.range == other.range
            && self.locked == other.locked
            && self.access == other.access
            && self.comment == other.comment
    }
}

/// Errors raised by leaf operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeafError {
    /// Mutation of a locked leaf
    #[error("leaf is locked")]
    Locked,

    /// Explore called on an explored leaf
    #[error("leaf is already explored; expand it instead")]
    AlreadyExplored,

    /// Range operation on an unexplored leaf
    #[error("leaf is not explored")]
    NotExplored,

    /// Explore on a kind without a parameter role
    #[error("leaves of kind '{kind}' cannot be explored")]
    NotExplorable {
        /// Kind tag
        kind: String,
    },

    /// Explore with no values
    #[error("exploration range is empty")]
    EmptyRange,

    /// Value of the wrong type
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type of the existing default
        expected: ValueType,
        /// Offending type
        actual: ValueType,
    },

    /// Access index beyond the range
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Range length
        len: usize,
    },
}

impl LeafError {
    /// Taxonomy class of this error
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Locked => ErrorClass::LockedMutation,
            Self::AlreadyExplored | Self::NotExplored | Self::NotExplorable { .. } => {
                ErrorClass::Kind
            }
            Self::EmptyRange => ErrorClass::RangeLengthMismatch,
            Self::TypeMismatch { .. } => ErrorClass::TypeMismatch,
            Self::IndexOutOfRange { .. } => ErrorClass::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{ParameterKind, ResultKind};
    use pretty_assertions::assert_eq;

    fn param(v: impl Into<Value>) -> LeafEntity {
        LeafEntity::with_value(Arc::new(ParameterKind), v.into())
    }

    fn ints(xs: &[i64]) -> Vec<Value> {
        xs.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn explore_and_access() {
        let mut leaf = param(0);
        leaf.explore(ints(&[1, 2, 3])).unwrap();
        assert!(leaf.is_explored());
        assert_eq!(leaf.value(), Some(&Value::Int(0)));

        leaf.set_access_index(2).unwrap();
        assert_eq!(leaf.value(), Some(&Value::Int(3)));

        leaf.restore_default();
        assert_eq!(leaf.value(), Some(&Value::Int(0)));
    }

    #[test]
    fn explore_empty_leaf_takes_first_as_default() {
        let mut leaf = LeafEntity::new(Arc::new(ParameterKind));
        leaf.explore(ints(&[5, 6])).unwrap();
        assert_eq!(leaf.default_value(), Some(&Value::Int(5)));
    }

    #[test]
    fn explore_twice_fails() {
        let mut leaf = param(0);
        leaf.explore(ints(&[1])).unwrap();
        assert_eq!(leaf.explore(ints(&[2])), Err(LeafError::AlreadyExplored));
    }

    #[test]
    fn locked_rejects_mutation() {
        let mut leaf = param(0);
        leaf.lock();
        assert_eq!(leaf.set_value(Value::Int(1)), Err(LeafError::Locked));
        assert_eq!(leaf.explore(ints(&[1])), Err(LeafError::Locked));
        assert_eq!(LeafError::Locked.class(), ErrorClass::LockedMutation);

        leaf.unlock();
        leaf.set_value(Value::Int(1)).unwrap();
        assert_eq!(leaf.value(), Some(&Value::Int(1)));
    }

    #[test]
    fn type_is_conserved() {
        let mut leaf = param(1);
        assert!(matches!(
            leaf.set_value(Value::from("x")),
            Err(LeafError::TypeMismatch { .. })
        ));
        assert!(matches!(
            leaf.explore(vec![Value::Int(1), Value::Float(2.0)]),
            Err(LeafError::TypeMismatch { .. })
        ));
        assert!(!leaf.is_explored());
    }

    #[test]
    fn results_cannot_be_explored() {
        let mut leaf = LeafEntity::new(Arc::new(ResultKind));
        assert!(matches!(
            leaf.explore(ints(&[1])),
            Err(LeafError::NotExplorable { .. })
        ));
    }

    #[test]
    fn expand_requires_range() {
        let mut leaf = param(0);
        assert_eq!(leaf.expand(ints(&[1])), Err(LeafError::NotExplored));
        leaf.explore(ints(&[1, 2])).unwrap();
        leaf.expand(ints(&[3])).unwrap();
        assert_eq!(leaf.range(), ints(&[1, 2, 3]).as_slice());
    }

    #[test]
    fn access_out_of_range() {
        let mut leaf = param(0);
        leaf.explore(ints(&[1, 2])).unwrap();
        assert_eq!(
            leaf.set_access_index(2),
            Err(LeafError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn narrowed_keeps_one_slot() {
        let mut leaf = param(0);
        leaf.explore(ints(&[1, 2, 3])).unwrap();
        let narrow = leaf.narrowed(1).unwrap();
        assert_eq!(narrow.range(), ints(&[2]).as_slice());
        assert_eq!(narrow.value(), Some(&Value::Int(2)));
    }

    #[test]
    fn shrink_drops_range() {
        let mut leaf = param(0);
        leaf.explore(ints(&[1, 2])).unwrap();
        leaf.set_access_index(1).unwrap();
        leaf.shrink().unwrap();
        assert!(!leaf.is_explored());
        assert_eq!(leaf.value(), Some(&Value::Int(0)));
    }

    #[test]
    fn value_at_run() {
        let mut explored = param(0);
        explored.explore(ints(&[4, 5])).unwrap();
        assert_eq!(explored.value_at(1), Some(&Value::Int(5)));
        assert_eq!(param(9).value_at(7), Some(&Value::Int(9)));
    }
}
