//! Leaf kinds
//!
//! A [`LeafKind`] decides whether a leaf takes part in the parameter space and
//! how two of its values are compared. Merging relies on these comparisons, so
//! a kind can relax them (see [`ApproxParameterKind`]).

use crate::value::Value;
use std::fmt::Debug;

/// Tag of the strict parameter kind
pub const PARAMETER: &str = "parameter";

/// Tag of the tolerance-based parameter kind
pub const APPROX_PARAMETER: &str = "approx_parameter";

/// Tag of the result kind
pub const RESULT: &str = "result";

/// Behaviour shared by every leaf of one kind
///
/// # Contract
/// - `tag` is stable and unique within a [`KindRegistry`](crate::KindRegistry)
/// - `same_type` and `equal_values` are symmetric
pub trait LeafKind: Send + Sync + Debug {
    /// Registry tag
    fn tag(&self) -> &str;

    /// Whether leaves of this kind may carry an exploration range
    fn is_parameter(&self) -> bool;

    /// Type compatibility of two values
    fn same_type(&self, a: &Value, b: &Value) -> bool {
        strict_same_type(a, b)
    }

    /// Value equality used for merge change detection and deduplication
    fn equal_values(&self, a: &Value, b: &Value) -> bool {
        a == b
    }
}

/// Structural type equality: equal tags, and for lists equal element types
/// wherever both sides have an element
#[must_use]
pub fn strict_same_type(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(xs), Value::List(ys)) => xs
            .iter()
            .zip(ys)
            .all(|(x, y)| strict_same_type(x, y)),
        _ => a.value_type() == b.value_type(),
    }
}

/// Plain parameter: strict types, exact equality
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterKind;

impl LeafKind for ParameterKind {
    fn tag(&self) -> &str {
        PARAMETER
    }

    fn is_parameter(&self) -> bool {
        true
    }
}

/// Parameter whose floats compare equal within an absolute tolerance
#[derive(Debug, Clone, Copy)]
pub struct ApproxParameterKind {
    tolerance: f64,
}

impl ApproxParameterKind {
    /// Create kind with the given absolute tolerance
    #[inline]
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    /// Absolute tolerance
    #[inline]
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn approx_eq(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Float(x), Value::Float(y)) => (x - y).abs() <= self.tolerance,
            (Value::List(xs), Value::List(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.approx_eq(x, y))
            }
            _ => a == b,
        }
    }
}

impl Default for ApproxParameterKind {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl LeafKind for ApproxParameterKind {
    fn tag(&self) -> &str {
        APPROX_PARAMETER
    }

    fn is_parameter(&self) -> bool {
        true
    }

    fn equal_values(&self, a: &Value, b: &Value) -> bool {
        self.approx_eq(a, b)
    }
}

/// Result leaf: never explored
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultKind;

impl LeafKind for ResultKind {
    fn tag(&self) -> &str {
        RESULT
    }

    fn is_parameter(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_types() {
        assert!(strict_same_type(&Value::Int(1), &Value::Int(7)));
        assert!(!strict_same_type(&Value::Int(1), &Value::Float(1.0)));
        assert!(strict_same_type(
            &Value::from(vec![1, 2]),
            &Value::from(vec![3])
        ));
        assert!(!strict_same_type(
            &Value::from(vec![1]),
            &Value::from(vec!["a"])
        ));
    }

    #[test]
    fn approx_equality() {
        let kind = ApproxParameterKind::new(0.01);
        assert!(kind.equal_values(&Value::Float(1.0), &Value::Float(1.005)));
        assert!(!kind.equal_values(&Value::Float(1.0), &Value::Float(1.1)));
        assert!(kind.equal_values(
            &Value::from(vec![1.0, 2.0]),
            &Value::from(vec![1.001, 2.0])
        ));
        assert!(!ParameterKind.equal_values(&Value::Float(1.0), &Value::Float(1.005)));
    }

    #[test]
    fn roles() {
        assert!(ParameterKind.is_parameter());
        assert!(ApproxParameterKind::default().is_parameter());
        assert!(!ResultKind.is_parameter());
    }
}
