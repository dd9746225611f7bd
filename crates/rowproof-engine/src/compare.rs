//! Equality judgment between normalized values

use crate::normalize::Normalizer;
use rowproof_core::Value;

/// Relative-tolerance float closeness
///
/// `|a - b| <= tolerance * max(|a|, |b|)`. Equal values (including both zero
/// and matching infinities) are always close; NaN is never close.
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    if a == b {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Decides whether an actual database value satisfies an expected value
#[derive(Debug, Clone)]
pub struct Comparator {
    normalizer: Normalizer,
    float_tolerance: f64,
}

impl Comparator {
    pub fn new(normalizer: Normalizer, float_tolerance: f64) -> Self {
        Self {
            normalizer,
            float_tolerance,
        }
    }

    pub fn float_tolerance(&self) -> f64 {
        self.float_tolerance
    }

    /// Normalize, then compare floats by tolerance and everything else exactly
    pub fn values_equal(&self, actual: &Value, expected: &Value) -> bool {
        match self.normalizer.normalize(actual.clone(), expected.clone()) {
            (Value::Float(a), Value::Float(e)) => is_close(a, e, self.float_tolerance),
            (a, e) => a == e,
        }
    }
}
