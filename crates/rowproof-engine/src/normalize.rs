//! Type normalization
//!
//! Reconciles a value read from the database with an expected value from
//! configuration so that they can be compared without losing precision.
//! Rules are tried in a fixed order and the first one that applies decides
//! the outcome:
//!
//! 1. identical kinds pass through
//! 2. a null on either side passes through
//! 3. a decimal on either side converts the other side to decimal
//! 4. a date or datetime on either side reconciles towards the more specific type
//! 5. int and float unify to float
//! 6. a boolean on either side converts 0/1 and true/false tokens, and
//!    becomes 1.0/0.0 against a float
//! 7. non-string pairs convert the actual value to the expected kind
//!
//! Anything else is returned unchanged. Normalization never fails: a
//! conversion that does not succeed leaves the pair as it was.

use rowproof_core::{ConverterRegistry, TypeTag, Value, ValueKind};
use std::sync::Arc;

/// Parse a boolean token (`true`/`t`/`1`, `false`/`f`/`0`, any case)
pub fn parse_bool_token(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Applies the normalization rules with a shared converter registry
#[derive(Debug, Clone)]
pub struct Normalizer {
    converters: Arc<ConverterRegistry>,
}

impl Normalizer {
    pub fn new(converters: Arc<ConverterRegistry>) -> Self {
        Self { converters }
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    /// Bring `actual` and `expected` to a common comparable representation
    pub fn normalize(&self, actual: Value, expected: Value) -> (Value, Value) {
        if actual.kind() == expected.kind() {
            return (actual, expected);
        }

        if actual.is_null() || expected.is_null() {
            return (actual, expected);
        }

        if matches!(actual, Value::Decimal(_)) || matches!(expected, Value::Decimal(_)) {
            return self.normalize_decimal(actual, expected);
        }

        if actual.is_temporal() || expected.is_temporal() {
            return self.normalize_temporal(actual, expected);
        }

        match (&actual, &expected) {
            (Value::Int(a), Value::Float(_)) => return (Value::Float(*a as f64), expected),
            (Value::Float(_), Value::Int(e)) => return (actual, Value::Float(*e as f64)),
            _ => {}
        }

        if matches!(actual, Value::Bool(_)) || matches!(expected, Value::Bool(_)) {
            return normalize_boolean(actual, expected);
        }

        // Strings never take part in the last-resort coercion
        if !actual.is_str() && !expected.is_str() {
            if let Some(tag) = tag_for(expected.kind()) {
                if let Ok(converted) = self.converters.convert(tag, &actual) {
                    return (converted, expected);
                }
            }
        }

        (actual, expected)
    }

    /// Convert the non-decimal side; a decimal is never turned into a float
    fn normalize_decimal(&self, actual: Value, expected: Value) -> (Value, Value) {
        match (&actual, &expected) {
            (Value::Decimal(_), other) if decimal_candidate(other) => {
                match self.converters.to_decimal(other) {
                    Ok(d) => (actual, Value::Decimal(d)),
                    Err(_) => (actual, expected),
                }
            }
            (other, Value::Decimal(_)) if decimal_candidate(other) => {
                match self.converters.to_decimal(other) {
                    Ok(d) => (Value::Decimal(d), expected),
                    Err(_) => (actual, expected),
                }
            }
            _ => (actual, expected),
        }
    }

    /// Datetime is preferred over date; otherwise fall back to date parsing
    fn normalize_temporal(&self, actual: Value, expected: Value) -> (Value, Value) {
        if matches!(expected, Value::DateTime(_)) {
            if let Ok(dt) = self.converters.to_datetime(&actual) {
                return (Value::DateTime(dt), expected);
            }
        }

        if matches!(actual, Value::DateTime(_)) {
            if let Ok(dt) = self.converters.to_datetime(&expected) {
                return (actual, Value::DateTime(dt));
            }
        }

        if matches!(expected, Value::Date(_)) {
            if let Ok(d) = self.converters.to_date(&actual) {
                return (Value::Date(d), expected);
            }
        }

        if matches!(actual, Value::Date(_)) {
            if let Ok(d) = self.converters.to_date(&expected) {
                return (actual, Value::Date(d));
            }
        }

        (actual, expected)
    }
}

/// Kinds that may be converted to decimal during normalization
fn decimal_candidate(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_) | Value::Str(_))
}

fn normalize_boolean(actual: Value, expected: Value) -> (Value, Value) {
    match (&actual, &expected) {
        (Value::Bool(_), Value::Int(e @ (0 | 1))) => {
            let e = *e == 1;
            (actual, Value::Bool(e))
        }
        (Value::Int(a @ (0 | 1)), Value::Bool(_)) => (Value::Bool(*a == 1), expected),
        (Value::Bool(a), Value::Float(_)) => (Value::Float(bool_as_float(*a)), expected),
        (Value::Float(_), Value::Bool(e)) => {
            let e = bool_as_float(*e);
            (actual, Value::Float(e))
        }
        (Value::Bool(_), Value::Str(s)) => match parse_bool_token(s) {
            Some(b) => (actual, Value::Bool(b)),
            None => (actual, expected),
        },
        (Value::Str(s), Value::Bool(_)) => match parse_bool_token(s) {
            Some(b) => (Value::Bool(b), expected),
            None => (actual, expected),
        },
        _ => (actual, expected),
    }
}

fn bool_as_float(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Converter that produces values of `kind`, if any
fn tag_for(kind: ValueKind) -> Option<TypeTag> {
    match kind {
        ValueKind::Int => Some(TypeTag::Int),
        ValueKind::Float => Some(TypeTag::Float),
        ValueKind::Decimal => Some(TypeTag::Decimal),
        ValueKind::Date => Some(TypeTag::Date),
        ValueKind::DateTime => Some(TypeTag::DateTime),
        ValueKind::Null | ValueKind::Bool | ValueKind::Str => None,
    }
}
