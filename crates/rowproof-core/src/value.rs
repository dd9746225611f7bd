//! Typed values and the row shapes that carry them
//!
//! Every value that takes part in a comparison is a [`Value`]: values read
//! from the database, typed variables built from a data row, and literals
//! parsed from configuration. The set of variants is closed so that type
//! reconciliation can be expressed as an exhaustive match.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A raw data row: column identifier (header name or zero-based index) to raw text
pub type DataRow = IndexMap<String, String>;

/// A row returned by the SQL executor: column name to typed driver value
pub type ResultRow = IndexMap<String, Value>;

/// Typed variables built once per data row, used for SQL binding and templates
pub type VariableBag = IndexMap<String, Value>;

/// A dynamically typed scalar
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL / missing value
    Null,

    /// Boolean
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// Binary floating point
    Float(f64),

    /// Arbitrary-precision decimal (financial amounts)
    Decimal(Decimal),

    /// Calendar date without time
    Date(NaiveDate),

    /// Date and time without time zone
    DateTime(NaiveDateTime),

    /// Text
    Str(String),
}

/// Runtime kind of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Decimal,
    Date,
    DateTime,
    Str,
}

impl ValueKind {
    /// Stable type name used in mismatch messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Str => "str",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Runtime kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::Date(_) => ValueKind::Date,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Str(_) => ValueKind::Str,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    /// Date or datetime
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date(_) | Self::DateTime(_))
    }

    /// Borrow the text of a `Str` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" so floats read as floats
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            // Decimal and temporal values travel as text to keep them exact
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar (null, boolean, number or string)")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {} is out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Str(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(Value::Null.kind().as_str(), "null");
        assert_eq!(Value::Decimal(Decimal::ONE).kind().as_str(), "decimal");
        assert_eq!(Value::from("x").kind().to_string(), "str");
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Float(100.0).to_string(), "100.0");
        assert_eq!(Value::Decimal(Decimal::from_str("1388.19").unwrap()).to_string(), "1388.19");
        let date = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2025-11-15");
        let dt = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2025-11-15 10:30:00");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn yaml_literals_keep_their_type() {
        let parsed: IndexMap<String, Value> = serde_yaml::from_str(
            "count: 100\nratio: 0.5\nactive: true\nstatus: ACTIVE\nmissing: null\n",
        )
        .unwrap();

        assert_eq!(parsed["count"], Value::Int(100));
        assert_eq!(parsed["ratio"], Value::Float(0.5));
        assert_eq!(parsed["active"], Value::Bool(true));
        assert_eq!(parsed["status"], Value::from("ACTIVE"));
        assert_eq!(parsed["missing"], Value::Null);
    }

    #[test]
    fn decimal_serializes_as_text() {
        let value = Value::Decimal(Decimal::from_str("0.10").unwrap());
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"0.10\"");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3i64)), Value::Int(3));
    }
}
