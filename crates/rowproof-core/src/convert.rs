//! Type converter registry
//!
//! Named conversions (`string`, `int`, `float`, `decimal`, `date`,
//! `datetime`) used to cast row-derived variables and to resolve typed
//! literals in expectation templates. The registry is immutable once built
//! and is shared by reference across the engine.

use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Default format for parsing dates (and datetimes when no datetime format is set)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A conversion target named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    Int,
    Float,
    Decimal,
    Date,
    DateTime,
}

impl TypeTag {
    /// All tags, in registry order
    pub const ALL: [TypeTag; 6] = [
        Self::String,
        Self::Int,
        Self::Float,
        Self::Decimal,
        Self::Date,
        Self::DateTime,
    ];

    /// Look up a tag by its configuration name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "decimal" => Some(Self::Decimal),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::DateTime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A converter rejected its input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot convert '{value}' to {tag}: {reason}")]
pub struct ConversionError {
    /// Target type
    pub tag: TypeTag,

    /// Display form of the rejected input
    pub value: String,

    /// Underlying cause
    pub reason: String,
}

impl ConversionError {
    fn new(tag: TypeTag, value: &Value, reason: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Immutable mapping from [`TypeTag`] to conversion function
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterRegistry {
    date_format: String,
    datetime_format: String,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT, None)
    }
}

impl ConverterRegistry {
    /// Build a registry; `datetime_format` falls back to `date_format`
    pub fn new(date_format: impl Into<String>, datetime_format: Option<String>) -> Self {
        let date_format = date_format.into();
        let datetime_format = datetime_format.unwrap_or_else(|| date_format.clone());
        Self {
            date_format,
            datetime_format,
        }
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn datetime_format(&self) -> &str {
        &self.datetime_format
    }

    /// Look up a tag name known to this registry
    pub fn lookup(&self, name: &str) -> Option<TypeTag> {
        TypeTag::parse(name)
    }

    /// Apply the converter named by `tag`
    pub fn convert(&self, tag: TypeTag, value: &Value) -> Result<Value, ConversionError> {
        match tag {
            TypeTag::String => Ok(Value::Str(value.to_string())),
            TypeTag::Int => self.to_int(value).map(Value::Int),
            TypeTag::Float => self.to_float(value).map(Value::Float),
            TypeTag::Decimal => self.to_decimal(value).map(Value::Decimal),
            TypeTag::Date => self.to_date(value).map(Value::Date),
            TypeTag::DateTime => self.to_datetime(value).map(Value::DateTime),
        }
    }

    pub fn to_int(&self, value: &Value) -> Result<i64, ConversionError> {
        let err = |reason: &str| ConversionError::new(TypeTag::Int, value, reason);
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| err(&format!("invalid integer literal ({})", e))),
            Value::Float(x) => {
                let truncated = x.trunc();
                if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                    Ok(truncated as i64)
                } else {
                    Err(err("float is not representable as an integer"))
                }
            }
            Value::Decimal(d) => {
                use rust_decimal::prelude::ToPrimitive;
                d.trunc()
                    .to_i64()
                    .ok_or_else(|| err("decimal is out of integer range"))
            }
            Value::Null | Value::Date(_) | Value::DateTime(_) => {
                Err(err(&format!("{} has no integer form", value.kind())))
            }
        }
    }

    pub fn to_float(&self, value: &Value) -> Result<f64, ConversionError> {
        let err = |reason: &str| ConversionError::new(TypeTag::Float, value, reason);
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| err(&format!("invalid float literal ({})", e))),
            Value::Decimal(d) => {
                use rust_decimal::prelude::ToPrimitive;
                d.to_f64().ok_or_else(|| err("decimal is out of float range"))
            }
            Value::Null | Value::Date(_) | Value::DateTime(_) => {
                Err(err(&format!("{} has no float form", value.kind())))
            }
        }
    }

    /// Decimal conversion always goes through text, never through binary float
    pub fn to_decimal(&self, value: &Value) -> Result<Decimal, ConversionError> {
        let err = |reason: String| ConversionError::new(TypeTag::Decimal, value, reason);
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::Float(x) => parse_decimal(&x.to_string()).map_err(err),
            Value::Str(s) => parse_decimal(s.trim()).map_err(err),
            Value::Null | Value::Bool(_) | Value::Date(_) | Value::DateTime(_) => {
                Err(err(format!("{} has no decimal form", value.kind())))
            }
        }
    }

    pub fn to_date(&self, value: &Value) -> Result<NaiveDate, ConversionError> {
        match value {
            Value::DateTime(dt) => Ok(dt.date()),
            Value::Date(d) => Ok(*d),
            Value::Null => Err(ConversionError::new(TypeTag::Date, value, "null has no date form")),
            other => {
                let text = other.to_string();
                NaiveDate::parse_from_str(&text, &self.date_format).map_err(|e| {
                    ConversionError::new(
                        TypeTag::Date,
                        value,
                        format!("does not match format '{}' ({})", self.date_format, e),
                    )
                })
            }
        }
    }

    pub fn to_datetime(&self, value: &Value) -> Result<NaiveDateTime, ConversionError> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::Null => Err(ConversionError::new(
                TypeTag::DateTime,
                value,
                "null has no datetime form",
            )),
            other => {
                let text = other.to_string();
                let format = &self.datetime_format;
                NaiveDateTime::parse_from_str(&text, format)
                    // A date-only format yields midnight
                    .or_else(|e| {
                        NaiveDate::parse_from_str(&text, format)
                            .map(|d| d.and_time(NaiveTime::MIN))
                            .map_err(|_| e)
                    })
                    .map_err(|e| {
                        ConversionError::new(
                            TypeTag::DateTime,
                            value,
                            format!("does not match format '{}' ({})", format, e),
                        )
                    })
            }
        }
    }
}

/// Parse decimal text, accepting scientific notation
fn parse_decimal(text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("invalid decimal literal ({})", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ConverterRegistry {
        ConverterRegistry::default()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn tag_lookup() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(TypeTag::parse("bool"), None);
        assert_eq!(TypeTag::parse("INT"), None);
    }

    #[test]
    fn int_conversion() {
        let reg = registry();
        assert_eq!(reg.convert(TypeTag::Int, &Value::from(" 12 ")).unwrap(), Value::Int(12));
        assert_eq!(reg.convert(TypeTag::Int, &Value::Float(3.9)).unwrap(), Value::Int(3));

        let err = reg.convert(TypeTag::Int, &Value::from("twelve")).unwrap_err();
        assert_eq!(err.tag, TypeTag::Int);
        assert_eq!(err.value, "twelve");
    }

    #[test]
    fn decimal_goes_through_text() {
        let reg = registry();
        assert_eq!(reg.to_decimal(&Value::Float(0.1)).unwrap(), dec("0.1"));
        assert_eq!(reg.to_decimal(&Value::Float(1388.19)).unwrap(), dec("1388.19"));
        assert_eq!(reg.to_decimal(&Value::from("2500.00")).unwrap(), dec("2500.00"));
        assert_eq!(reg.to_decimal(&Value::Int(100)).unwrap(), dec("100"));
        assert_eq!(reg.to_decimal(&Value::from("1e3")).unwrap(), dec("1000"));
        assert!(reg.to_decimal(&Value::Bool(true)).is_err());
        assert!(reg.to_decimal(&Value::from("abc")).is_err());
    }

    #[test]
    fn date_parsing_uses_configured_format() {
        let reg = registry();
        let expected = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        assert_eq!(reg.to_date(&Value::from("2025-11-15")).unwrap(), expected);

        let err = reg.to_date(&Value::from("15/11/2025")).unwrap_err();
        assert!(err.reason.contains("does not match format"));

        let uk = ConverterRegistry::new("%d/%m/%Y", None);
        assert_eq!(uk.to_date(&Value::from("15/11/2025")).unwrap(), expected);
    }

    #[test]
    fn date_truncates_datetime() {
        let reg = registry();
        let dt = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(reg.to_date(&Value::DateTime(dt)).unwrap(), dt.date());
    }

    #[test]
    fn datetime_from_date_is_midnight() {
        let reg = registry();
        let d = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        let dt = reg.to_datetime(&Value::Date(d)).unwrap();
        assert_eq!(dt, d.and_hms_opt(0, 0, 0).unwrap());

        // Date-only datetime format still parses
        let parsed = reg.to_datetime(&Value::from("2025-11-15")).unwrap();
        assert_eq!(parsed, d.and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn datetime_with_explicit_format() {
        let reg = ConverterRegistry::new("%Y-%m-%d", Some("%Y-%m-%d %H:%M:%S".to_string()));
        let parsed = reg.to_datetime(&Value::from("2025-11-15 10:30:00")).unwrap();
        assert_eq!(
            parsed,
            NaiveDate::from_ymd_opt(2025, 11, 15).unwrap().and_hms_opt(10, 30, 0).unwrap()
        );
    }

    #[test]
    fn string_conversion_uses_display() {
        let reg = registry();
        assert_eq!(reg.convert(TypeTag::String, &Value::Int(7)).unwrap(), Value::from("7"));
    }
}
