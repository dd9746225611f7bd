//! Expected-value templates
//!
//! A column expectation is either a literal (`ACTIVE`, `100`) or a
//! placeholder resolved against the row's variables:
//!
//! - `${premium}` the variable with its stored type
//! - `${premium:decimal}` the variable converted to a type
//! - `${premium}:decimal` same, with the hint outside the braces
//! - `${100:int}` a typed literal (the key is not a variable)
//!
//! When a hint appears both inside and outside the braces, the inner one wins.

use regex::Regex;
use rowproof_core::{ConversionError, ConverterRegistry, TypeTag, Value, VariableBag};
use std::sync::{Arc, OnceLock};

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"^\$\{([^}]+)\}(?::(\w+))?$").expect("placeholder pattern is valid")
    })
}

/// A template could not be turned into a typed value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown type hint '{hint}'")]
    UnknownTypeHint { hint: String },

    #[error("Cannot convert '{value}' to type '{tag}': {source}")]
    Conversion {
        value: String,
        tag: TypeTag,
        #[source]
        source: ConversionError,
    },
}

/// Resolves expectation templates against a variable bag
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    converters: Arc<ConverterRegistry>,
}

impl TemplateResolver {
    pub fn new(converters: Arc<ConverterRegistry>) -> Self {
        Self { converters }
    }

    /// Resolve `template` to a typed value
    ///
    /// Non-string templates and strings that are not a single placeholder
    /// are literals and come back unchanged.
    pub fn resolve(&self, template: &Value, variables: &VariableBag) -> Result<Value, TemplateError> {
        let Value::Str(text) = template else {
            return Ok(template.clone());
        };

        let Some(captures) = placeholder().captures(text.trim()) else {
            return Ok(template.clone());
        };

        let inner = captures.get(1).map_or("", |m| m.as_str());
        let outer_hint = captures.get(2).map(|m| m.as_str());

        let (key, inner_tag) = match inner.rsplit_once(':') {
            Some((prefix, suffix)) => match self.converters.lookup(suffix) {
                Some(tag) => (prefix, Some(tag)),
                None => (inner, None),
            },
            None => (inner, None),
        };

        let tag = match (inner_tag, outer_hint) {
            (Some(tag), _) => Some(tag),
            (None, Some(hint)) => Some(self.converters.lookup(hint).ok_or_else(|| {
                TemplateError::UnknownTypeHint {
                    hint: hint.to_string(),
                }
            })?),
            (None, None) => None,
        };

        let base = match variables.get(key) {
            Some(value) => value.clone(),
            None => Value::Str(key.to_string()),
        };

        match tag {
            Some(tag) => self
                .converters
                .convert(tag, &base)
                .map_err(|source| TemplateError::Conversion {
                    value: base.to_string(),
                    tag,
                    source,
                }),
            None => Ok(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn resolver() -> TemplateResolver {
        TemplateResolver::new(Arc::new(ConverterRegistry::default()))
    }

    fn variables() -> VariableBag {
        let mut bag = VariableBag::new();
        bag.insert("policy".to_string(), Value::from("POL-0001"));
        bag.insert("calc".to_string(), Value::Float(1388.19));
        bag.insert("term".to_string(), Value::Int(12));
        bag
    }

    #[test]
    fn literals_keep_their_type() {
        let r = resolver();
        assert_eq!(r.resolve(&Value::Int(100), &variables()).unwrap(), Value::Int(100));
        assert_eq!(
            r.resolve(&Value::from("ACTIVE"), &variables()).unwrap(),
            Value::from("ACTIVE")
        );
        assert_eq!(r.resolve(&Value::Null, &variables()).unwrap(), Value::Null);
    }

    #[test]
    fn variable_keeps_stored_type() {
        let r = resolver();
        assert_eq!(
            r.resolve(&Value::from("${term}"), &variables()).unwrap(),
            Value::Int(12)
        );
    }

    #[test]
    fn inner_and_outer_hints() {
        let r = resolver();
        let expected = Value::Decimal(Decimal::from_str("1388.19").unwrap());
        assert_eq!(
            r.resolve(&Value::from("${calc:decimal}"), &variables()).unwrap(),
            expected
        );
        assert_eq!(
            r.resolve(&Value::from("${calc}:decimal"), &variables()).unwrap(),
            expected
        );
    }

    #[test]
    fn inner_hint_wins() {
        let r = resolver();
        assert_eq!(
            r.resolve(&Value::from("${term:string}:float"), &variables()).unwrap(),
            Value::from("12")
        );
    }

    #[test]
    fn typed_literals() {
        let r = resolver();
        assert_eq!(
            r.resolve(&Value::from("${100:int}"), &variables()).unwrap(),
            Value::Int(100)
        );
        assert_eq!(
            r.resolve(&Value::from("${2025-11-15:date}"), &variables()).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2025, 11, 15).unwrap())
        );
        assert_eq!(
            r.resolve(&Value::from("${unknown}"), &variables()).unwrap(),
            Value::from("unknown")
        );
    }

    #[test]
    fn colon_without_known_tag_is_part_of_the_key() {
        let r = resolver();
        assert_eq!(
            r.resolve(&Value::from("${10:30}"), &variables()).unwrap(),
            Value::from("10:30")
        );
    }

    #[test]
    fn placeholder_must_cover_the_whole_template() {
        let r = resolver();
        assert_eq!(
            r.resolve(&Value::from("Policy ${policy}"), &variables()).unwrap(),
            Value::from("Policy ${policy}")
        );
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let r = resolver();
        assert_eq!(
            r.resolve(&Value::from("  ${policy} "), &variables()).unwrap(),
            Value::from("POL-0001")
        );
    }

    #[test]
    fn conversion_failure() {
        let r = resolver();
        let err = r.resolve(&Value::from("${policy:int}"), &variables()).unwrap_err();
        assert!(matches!(err, TemplateError::Conversion { tag: TypeTag::Int, .. }));
        assert!(err.to_string().starts_with("Cannot convert 'POL-0001' to type 'int'"));
    }

    #[test]
    fn unknown_outer_hint() {
        let r = resolver();
        let err = r.resolve(&Value::from("${policy}:money"), &variables()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownTypeHint {
                hint: "money".to_string()
            }
        );
    }
}
