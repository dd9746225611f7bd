//! Declarative validation specs and the results they produce

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What to do with the remaining validations of a row after this one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Skip the remaining validations for the row
    #[default]
    Stop,

    /// Keep running the remaining validations
    Continue,
}

/// Assertions evaluated against one query's result set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpectationSpec {
    /// Exact number of rows the query must return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,

    /// Columns of the first row that must be present and non-NULL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_null: Option<Vec<String>>,

    /// Expected values for columns of the first row (literal or template)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<IndexMap<String, Value>>,

    /// Accept an empty result set when content checks are requested
    /// without a `row_count`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_empty: bool,
}

impl ExpectationSpec {
    /// Whether any assertion is configured
    pub fn has_assertions(&self) -> bool {
        self.row_count.is_some() || self.not_null.is_some() || self.columns.is_some()
    }

    /// Whether `not_null` or `columns` checks are configured
    pub fn has_content_checks(&self) -> bool {
        self.not_null.is_some() || self.columns.is_some()
    }
}

/// One SQL check run per data row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSpec {
    /// Human-readable name
    pub name: String,

    /// Query with `:name` bind parameters
    pub sql: String,

    /// Assertions on the result
    pub expect: ExpectationSpec,

    /// Policy for later validations when this one fails
    #[serde(default)]
    pub on_failure: OnFailure,
}

/// Outcome of one [`ValidationSpec`] for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub name: String,

    pub passed: bool,

    /// Ordered findings; empty when passed
    pub errors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_executed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_row_count: Option<usize>,
}

impl ValidationResult {
    /// A passing result for an executed statement
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            errors: Vec::new(),
            sql_executed: Some(sql.into()),
            actual_row_count: None,
        }
    }

    /// A failing result that never reached the database
    pub fn setup_failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            errors: vec![error.into()],
            sql_executed: None,
            actual_row_count: None,
        }
    }

    /// Record a finding and mark the result failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.passed = false;
        self.errors.push(error.into());
    }
}

/// All validation outcomes for one data row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowResult {
    /// True iff any contained validation failed
    pub has_failures: bool,

    pub validations: Vec<ValidationResult>,
}

impl RowResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result, keeping `has_failures` in sync
    pub fn push(&mut self, result: ValidationResult) {
        if !result.passed {
            self.has_failures = true;
        }
        self.validations.push(result);
    }

    /// Failed validations only
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validations.iter().filter(|v| !v.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_spec_from_yaml() {
        let yaml = r#"
name: Policy exists
sql: SELECT status, premium FROM policy WHERE policy_number = :policy
expect:
  row_count: 1
  not_null: [status]
  columns:
    status: ACTIVE
    premium: "${premium:decimal}"
    term: 12
on_failure: continue
"#;
        let spec: ValidationSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.on_failure, OnFailure::Continue);
        assert_eq!(spec.expect.row_count, Some(1));

        let columns = spec.expect.columns.unwrap();
        let names: Vec<&str> = columns.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["status", "premium", "term"]);
        assert_eq!(columns["term"], Value::Int(12));
    }

    #[test]
    fn on_failure_defaults_to_stop() {
        let spec: ValidationSpec =
            serde_yaml::from_str("name: a\nsql: SELECT 1\nexpect: {row_count: 1}\n").unwrap();
        assert_eq!(spec.on_failure, OnFailure::Stop);
        assert!(!spec.expect.allow_empty);
    }

    #[test]
    fn row_result_tracks_failures() {
        let mut row = RowResult::new();
        row.push(ValidationResult::new("ok", "SELECT 1"));
        assert!(!row.has_failures);

        let mut failed = ValidationResult::new("bad", "SELECT 2");
        failed.fail("Row count mismatch: expected 1, got 0");
        row.push(failed);

        assert!(row.has_failures);
        assert_eq!(row.failures().count(), 1);
    }

    #[test]
    fn expectation_assertion_flags() {
        let empty = ExpectationSpec::default();
        assert!(!empty.has_assertions());

        let content = ExpectationSpec {
            not_null: Some(vec!["id".into()]),
            ..Default::default()
        };
        assert!(content.has_assertions());
        assert!(content.has_content_checks());
    }
}
