//! Expectation checker
//!
//! Evaluates one validation's `expect` block against the rows its query
//! returned. Checks run in a fixed order:
//!
//! 1. `row_count`: a mismatch is recorded and nothing else is checked
//! 2. empty result: passes unless content checks need a row (see below)
//! 3. `not_null`: every listed column of the first row
//! 4. `columns`: every expected value against the first row
//!
//! Content checks on an empty result fail unless `row_count` was given
//! or `allow_empty` is set. Only the first row is ever inspected.

use crate::compare::Comparator;
use crate::template::TemplateResolver;
use rowproof_core::{ExpectationSpec, ResultRow, ValidationResult, VariableBag};

/// Applies expectation specs to query results
#[derive(Debug, Clone)]
pub struct ExpectationChecker {
    resolver: TemplateResolver,
    comparator: Comparator,
}

impl ExpectationChecker {
    pub fn new(resolver: TemplateResolver, comparator: Comparator) -> Self {
        Self {
            resolver,
            comparator,
        }
    }

    /// Record every finding for `rows` on `result`
    pub fn check(
        &self,
        expect: &ExpectationSpec,
        rows: &[ResultRow],
        variables: &VariableBag,
        result: &mut ValidationResult,
    ) {
        if let Some(expected_count) = expect.row_count {
            if rows.len() != expected_count {
                result.fail(format!(
                    "Row count mismatch: expected {}, got {}",
                    expected_count,
                    rows.len()
                ));
                return;
            }
        }

        let Some(first_row) = rows.first() else {
            if expect.has_content_checks() && expect.row_count.is_none() && !expect.allow_empty {
                result.fail("Single-row query required: expected 1 row, got 0");
            }
            return;
        };

        if let Some(not_null) = &expect.not_null {
            for column in not_null {
                match first_row.get(column) {
                    None => result.fail(format!(
                        "Not-null check failed: Column '{}' not found in result set.",
                        column
                    )),
                    Some(value) if value.is_null() => result.fail(format!(
                        "Not-null check failed: Column '{}' is NULL.",
                        column
                    )),
                    Some(_) => {}
                }
            }
        }

        if let Some(columns) = &expect.columns {
            for (column, template) in columns {
                let Some(actual) = first_row.get(column) else {
                    result.fail(format!("Column '{}' not found in result set.", column));
                    continue;
                };

                let expected = match self.resolver.resolve(template, variables) {
                    Ok(expected) => expected,
                    Err(e) => {
                        result.fail(format!(
                            "Column '{}': Invalid template '{}'. Error: {}",
                            column, template, e
                        ));
                        continue;
                    }
                };

                if !self.comparator.values_equal(actual, &expected) {
                    result.fail(format!(
                        "Column '{}': Mismatch - expected '{}' (type: {}), got '{}' (type: {})",
                        column,
                        expected,
                        expected.kind(),
                        actual,
                        actual.kind()
                    ));
                }
            }
        }
    }
}
