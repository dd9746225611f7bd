//! Row orchestrator
//!
//! For each data row: build the variables, then run the validations in
//! order against the executor, stopping early when a failing validation's
//! `on_failure` policy says so. Nothing a data row can contain makes
//! [`Validator::validate_row`] fail; every problem becomes a recorded finding.

use crate::compare::Comparator;
use crate::expectation::ExpectationChecker;
use crate::normalize::Normalizer;
use crate::template::TemplateResolver;
use crate::variables::VariableBuilder;
use indexmap::IndexMap;
use rowproof_core::{
    ConverterRegistry, DataRow, OnFailure, RowResult, ValidationResult, ValidationSpec, ValidatorSettings,
    VariableBag,
};
use rowproof_executor::{ExecuteError, SqlExecutor};
use std::sync::Arc;
use std::time::Duration;

/// Name of the synthetic result recorded when variables cannot be built
pub const VARIABLE_SETUP: &str = "Variable Setup";

/// Validates data rows against a list of SQL checks
pub struct Validator {
    executor: Arc<dyn SqlExecutor>,
    converters: Arc<ConverterRegistry>,
    variables: VariableBuilder,
    checker: ExpectationChecker,
    timeout: Duration,
}

impl Validator {
    /// Create a validator; the converter registry is built once from `settings`
    pub fn new(executor: Arc<dyn SqlExecutor>, settings: &ValidatorSettings) -> Self {
        let converters = Arc::new(settings.converters());
        let comparator = Comparator::new(Normalizer::new(converters.clone()), settings.float_tolerance);

        Self {
            executor,
            variables: VariableBuilder::new(converters.clone()),
            checker: ExpectationChecker::new(TemplateResolver::new(converters.clone()), comparator),
            converters,
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }

    pub fn executor(&self) -> &dyn SqlExecutor {
        self.executor.as_ref()
    }

    /// Validate one data row
    pub async fn validate_row(
        &self,
        row_number: usize,
        row: &DataRow,
        variables_config: &IndexMap<String, String>,
        validations: &[ValidationSpec],
    ) -> RowResult {
        let mut result = RowResult::new();

        let variables = match self.variables.build(row, variables_config) {
            Ok(variables) => variables,
            Err(e) => {
                tracing::warn!(row = row_number, "variable setup failed: {}", e);
                result.push(ValidationResult::setup_failure(VARIABLE_SETUP, e.to_string()));
                return result;
            }
        };

        for spec in validations {
            let outcome = self.run_validation(spec, &variables).await;
            let passed = outcome.passed;

            if passed {
                tracing::debug!(row = row_number, validation = %spec.name, "validation passed");
            } else {
                tracing::debug!(
                    row = row_number,
                    validation = %spec.name,
                    errors = ?outcome.errors,
                    "validation failed"
                );
            }

            result.push(outcome);

            if !passed && spec.on_failure == OnFailure::Stop {
                break;
            }
        }

        result
    }

    /// Execute one validation and check its expectations
    pub async fn run_validation(&self, spec: &ValidationSpec, variables: &VariableBag) -> ValidationResult {
        let mut result = ValidationResult::new(&spec.name, &spec.sql);

        let rows = match self.execute(&spec.sql, variables).await {
            Ok(rows) => rows,
            Err(e) => {
                result.fail(format!("Execution Error: {}", e));
                return result;
            }
        };

        result.actual_row_count = Some(rows.len());
        self.checker.check(&spec.expect, &rows, variables, &mut result);
        result
    }

    async fn execute(
        &self,
        sql: &str,
        variables: &VariableBag,
    ) -> Result<Vec<rowproof_core::ResultRow>, ExecuteError> {
        let query = self.executor.execute_with(sql, variables, &self.converters);
        match tokio::time::timeout(self.timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(ExecuteError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rowproof_core::{ExpectationSpec, Value};
    use rowproof_executor::{result_row, MockExecutorBuilder};

    const STATUS_SQL: &str = "SELECT status FROM policy WHERE policy_number = :policy";
    const CLAIMS_SQL: &str = "SELECT COUNT(*) AS n FROM claim WHERE policy_number = :policy";

    fn spec(name: &str, sql: &str, expect: ExpectationSpec, on_failure: OnFailure) -> ValidationSpec {
        ValidationSpec {
            name: name.to_string(),
            sql: sql.to_string(),
            expect,
            on_failure,
        }
    }

    fn expect_rows(count: usize) -> ExpectationSpec {
        ExpectationSpec {
            row_count: Some(count),
            ..Default::default()
        }
    }

    fn row() -> DataRow {
        let mut row = DataRow::new();
        row.insert("id".to_string(), "POL-0001".to_string());
        row
    }

    fn variables_config() -> IndexMap<String, String> {
        let mut config = IndexMap::new();
        config.insert("policy".to_string(), "${row.id}".to_string());
        config
    }

    fn validator(executor: rowproof_executor::MockExecutor) -> Validator {
        Validator::new(Arc::new(executor), &ValidatorSettings::default())
    }

    #[tokio::test]
    async fn stop_policy_skips_remaining_validations() {
        let executor = MockExecutorBuilder::new()
            .with_rows(STATUS_SQL, vec![])
            .with_rows(CLAIMS_SQL, vec![result_row([("n", Value::Int(0))])])
            .build();
        let v = validator(executor);

        let validations = vec![
            spec("exists", STATUS_SQL, expect_rows(1), OnFailure::Stop),
            spec("claims", CLAIMS_SQL, expect_rows(1), OnFailure::Stop),
        ];
        let result = v.validate_row(1, &row(), &variables_config(), &validations).await;

        assert!(result.has_failures);
        assert_eq!(result.validations.len(), 1);
        assert_eq!(result.validations[0].actual_row_count, Some(0));
    }

    #[tokio::test]
    async fn continue_policy_runs_the_rest() {
        let executor = MockExecutorBuilder::new()
            .with_rows(STATUS_SQL, vec![])
            .with_rows(CLAIMS_SQL, vec![result_row([("n", Value::Int(0))])])
            .build();
        let v = validator(executor);

        let validations = vec![
            spec("exists", STATUS_SQL, expect_rows(1), OnFailure::Continue),
            spec("claims", CLAIMS_SQL, expect_rows(1), OnFailure::Stop),
        ];
        let result = v.validate_row(1, &row(), &variables_config(), &validations).await;

        assert!(result.has_failures);
        assert_eq!(result.validations.len(), 2);
        assert!(!result.validations[0].passed);
        assert!(result.validations[1].passed);
    }

    #[tokio::test]
    async fn execution_error_is_recorded() {
        let executor = MockExecutorBuilder::new()
            .with_error(STATUS_SQL, ExecuteError::QueryError("syntax error at or near \"FORM\"".into()))
            .build();
        let v = validator(executor);

        let outcome = v
            .run_validation(
                &spec("exists", STATUS_SQL, expect_rows(1), OnFailure::Stop),
                &[("policy".to_string(), Value::from("POL-0001"))].into_iter().collect(),
            )
            .await;

        assert!(!outcome.passed);
        assert_eq!(
            outcome.errors,
            vec!["Execution Error: Query failed: syntax error at or near \"FORM\""]
        );
        assert_eq!(outcome.sql_executed.as_deref(), Some(STATUS_SQL));
        assert_eq!(outcome.actual_row_count, None);
    }

    #[tokio::test]
    async fn slow_query_times_out() {
        let executor = MockExecutorBuilder::new()
            .with_rows(STATUS_SQL, vec![])
            .with_latency(3_000)
            .build();
        let settings = ValidatorSettings {
            timeout_seconds: 1,
            ..Default::default()
        };
        let v = Validator::new(Arc::new(executor), &settings);

        let result = v
            .validate_row(
                1,
                &row(),
                &variables_config(),
                &[spec("exists", STATUS_SQL, expect_rows(0), OnFailure::Stop)],
            )
            .await;

        assert_eq!(
            result.validations[0].errors,
            vec!["Execution Error: query timed out after 1s"]
        );
    }

    #[tokio::test]
    async fn executor_receives_the_configured_date_format() {
        let executor = MockExecutorBuilder::new().with_rows(STATUS_SQL, vec![]).build();
        let recorder = executor.clone();
        let settings = ValidatorSettings {
            date_format: "%d/%m/%Y".to_string(),
            ..ValidatorSettings::default()
        };
        let v = Validator::new(Arc::new(executor), &settings);

        v.validate_row(
            1,
            &row(),
            &variables_config(),
            &[spec("exists", STATUS_SQL, expect_rows(0), OnFailure::Continue)],
        )
        .await;

        let calls = recorder.executed().await;
        assert_eq!(calls[0].date_format.as_deref(), Some("%d/%m/%Y"));
    }

    #[tokio::test]
    async fn variable_failure_never_reaches_the_database() {
        let executor = MockExecutorBuilder::new().with_rows(STATUS_SQL, vec![]).build();
        let recorder = executor.clone();
        let v = validator(executor);

        let mut config = variables_config();
        config.insert("premium".to_string(), "${row.premium}:decimal".to_string());

        let result = v
            .validate_row(
                3,
                &row(),
                &config,
                &[spec("exists", STATUS_SQL, expect_rows(0), OnFailure::Stop)],
            )
            .await;

        assert!(result.has_failures);
        assert_eq!(result.validations.len(), 1);
        assert_eq!(result.validations[0].name, VARIABLE_SETUP);
        assert_eq!(result.validations[0].sql_executed, None);
        assert_eq!(recorder.execution_count().await, 0);
    }
}
