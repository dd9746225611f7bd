//! End-to-end validation scenarios against the mock executor
//!
//! Each test loads validations the way a suite config declares them and runs
//! a data row through the full pipeline.

use chrono::NaiveDate;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use rowproof_core::{DataRow, ValidationSpec, ValidatorSettings, Value};
use rowproof_engine::{Validator, VARIABLE_SETUP};
use rowproof_executor::{result_row, MockExecutor, MockExecutorBuilder};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

const STATUS_SQL: &str = "SELECT status FROM policy WHERE policy_number = :policy";
const PREMIUM_SQL: &str = "SELECT total_premium FROM policy WHERE policy_number = :policy";

fn data_row(pairs: &[(&str, &str)]) -> DataRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn variables(yaml: &str) -> IndexMap<String, String> {
    serde_yaml::from_str(yaml).unwrap()
}

fn validations(yaml: &str) -> Vec<ValidationSpec> {
    serde_yaml::from_str(yaml).unwrap()
}

fn validator(executor: MockExecutor) -> Validator {
    Validator::new(Arc::new(executor), &ValidatorSettings::default())
}

#[tokio::test]
async fn scenario_a_status_matches() {
    let executor = MockExecutorBuilder::new()
        .with_rows(STATUS_SQL, vec![result_row([("status", Value::from("ACTIVE"))])])
        .build();
    let recorder = executor.clone();

    let result = validator(executor)
        .validate_row(
            1,
            &data_row(&[("id", "POL-0001")]),
            &variables("policy: \"${row.id}\"\n"),
            &validations(&format!(
                "- name: Policy is active\n  sql: {}\n  expect:\n    columns:\n      status: ACTIVE\n",
                STATUS_SQL
            )),
        )
        .await;

    assert!(!result.has_failures, "{:?}", result.validations);
    assert_eq!(result.validations.len(), 1);

    let calls = recorder.executed().await;
    assert_eq!(calls[0].params["policy"], Value::from("POL-0001"));
}

#[tokio::test]
async fn scenario_b_row_count_mismatch_suppresses_other_checks() {
    let executor = MockExecutorBuilder::new().with_rows(STATUS_SQL, vec![]).build();

    let result = validator(executor)
        .validate_row(
            1,
            &data_row(&[("id", "POL-0404")]),
            &variables("policy: \"${row.id}\"\n"),
            &validations(&format!(
                "- name: Policy exists\n  sql: {}\n  expect:\n    row_count: 1\n    not_null: [status]\n",
                STATUS_SQL
            )),
        )
        .await;

    assert!(result.has_failures);
    assert_eq!(
        result.validations[0].errors,
        vec!["Row count mismatch: expected 1, got 0"]
    );
}

#[tokio::test]
async fn scenario_c_decimal_against_float_variable() {
    let executor = MockExecutorBuilder::new()
        .with_rows(
            PREMIUM_SQL,
            vec![result_row([(
                "total_premium",
                Value::Decimal(Decimal::from_str("1388.19").unwrap()),
            )])],
        )
        .build();

    let result = validator(executor)
        .validate_row(
            1,
            &data_row(&[("id", "POL-0001"), ("premium", "1388.19")]),
            &variables("policy: \"${row.id}\"\ncalc: \"${row.premium}:float\"\n"),
            &validations(&format!(
                "- name: Premium\n  sql: {}\n  expect:\n    row_count: 1\n    columns:\n      total_premium: \"${{calc:decimal}}\"\n",
                PREMIUM_SQL
            )),
        )
        .await;

    assert!(!result.has_failures, "{:?}", result.validations);
}

#[tokio::test]
async fn scenario_d_malformed_variable_fails_the_row() {
    let executor = MockExecutorBuilder::new().with_rows(STATUS_SQL, vec![]).build();

    let result = validator(executor)
        .validate_row(
            4,
            &data_row(&[("id", "POL-0001"), ("count", "twelve")]),
            &variables("policy: \"${row.id}\"\ncount: \"${row.count}:int\"\n"),
            &validations(&format!(
                "- name: Policy exists\n  sql: {}\n  expect:\n    row_count: 1\n",
                STATUS_SQL
            )),
        )
        .await;

    assert!(result.has_failures);
    assert_eq!(result.validations.len(), 1);
    let setup = &result.validations[0];
    assert_eq!(setup.name, VARIABLE_SETUP);
    assert_eq!(setup.errors.len(), 1);
    assert!(setup.errors[0].contains("twelve"));
    assert!(setup.errors[0].contains("'int'"));
}

#[tokio::test]
async fn mixed_findings_across_policies() {
    let sql = "SELECT status, total_premium, effective_date, agent FROM policy WHERE policy_number = :policy";
    let executor = MockExecutorBuilder::new()
        .with_rows(
            sql,
            vec![result_row([
                ("status", Value::from("ACTIVE")),
                ("total_premium", Value::Decimal(Decimal::from_str("2500.00").unwrap())),
                (
                    "effective_date",
                    Value::Date(NaiveDate::from_ymd_opt(2025, 11, 15).unwrap()),
                ),
                ("agent", Value::Null),
            ])],
        )
        .build();

    let config = variables(
        "policy: \"${row.PolicyNumber}\"\npremium: \"${row.Premium}:decimal\"\nstart: \"${row.Start}:date\"\n",
    );
    let checks = validations(&format!(
        r#"
- name: Policy details
  sql: {}
  expect:
    row_count: 1
    not_null: [status, agent]
    columns:
      status: ACTIVE
      total_premium: "${{premium}}"
      effective_date: "${{start}}"
  on_failure: continue
"#,
        sql
    ));

    let result = validator(executor)
        .validate_row(
            2,
            &data_row(&[
                ("PolicyNumber", "POL-0002"),
                ("Premium", "2500"),
                ("Start", "2025-11-15"),
            ]),
            &config,
            &checks,
        )
        .await;

    assert!(result.has_failures);
    assert_eq!(
        result.validations[0].errors,
        vec!["Not-null check failed: Column 'agent' is NULL."]
    );
}
