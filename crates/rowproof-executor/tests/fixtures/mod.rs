//! Test fixtures for executor integration tests
//!
//! Result sets shaped like the rows an insurance policy database returns.

use chrono::NaiveDate;
use rowproof_core::{ResultRow, Value, VariableBag};
use rowproof_executor::result_row;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const POLICY_SQL: &str =
    "SELECT status, total_premium, effective_date FROM policy WHERE policy_number = :policy";

pub const CLAIMS_SQL: &str =
    "SELECT COUNT(*) AS claim_count FROM claim WHERE policy_number = :policy AND status = :status";

/// One active policy row
pub fn active_policy() -> ResultRow {
    result_row([
        ("status", Value::from("ACTIVE")),
        ("total_premium", Value::Decimal(Decimal::from_str("1388.19").unwrap())),
        (
            "effective_date",
            Value::Date(NaiveDate::from_ymd_opt(2025, 11, 15).unwrap()),
        ),
    ])
}

/// Aggregate result with a single count column
pub fn claim_count(count: i64) -> ResultRow {
    result_row([("claim_count", Value::Int(count))])
}

/// Variables for policy `POL-0001`
pub fn policy_variables() -> VariableBag {
    let mut variables = VariableBag::new();
    variables.insert("policy".to_string(), Value::from("POL-0001"));
    variables.insert("status".to_string(), Value::from("OPEN"));
    variables
}
