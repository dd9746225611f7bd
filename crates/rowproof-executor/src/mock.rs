//! Mock SQL executor for testing
//!
//! This executor returns predefined result sets without connecting to any
//! database. It's useful for:
//! - Unit testing expectation checks
//! - End-to-end suite tests in CI without a database
//! - Simulating driver failures and slow queries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowproof_executor::{MockExecutor, SqlExecutor, result_row};
//! use rowproof_core::Value;
//!
//! let executor = MockExecutor::new();
//! executor
//!     .add_rows(
//!         "SELECT status FROM policy WHERE policy_number = :policy",
//!         vec![result_row([("status", Value::from("ACTIVE"))])],
//!     )
//!     .await;
//! ```
//!
//! Statements are matched on their trimmed text. Bind parameters are checked
//! against the statement, so a missing variable fails the same way it would
//! against a real database.

use crate::adapter::{ExecuteError, SqlExecutor};
use crate::params::NamedQuery;
use rowproof_core::{ConverterRegistry, ResultRow, Value, VariableBag};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Response = Result<Vec<ResultRow>, ExecuteError>;

/// A statement the mock executed, with the parameters it received
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub sql: String,
    pub params: VariableBag,

    /// Date format of the converters passed to `execute_with`
    pub date_format: Option<String>,
}

/// Build a result row from `(column, value)` pairs, keeping their order
pub fn result_row<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> ResultRow {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

/// Mock SQL executor
///
/// Clones share their canned responses and call log.
#[derive(Clone)]
pub struct MockExecutor {
    /// Canned responses by statement text
    responses: Arc<RwLock<HashMap<String, Response>>>,

    /// Every executed statement, in order
    calls: Arc<RwLock<Vec<ExecutedQuery>>>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulate query latency (milliseconds)
    latency_ms: u64,

    executor_name: &'static str,
}

impl MockExecutor {
    /// Create a new mock executor with no canned responses
    pub fn new() -> Self {
        Self::from_responses(HashMap::new())
    }

    fn from_responses(responses: HashMap<String, Response>) -> Self {
        Self {
            responses: Arc::new(RwLock::new(responses)),
            calls: Arc::new(RwLock::new(Vec::new())),
            fail_connection: false,
            latency_ms: 0,
            executor_name: "Mock",
        }
    }

    /// Return `rows` whenever `sql` is executed
    pub async fn add_rows(&self, sql: &str, rows: Vec<ResultRow>) {
        self.responses
            .write()
            .await
            .insert(sql.trim().to_string(), Ok(rows));
    }

    /// Fail whenever `sql` is executed
    pub async fn add_error(&self, sql: &str, error: ExecuteError) {
        self.responses
            .write()
            .await
            .insert(sql.trim().to_string(), Err(error));
    }

    /// Configure to fail all connection tests
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Delay every call, for exercising timeouts
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom executor name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.executor_name = name;
        self
    }

    /// Statements executed so far
    pub async fn executed(&self) -> Vec<ExecutedQuery> {
        self.calls.read().await.clone()
    }

    pub async fn execution_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Forget the call log
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn respond(&self, sql: &str, params: &VariableBag, date_format: Option<String>) -> Response {
        self.calls.write().await.push(ExecutedQuery {
            sql: sql.to_string(),
            params: params.clone(),
            date_format,
        });

        self.simulate_latency().await;

        NamedQuery::parse(sql).bind(params)?;

        let responses = self.responses.read().await;
        match responses.get(sql.trim()) {
            Some(response) => response.clone(),
            None => Err(ExecuteError::QueryError(format!(
                "no result registered for statement: {}",
                sql.trim()
            ))),
        }
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SqlExecutor for MockExecutor {
    fn name(&self) -> &'static str {
        self.executor_name
    }

    async fn execute(&self, sql: &str, params: &VariableBag) -> Result<Vec<ResultRow>, ExecuteError> {
        self.respond(sql, params, None).await
    }

    async fn execute_with(
        &self,
        sql: &str,
        params: &VariableBag,
        converters: &ConverterRegistry,
    ) -> Result<Vec<ResultRow>, ExecuteError> {
        self.respond(sql, params, Some(converters.date_format().to_string()))
            .await
    }

    async fn test_connection(&self) -> Result<(), ExecuteError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(ExecuteError::ConnectionError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Builder for creating a MockExecutor with several statements
///
/// ```rust,ignore
/// let executor = MockExecutorBuilder::new()
///     .with_rows("SELECT 1 AS one", vec![result_row([("one", Value::Int(1))])])
///     .with_error("SELECT broken", ExecuteError::QueryError("syntax error".into()))
///     .build();
/// ```
pub struct MockExecutorBuilder {
    responses: HashMap<String, Response>,
    fail_connection: bool,
    latency_ms: u64,
    executor_name: &'static str,
}

impl MockExecutorBuilder {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fail_connection: false,
            latency_ms: 0,
            executor_name: "Mock",
        }
    }

    pub fn with_rows(mut self, sql: &str, rows: Vec<ResultRow>) -> Self {
        self.responses.insert(sql.trim().to_string(), Ok(rows));
        self
    }

    pub fn with_error(mut self, sql: &str, error: ExecuteError) -> Self {
        self.responses.insert(sql.trim().to_string(), Err(error));
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.executor_name = name;
        self
    }

    pub fn build(self) -> MockExecutor {
        MockExecutor {
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            executor_name: self.executor_name,
            ..MockExecutor::from_responses(self.responses)
        }
    }
}

impl Default for MockExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
