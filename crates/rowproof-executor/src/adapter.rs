//! SQL executor trait used by the validation engine

use rowproof_core::{ConverterRegistry, ResultRow, VariableBag};

/// Errors that can occur when executing a validation query
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecuteError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Missing bind parameter ':{0}'")]
    MissingParameter(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("query timed out after {0}s")]
    Timeout(u64),
}

/// Runs parameterized SQL and returns typed rows
///
/// Statements use `:name` bind parameters; `params` supplies the typed value
/// for each name. Every returned row maps column name to a driver value
/// decoded into [`rowproof_core::Value`], preserving column order.
#[async_trait::async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Get the executor name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Execute one statement with named parameters
    async fn execute(&self, sql: &str, params: &VariableBag) -> Result<Vec<ResultRow>, ExecuteError>;

    /// Execute with the suite's converters
    ///
    /// Drivers that type parameters on the server use `converters` when a
    /// variable has to be coerced, e.g. text bound to a `date` parameter.
    async fn execute_with(
        &self,
        sql: &str,
        params: &VariableBag,
        _converters: &ConverterRegistry,
    ) -> Result<Vec<ResultRow>, ExecuteError> {
        self.execute(sql, params).await
    }

    /// Test the connection to the database
    ///
    /// This is useful for validating credentials before running a suite.
    async fn test_connection(&self) -> Result<(), ExecuteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            ExecuteError::MissingParameter("policy".into()).to_string(),
            "Missing bind parameter ':policy'"
        );
        assert_eq!(ExecuteError::Timeout(5).to_string(), "query timed out after 5s");
    }
}
