//! SQL executors for row validation
//!
//! This crate runs the parameterized validation queries and returns typed rows.
//!
//! ## Features
//!
//! Enable database support via Cargo features:
//! - `postgres` - PostgreSQL support (optional TLS via native-tls)
//!
//! Without a database feature, [`MockExecutor`] is available for tests and
//! dry runs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rowproof_executor::{PostgresExecutor, SqlExecutor};
//!
//! let executor = PostgresExecutor::from_url("postgresql://localhost/insurance").await?;
//! let rows = executor.execute("SELECT status FROM policy WHERE policy_number = :policy", &variables).await?;
//! ```

pub mod adapter;
pub mod params;
pub mod mock;
pub mod postgres;

pub use adapter::{ExecuteError, SqlExecutor};
pub use params::NamedQuery;
pub use mock::{result_row, ExecutedQuery, MockExecutor, MockExecutorBuilder};
pub use postgres::{mask_connection_url, PostgresExecutor, TlsMode};
