//! Suite and batch orchestration for rowproof
//!
//! Runs a single suite config or every selected suite of a manifest:
//! - pre-validation batch scripts, logged per suite
//! - row-by-row validation through [`rowproof_engine::Validator`]
//! - per-suite JSON reports and the aggregate summary

pub mod batch;
pub mod console;
pub mod suite;

pub use batch::{BatchError, BatchRunner};
pub use console::{print_aggregate, print_suite_run};
pub use suite::{run_suite, safe_name, select_suites, SuiteRun, SuiteRunner, BATCH_FAILURE};
