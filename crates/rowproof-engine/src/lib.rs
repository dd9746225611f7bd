//! RowProof engine - typed comparison and validation logic
//!
//! This crate implements the per-row validation pipeline:
//! - Variable builder (`${row.COLUMN}:type` templates)
//! - Expected-value template resolver
//! - Type normalizer and equality judge
//! - Expectation checker (row_count / not_null / columns)
//! - Row orchestrator

pub mod normalize;
pub mod compare;
pub mod template;
pub mod variables;
pub mod expectation;
pub mod validator;

pub use normalize::{parse_bool_token, Normalizer};
pub use compare::{is_close, Comparator};
pub use template::{TemplateError, TemplateResolver};
pub use variables::{VariableBuilder, VariableError};
pub use expectation::ExpectationChecker;
pub use validator::{Validator, VARIABLE_SETUP};
