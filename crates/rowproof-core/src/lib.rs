//! RowProof Core
//!
//! Shared domain model: typed values, converters, validation specs,
//! configuration schema and versioned reports.
//! Report field names are part of the public API.

pub mod value;
pub mod convert;
pub mod validation;
pub mod config;
pub mod report;

pub use value::{DataRow, ResultRow, Value, ValueKind, VariableBag};
pub use convert::{ConversionError, ConverterRegistry, TypeTag, DEFAULT_DATE_FORMAT};
pub use validation::{ExpectationSpec, OnFailure, RowResult, ValidationResult, ValidationSpec};
pub use config::{
    BatchConfig, ConfigError, DatabaseConfig, ExecutionConfig, FileConfig, Manifest,
    PrimaryKeyConfig, SheetRef, SuiteConfig, SuiteEntry, ValidatorSettings,
};
pub use report::{
    AggregateReport, AggregateSummary, BatchResult, BatchStatus, ReportVersion, SuiteOutcome,
    SuiteReport, SuiteSummary,
};
