//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::validation::RowResult;
use crate::value::DataRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Percentage of `part` in `total`, 0 when `total` is 0
pub fn pass_rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Round to two decimal places, the precision used for seconds in reports
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summary statistics for one suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total_rows: usize,
    pub passed_rows: usize,
    pub failed_rows: usize,

    /// Percentage of rows without failures
    pub pass_rate: f64,

    pub execution_time_seconds: f64,

    /// Timestamp (ISO 8601)
    pub timestamp: String,
}

impl Default for SuiteSummary {
    fn default() -> Self {
        Self {
            total_rows: 0,
            passed_rows: 0,
            failed_rows: 0,
            pass_rate: 0.0,
            execution_time_seconds: 0.0,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Validation outcome for one data row, as reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowReport {
    pub row_number: usize,
    pub row_data: DataRow,
    pub passed: bool,
    pub validations: Vec<crate::validation::ValidationResult>,
}

/// One failed validation, flattened for quick review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub row_number: usize,
    pub row_data: DataRow,
    pub validation_name: String,
    pub errors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_executed: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_row_count: Option<usize>,
}

/// Outcome of one pre-validation script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Success,
    Failed,
}

/// Record of one pre-validation script run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_name: String,

    #[serde(default)]
    pub script: Option<String>,

    pub status: BatchStatus,

    pub exit_code: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_seconds: f64,

    #[serde(default)]
    pub log_file: Option<String>,

    pub timestamp: String,
}

/// Batch section of a suite report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchExecution {
    pub total_batches: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
    pub batches: Vec<BatchResult>,
}

impl BatchExecution {
    pub fn from_results(batches: Vec<BatchResult>) -> Self {
        let successful_batches = batches
            .iter()
            .filter(|b| b.status == BatchStatus::Success)
            .count();
        Self {
            total_batches: batches.len(),
            successful_batches,
            failed_batches: batches.len() - successful_batches,
            batches,
        }
    }
}

/// Per-suite report (`<suite>_results.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Schema version
    pub version: ReportVersion,

    pub summary: SuiteSummary,

    /// Failed validations only
    pub failures: Vec<FailureEntry>,

    /// Every processed row
    pub all_results: Vec<RowReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_execution: Option<BatchExecution>,
}

impl SuiteReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            summary: SuiteSummary::default(),
            failures: Vec::new(),
            all_results: Vec::new(),
            batch_execution: None,
        }
    }

    /// Record the validation outcome of one row
    pub fn add_row_result(&mut self, row_number: usize, row_data: &DataRow, result: RowResult) {
        self.summary.total_rows += 1;
        if result.has_failures {
            self.summary.failed_rows += 1;
        } else {
            self.summary.passed_rows += 1;
        }

        for failed in result.failures() {
            self.failures.push(FailureEntry {
                row_number,
                row_data: row_data.clone(),
                validation_name: failed.name.clone(),
                errors: failed.errors.clone(),
                sql_executed: failed.sql_executed.clone(),
                actual_row_count: failed.actual_row_count,
            });
        }

        self.all_results.push(RowReport {
            row_number,
            row_data: row_data.clone(),
            passed: !result.has_failures,
            validations: result.validations,
        });
    }

    /// Attach pre-validation script results
    pub fn set_batch_results(&mut self, batches: Vec<BatchResult>) {
        if !batches.is_empty() {
            self.batch_execution = Some(BatchExecution::from_results(batches));
        }
    }

    /// Stamp timing and derived statistics
    pub fn finish(&mut self, elapsed: Duration) {
        self.summary.pass_rate = pass_rate(self.summary.passed_rows, self.summary.total_rows);
        self.summary.execution_time_seconds = round2(elapsed.as_secs_f64());
        self.summary.timestamp = Utc::now().to_rfc3339();
    }

    /// A suite passes iff no processed row had failures
    pub fn passed(&self) -> bool {
        self.summary.failed_rows == 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        write_json(path, &self.to_json())
    }
}

impl Default for SuiteReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Result line for one suite in the aggregate report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub name: String,
    pub passed: bool,
    pub total_rows: usize,
    pub passed_rows: usize,
    pub failed_rows: usize,
    pub pass_rate: f64,
    pub execution_time_seconds: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,

    /// Error text when the suite could not run to completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuiteOutcome {
    /// Outcome derived from a finished suite report
    pub fn from_report(name: impl Into<String>, report: &SuiteReport, report_file: Option<String>) -> Self {
        Self {
            name: name.into(),
            passed: report.passed(),
            total_rows: report.summary.total_rows,
            passed_rows: report.summary.passed_rows,
            failed_rows: report.summary.failed_rows,
            pass_rate: report.summary.pass_rate,
            execution_time_seconds: report.summary.execution_time_seconds,
            report_file,
            error: None,
        }
    }

    /// Outcome for a suite that errored before producing rows
    pub fn errored(name: impl Into<String>, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            total_rows: 0,
            passed_rows: 0,
            failed_rows: 0,
            pass_rate: 0.0,
            execution_time_seconds: round2(elapsed.as_secs_f64()),
            report_file: None,
            error: Some(error.into()),
        }
    }
}

/// Totals across all suites of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub total_suites: usize,
    pub passed_suites: usize,
    pub failed_suites: usize,
    pub suite_pass_rate: f64,
    pub total_rows_validated: usize,
    pub total_passed_rows: usize,
    pub total_failed_rows: usize,
    pub overall_pass_rate: f64,
    pub total_execution_time: f64,
}

/// Wall-clock bounds of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// Aggregate report across suites (`aggregate_summary.json`)
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    started_at: DateTime<Utc>,
    suite_results: Vec<SuiteOutcome>,
}

#[derive(Serialize)]
struct AggregateDocument<'a> {
    version: ReportVersion,
    summary: AggregateSummary,
    execution: ExecutionWindow,
    suite_results: &'a [SuiteOutcome],
}

impl AggregateReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            suite_results: Vec::new(),
        }
    }

    pub fn add_suite_result(&mut self, outcome: SuiteOutcome) {
        self.suite_results.push(outcome);
    }

    pub fn suite_results(&self) -> &[SuiteOutcome] {
        &self.suite_results
    }

    pub fn summary(&self) -> AggregateSummary {
        let total_suites = self.suite_results.len();
        let passed_suites = self.suite_results.iter().filter(|r| r.passed).count();
        let total_rows: usize = self.suite_results.iter().map(|r| r.total_rows).sum();
        let total_passed_rows: usize = self.suite_results.iter().map(|r| r.passed_rows).sum();
        let total_failed_rows: usize = self.suite_results.iter().map(|r| r.failed_rows).sum();
        let total_time: f64 = self.suite_results.iter().map(|r| r.execution_time_seconds).sum();

        AggregateSummary {
            total_suites,
            passed_suites,
            failed_suites: total_suites - passed_suites,
            suite_pass_rate: pass_rate(passed_suites, total_suites),
            total_rows_validated: total_rows,
            total_passed_rows,
            total_failed_rows,
            overall_pass_rate: pass_rate(total_passed_rows, total_rows),
            total_execution_time: round2(total_time),
        }
    }

    /// Names of suites that did not pass
    pub fn failed_suites(&self) -> Vec<&str> {
        self.suite_results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let end_time = Utc::now();
        let duration = (end_time - self.started_at).num_milliseconds() as f64 / 1000.0;
        let document = AggregateDocument {
            version: ReportVersion::CURRENT,
            summary: self.summary(),
            execution: ExecutionWindow {
                start_time: self.started_at,
                end_time,
                duration_seconds: round2(duration),
            },
            suite_results: &self.suite_results,
        };
        serde_json::to_string_pretty(&document)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        write_json(path, &self.to_json())
    }
}

impl Default for AggregateReport {
    fn default() -> Self {
        Self::new()
    }
}

fn write_json(path: &Path, json: &Result<String, serde_json::Error>) -> Result<(), std::io::Error> {
    let json = json
        .as_ref()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)
}
