//! Suite orchestration
//!
//! A suite is one suite config: optional key auto-increment, optional batch
//! scripts, then every data row through the validator, then a JSON report. [`SuiteRunner`] drives the
//! suites of a manifest and accumulates the aggregate report.

use crate::batch::BatchRunner;
use anyhow::{Context, Result};
use rowproof_core::{
    AggregateReport, Manifest, SuiteConfig, SuiteEntry, SuiteOutcome, SuiteReport, ValidatorSettings,
};
use rowproof_engine::Validator;
use rowproof_executor::SqlExecutor;
use rowproof_source::{modifier_for, open_source, KeyColumn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Error recorded on the aggregate when a suite's batches fail
pub const BATCH_FAILURE: &str = "Batch execution failed";

/// A finished suite and where its report was written
#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub name: String,
    pub report: SuiteReport,
    pub report_file: PathBuf,

    /// Batches failed, so no rows were validated
    pub batch_failed: bool,
}

impl SuiteRun {
    pub fn passed(&self) -> bool {
        !self.batch_failed && self.report.passed()
    }

    /// Aggregate line for this run
    pub fn outcome(&self) -> SuiteOutcome {
        let mut outcome = SuiteOutcome::from_report(
            self.name.clone(),
            &self.report,
            Some(self.report_file.display().to_string()),
        );
        if self.batch_failed {
            outcome.passed = false;
            outcome.error = Some(BATCH_FAILURE.to_string());
        }
        outcome
    }
}

/// File-system friendly form of a suite name
pub fn safe_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '/'], "_")
}

/// Suites that should run: enabled, named (when names are given) and
/// carrying at least one of `tags` (when tags are given)
pub fn select_suites<'a>(suites: &'a [SuiteEntry], names: &[String], tags: &[String]) -> Vec<&'a SuiteEntry> {
    suites
        .iter()
        .filter(|suite| suite.enabled)
        .filter(|suite| names.is_empty() || names.contains(&suite.name))
        .filter(|suite| tags.is_empty() || tags.iter().any(|tag| suite.tags.contains(tag)))
        .collect()
}

/// Run one suite config and save its report to `report_file`
///
/// Errors cover configuration and I/O problems (unreadable data file, report
/// not writable). Validation findings never surface as errors.
pub async fn run_suite(
    name: &str,
    config: &SuiteConfig,
    executor: Arc<dyn SqlExecutor>,
    settings: &ValidatorSettings,
    report_file: &Path,
) -> Result<SuiteRun> {
    let started = Instant::now();
    let data_file = config.data_file();
    let mut batch_results = Vec::new();

    if let Some(key) = config.primary_key.as_ref().filter(|key| key.auto_increment) {
        let column = KeyColumn::from_config(key)?;
        let modified = modifier_for(&data_file, &config.file)
            .and_then(|modifier| modifier.increment_keys(&column))
            .with_context(|| format!("Failed to increment keys in {}", data_file.display()))?;
        tracing::info!(suite = %name, "incremented {} key(s) in {}", modified, data_file.display());
    }

    if !config.batches.is_empty() {
        let log_dir = report_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::info!(suite = %name, "running {} batch(es), logs in {}", config.batches.len(), log_dir.display());

        let runner = BatchRunner::new(&config.config_dir, log_dir);
        let (ok, results) = runner.run_all(&config.batches, &data_file).await;

        if !ok {
            tracing::warn!(suite = %name, "batch execution failed, skipping row validation");
            let mut report = SuiteReport::new();
            report.set_batch_results(results);
            report.finish(started.elapsed());
            report
                .save_to_file(report_file)
                .with_context(|| format!("Failed to write report {}", report_file.display()))?;

            return Ok(SuiteRun {
                name: name.to_string(),
                report,
                report_file: report_file.to_path_buf(),
                batch_failed: true,
            });
        }
        batch_results = results;
    }

    let source = open_source(&data_file, &config.file)
        .with_context(|| format!("Failed to open data file {}", data_file.display()))?;
    let total_rows = source.count_rows()?;
    tracing::info!(
        suite = %name,
        "{} ({} rows), {} validation(s)",
        data_file.display(),
        total_rows,
        config.validations.len()
    );

    let settings = ValidatorSettings {
        timeout_seconds: config.execution.timeout_seconds,
        ..settings.clone()
    };
    let validator = Validator::new(executor, &settings);
    let mut report = SuiteReport::new();

    for row in source.rows()? {
        let (row_number, row) = row?;
        let result = validator
            .validate_row(row_number, &row, &config.variables, &config.validations)
            .await;
        let failed = result.has_failures;
        report.add_row_result(row_number, &row, result);

        if failed && config.execution.stop_on_first_error {
            tracing::info!(suite = %name, "stopped at row {} (stop_on_first_error)", row_number);
            break;
        }
    }

    report.set_batch_results(batch_results);
    report.finish(started.elapsed());
    report
        .save_to_file(report_file)
        .with_context(|| format!("Failed to write report {}", report_file.display()))?;

    tracing::info!(
        suite = %name,
        passed = report.summary.passed_rows,
        total = report.summary.total_rows,
        "suite finished"
    );

    Ok(SuiteRun {
        name: name.to_string(),
        report,
        report_file: report_file.to_path_buf(),
        batch_failed: false,
    })
}

/// Runs the suites of a manifest against one executor
pub struct SuiteRunner {
    manifest: Manifest,
    executor: Arc<dyn SqlExecutor>,
    aggregate: AggregateReport,
    runs: Vec<SuiteRun>,
}

impl SuiteRunner {
    pub fn new(manifest: Manifest, executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            manifest,
            executor,
            aggregate: AggregateReport::new(),
            runs: Vec::new(),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn aggregate(&self) -> &AggregateReport {
        &self.aggregate
    }

    /// Suites that ran to completion, in run order
    pub fn runs(&self) -> &[SuiteRun] {
        &self.runs
    }

    pub fn output_dir(&self) -> PathBuf {
        self.manifest.resolve(&self.manifest.reporting.output_dir)
    }

    pub fn aggregate_report_path(&self) -> PathBuf {
        self.output_dir().join(&self.manifest.reporting.aggregate_report)
    }

    /// Report location for a suite: the config's `reporting.output_file`
    /// (relative to the manifest) or `<output_dir>/<safe>/<safe>_results.json`
    pub fn report_path(&self, suite_name: &str, config: &SuiteConfig) -> PathBuf {
        match &config.reporting.output_file {
            Some(path) => self.manifest.resolve(path),
            None => {
                let safe = safe_name(suite_name);
                self.output_dir().join(&safe).join(format!("{}_results.json", safe))
            }
        }
    }

    /// Run the selected suites in manifest order and save the aggregate report
    ///
    /// Returns `true` when every selected suite passed (or nothing was selected).
    pub async fn run_all(&mut self, names: &[String], tags: &[String]) -> Result<bool> {
        let selected: Vec<SuiteEntry> = select_suites(&self.manifest.suites, names, tags)
            .into_iter()
            .cloned()
            .collect();

        if selected.is_empty() {
            tracing::info!("No test suites to run (all disabled or filtered out)");
            return Ok(true);
        }

        let stop_on_critical = self.manifest.execution.stop_on_critical_failure;
        let mut all_passed = true;

        for (index, entry) in selected.iter().enumerate() {
            tracing::info!(suite = %entry.name, "[{}/{}] starting suite", index + 1, selected.len());

            let outcome = self.run_entry(entry).await;
            let passed = outcome.passed;
            self.aggregate.add_suite_result(outcome);

            if !passed {
                all_passed = false;
                if entry.critical && stop_on_critical {
                    tracing::warn!(
                        suite = %entry.name,
                        "critical suite failed, stopping (stop_on_critical_failure=true)"
                    );
                    break;
                }
            }
        }

        let path = self.aggregate_report_path();
        self.aggregate
            .save_to_file(&path)
            .with_context(|| format!("Failed to write aggregate report {}", path.display()))?;
        tracing::info!("aggregate report written to {}", path.display());

        Ok(all_passed)
    }

    async fn run_entry(&mut self, entry: &SuiteEntry) -> SuiteOutcome {
        let started = Instant::now();

        match self.try_run_entry(entry).await {
            Ok(run) => {
                let outcome = run.outcome();
                self.runs.push(run);
                outcome
            }
            Err(e) => {
                tracing::warn!(suite = %entry.name, "suite error: {:#}", e);
                SuiteOutcome::errored(entry.name.clone(), started.elapsed(), format!("{:#}", e))
            }
        }
    }

    async fn try_run_entry(&self, entry: &SuiteEntry) -> Result<SuiteRun> {
        let config_path = self.manifest.resolve(&entry.config);
        let config = SuiteConfig::from_file(&config_path)
            .with_context(|| format!("Failed to load suite config {}", config_path.display()))?;

        let settings = ValidatorSettings {
            date_format: entry.date_format.clone(),
            datetime_format: entry.datetime_format.clone(),
            ..ValidatorSettings::default()
        };
        let report_file = self.report_path(&entry.name, &config);

        run_suite(&entry.name, &config, self.executor.clone(), &settings, &report_file).await
    }
}
