//! Terminal summaries

use crate::suite::SuiteRun;
use colored::Colorize;
use rowproof_core::{AggregateReport, SuiteOutcome};
use std::path::Path;

const FAILURE_PREVIEW: usize = 5;

fn status(passed: bool) -> colored::ColoredString {
    if passed {
        "✓ PASSED".green().bold()
    } else {
        "✗ FAILED".red().bold()
    }
}

/// Print the summary of one suite run
pub fn print_suite_run(run: &SuiteRun) {
    let summary = &run.report.summary;

    println!("\n{} {}", "Suite:".bold(), run.name.cyan());

    if run.batch_failed {
        println!("  {} batch execution failed, rows were not validated", "✗".red());
        if let Some(batches) = &run.report.batch_execution {
            for batch in batches.batches.iter().filter(|b| b.error.is_some()) {
                println!(
                    "    {}: {}",
                    batch.batch_name.yellow(),
                    batch.error.as_deref().unwrap_or_default().dimmed()
                );
            }
        }
    } else {
        println!("  Total rows processed: {}", summary.total_rows);
        println!("  Passed:               {} ({:.1}%)", summary.passed_rows, summary.pass_rate);
        println!("  Failed:               {}", summary.failed_rows);

        for failure in run.report.failures.iter().take(FAILURE_PREVIEW) {
            println!(
                "    Row {} {}",
                failure.row_number,
                failure.validation_name.yellow()
            );
            for error in &failure.errors {
                println!("      {}", error.dimmed());
            }
        }
        if run.report.failures.len() > FAILURE_PREVIEW {
            println!(
                "    ... and {} more (see report)",
                run.report.failures.len() - FAILURE_PREVIEW
            );
        }
    }

    println!("  Time:   {:.2}s", summary.execution_time_seconds);
    println!("  Report: {}", run.report_file.display());
    println!("  {}", status(run.passed()));
}

fn print_outcome(outcome: &SuiteOutcome) {
    let mark = if outcome.passed { "✓".green() } else { "✗".red() };
    println!(
        "  {} {:<30} {}/{} rows ({:.1}%)",
        mark, outcome.name, outcome.passed_rows, outcome.total_rows, outcome.pass_rate
    );
    if let Some(error) = &outcome.error {
        println!("      {}", error.red());
    }
}

/// Print the aggregate summary of a manifest run
pub fn print_aggregate(aggregate: &AggregateReport, report_path: &Path) {
    let summary = aggregate.summary();

    println!("\n{}", "══════════════════════════════════════════════════════════════════════".cyan());
    println!("{}", "AGGREGATE SUMMARY".cyan().bold());
    println!("{}", "══════════════════════════════════════════════════════════════════════".cyan());

    for outcome in aggregate.suite_results() {
        print_outcome(outcome);
    }

    println!("\n  Total suites run:     {}", summary.total_suites);
    println!("  Passed:               {}", summary.passed_suites);
    println!("  Failed:               {}", summary.failed_suites);
    println!("  Total rows validated: {}", summary.total_rows_validated);
    println!("  Overall pass rate:    {:.1}%", summary.overall_pass_rate);
    println!("  Total execution time: {:.2}s", summary.total_execution_time);
    println!("\n  Aggregate report: {}", report_path.display());
    println!("  {}\n", status(summary.failed_suites == 0));
}
