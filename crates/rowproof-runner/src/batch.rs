//! Pre-validation batch scripts
//!
//! Scripts are configured without an extension and resolved per platform
//! (`.bat` run by `cmd` on Windows, `.sh` run by `sh` elsewhere). They run one
//! after another with the script's directory as working directory; stdout and stderr go to a log
//! file in the suite's report directory. The first failure stops the run.

use chrono::Utc;
use rowproof_core::report::round2;
use rowproof_core::{BatchConfig, BatchResult, BatchStatus};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

#[cfg(windows)]
const SCRIPT_EXTENSION: &str = "bat";
#[cfg(not(windows))]
const SCRIPT_EXTENSION: &str = "sh";

#[cfg(windows)]
fn interpreter(script: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.arg("/C").arg(script);
    cmd
}

#[cfg(not(windows))]
fn interpreter(script: &Path) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg(script);
    cmd
}

const RULE: &str = "==================================================";

/// Why a batch did not succeed
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("'script' key missing in batch config: {0}")]
    MissingScript(String),

    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("File copy error: {0}")]
    Copy(String),

    #[error("Exception running script: {0}")]
    Spawn(String),

    #[error("Script exited with code {code}. See log: {}", .log.display())]
    ExitCode { code: i32, log: PathBuf },
}

/// Runs a suite's batch list
#[derive(Debug, Clone)]
pub struct BatchRunner {
    /// Directory relative script and copy paths are resolved against
    base_dir: PathBuf,

    /// Directory receiving batch logs
    log_dir: PathBuf,
}

impl BatchRunner {
    pub fn new(base_dir: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Platform script path for a configured script base path
    pub fn script_path(&self, script: &Path) -> PathBuf {
        rowproof_core::config::resolve_path(&self.base_dir, script).with_extension(SCRIPT_EXTENSION)
    }

    /// Run every batch in order, stopping at the first failure
    ///
    /// Returns whether all batches succeeded, together with one result per
    /// batch that was attempted.
    pub async fn run_all(&self, batches: &[BatchConfig], input_file: &Path) -> (bool, Vec<BatchResult>) {
        let mut results = Vec::with_capacity(batches.len());

        for (index, batch) in batches.iter().enumerate() {
            let position = index + 1;
            let name = batch
                .name
                .clone()
                .unwrap_or_else(|| format!("Batch {}", position));

            tracing::info!(batch = %name, "[{}/{}] running batch", position, batches.len());
            let result = self.run_one(position, &name, batch, input_file).await;
            let ok = result.status == BatchStatus::Success;

            if !ok {
                tracing::warn!(
                    batch = %name,
                    "batch failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }

            results.push(result);
            if !ok {
                return (false, results);
            }
        }

        (true, results)
    }

    async fn run_one(&self, position: usize, name: &str, batch: &BatchConfig, input_file: &Path) -> BatchResult {
        let Some(script) = &batch.script else {
            return failed(name, None, BatchError::MissingScript(name.to_string()), -1, Duration::ZERO, None);
        };

        let script = self.script_path(script);
        let script_text = Some(script.display().to_string());

        if !script.exists() {
            return failed(name, script_text, BatchError::ScriptNotFound(script), -1, Duration::ZERO, None);
        }

        if let Some(dest) = &batch.copy_input_file_to {
            let dest = rowproof_core::config::resolve_path(&self.base_dir, dest);
            if let Err(e) = copy_input_file(input_file, &dest) {
                return failed(name, script_text, e, -1, Duration::ZERO, None);
            }
            tracing::debug!(batch = %name, "copied input file to {}", dest.display());
        }

        let log_name = batch
            .log_file
            .clone()
            .unwrap_or_else(|| format!("batch_{}_{}.log", position, name.replace(' ', "_")));
        let log_path = self.log_dir.join(log_name);
        let log_text = Some(log_path.display().to_string());

        let started = Instant::now();
        let outcome = run_script(&script, &log_path).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(0) => BatchResult {
                batch_name: name.to_string(),
                script: script_text,
                status: BatchStatus::Success,
                exit_code: 0,
                error: None,
                duration_seconds: round2(elapsed.as_secs_f64()),
                log_file: log_text,
                timestamp: Utc::now().to_rfc3339(),
            },
            Ok(code) => failed(
                name,
                script_text,
                BatchError::ExitCode { code, log: log_path },
                code,
                elapsed,
                log_text,
            ),
            Err(e) => {
                if let Ok(mut log) = OpenOptions::new().append(true).create(true).open(&log_path) {
                    let _ = writeln!(log, "\n\nERROR: {}", e);
                }
                failed(name, script_text, e, -1, elapsed, log_text)
            }
        }
    }
}

fn failed(
    name: &str,
    script: Option<String>,
    error: BatchError,
    exit_code: i32,
    elapsed: Duration,
    log_file: Option<String>,
) -> BatchResult {
    BatchResult {
        batch_name: name.to_string(),
        script,
        status: BatchStatus::Failed,
        exit_code,
        error: Some(error.to_string()),
        duration_seconds: round2(elapsed.as_secs_f64()),
        log_file,
        timestamp: Utc::now().to_rfc3339(),
    }
}

fn copy_input_file(source: &Path, dest_dir: &Path) -> Result<(), BatchError> {
    if !source.exists() {
        return Err(BatchError::Copy(format!("Source file not found: {}", source.display())));
    }
    let file_name = source
        .file_name()
        .ok_or_else(|| BatchError::Copy(format!("Not a file: {}", source.display())))?;

    fs::create_dir_all(dest_dir).map_err(|e| BatchError::Copy(e.to_string()))?;
    fs::copy(source, dest_dir.join(file_name)).map_err(|e| BatchError::Copy(e.to_string()))?;
    Ok(())
}

/// Run one script with its output captured in `log_path`; returns the exit code
async fn run_script(script: &Path, log_path: &Path) -> Result<i32, BatchError> {
    let spawn_error = |e: std::io::Error| BatchError::Spawn(e.to_string());

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(spawn_error)?;
    }

    let script = script.canonicalize().map_err(spawn_error)?;
    let working_dir = script.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut log = File::create(log_path).map_err(spawn_error)?;
    writeln!(log, "=== Batch Execution Log ===").map_err(spawn_error)?;
    writeln!(log, "Script: {}", script.display()).map_err(spawn_error)?;
    writeln!(log, "Start Time: {}", Utc::now().to_rfc3339()).map_err(spawn_error)?;
    writeln!(log, "{}\n", RULE).map_err(spawn_error)?;

    let stdout = log.try_clone().map_err(spawn_error)?;
    let stderr = log.try_clone().map_err(spawn_error)?;

    let status = interpreter(&script)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .await
        .map_err(spawn_error)?;

    let code = status.code().unwrap_or(-1);

    writeln!(log, "\n{}", RULE).map_err(spawn_error)?;
    writeln!(log, "End Time: {}", Utc::now().to_rfc3339()).map_err(spawn_error)?;
    writeln!(log, "Exit Code: {}", code).map_err(spawn_error)?;

    Ok(code)
}
