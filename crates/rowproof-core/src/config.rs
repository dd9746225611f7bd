//! Configuration schema: suite configs, manifests and validator settings
//!
//! Files are loaded by extension: `.yaml`/`.yml`, `.toml`, anything else as JSON.

use crate::convert::{ConverterRegistry, DEFAULT_DATE_FORMAT};
use crate::validation::ValidationSpec;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default relative tolerance for float comparisons
pub const DEFAULT_FLOAT_TOLERANCE: f64 = 1e-9;

/// Default per-query timeout
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Settings shared by every engine component of one validator
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorSettings {
    /// Format for `date` conversions
    pub date_format: String,

    /// Format for `datetime` conversions (defaults to `date_format`)
    pub datetime_format: Option<String>,

    /// Relative tolerance for float equality
    pub float_tolerance: f64,

    /// Upper bound for one query
    pub timeout_seconds: u64,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: None,
            float_tolerance: DEFAULT_FLOAT_TOLERANCE,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ValidatorSettings {
    /// Build the converter registry these settings describe
    pub fn converters(&self) -> ConverterRegistry {
        ConverterRegistry::new(self.date_format.clone(), self.datetime_format.clone())
    }
}

/// Data file section of a suite config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Path to the data file, relative to the config file
    pub path: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default = "default_true")]
    pub has_header: bool,

    /// Text encoding label for delimited files (`utf-8` when absent)
    #[serde(default)]
    pub encoding: Option<String>,

    /// Worksheet for Excel workbooks (first sheet when absent)
    #[serde(default)]
    pub sheet: Option<SheetRef>,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: default_delimiter(),
            has_header: true,
            encoding: None,
            sheet: None,
        }
    }
}

/// A worksheet picked by zero-based position or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetRef::Index(i) => write!(f, "#{}", i),
            SheetRef::Name(name) => f.write_str(name),
        }
    }
}

/// Key column rewritten before a suite runs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimaryKeyConfig {
    /// Header name of the key column
    #[serde(default)]
    pub column: Option<String>,

    /// Zero-based key column position (alternative to `column`)
    #[serde(default)]
    pub column_index: Option<usize>,

    /// Bump the trailing number of every key before the batches run
    #[serde(default)]
    pub auto_increment: bool,
}

/// Database connection section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub connection_url: Option<String>,
}

/// Runtime behavior of a suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Stop reading rows after the first row with failures
    #[serde(default)]
    pub stop_on_first_error: bool,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            stop_on_first_error: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// Suite-level reporting overrides
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

/// A pre-validation script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Script path without extension (`.sh` or `.bat` is chosen per platform)
    #[serde(default)]
    pub script: Option<PathBuf>,

    /// Directory the input data file is copied into before the script runs
    #[serde(default)]
    pub copy_input_file_to: Option<PathBuf>,

    #[serde(default)]
    pub log_file: Option<String>,
}

/// One data-driven validation suite (suite config file)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub file: FileConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Variable name to template, in declaration order
    #[serde(default)]
    pub variables: IndexMap<String, String>,

    pub validations: Vec<ValidationSpec>,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default)]
    pub batches: Vec<BatchConfig>,

    #[serde(default)]
    pub primary_key: Option<PrimaryKeyConfig>,

    /// Directory holding the config file (for resolving relative paths)
    #[serde(skip)]
    pub config_dir: PathBuf,
}

impl SuiteConfig {
    /// Load, validate and anchor a suite config
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config: SuiteConfig = load_file(path)?;
        config.config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;

        let data_file = config.data_file();
        if !data_file.exists() {
            return Err(ConfigError::Invalid(format!(
                "Data file not found: {}",
                data_file.display()
            )));
        }

        Ok(config)
    }

    /// Data file path resolved against the config directory
    pub fn data_file(&self) -> PathBuf {
        resolve_path(&self.config_dir, &self.file.path)
    }

    /// Structural checks serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.primary_key {
            if key.auto_increment && key.column.is_none() && key.column_index.is_none() {
                return Err(ConfigError::Invalid(
                    "primary_key needs either 'column' or 'column_index'".to_string(),
                ));
            }
        }

        if self.validations.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one validation is required".to_string(),
            ));
        }

        for (index, validation) in self.validations.iter().enumerate() {
            if validation.sql.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Validation {} ({}) has an empty 'sql'",
                    index, validation.name
                )));
            }
            if !validation.expect.has_assertions() {
                return Err(ConfigError::Invalid(format!(
                    "Validation {} ({}) has no assertions in 'expect'",
                    index, validation.name
                )));
            }
        }

        Ok(())
    }
}

/// Run-wide behavior of a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestExecution {
    /// Stop the whole run when a critical suite fails
    #[serde(default = "default_true")]
    pub stop_on_critical_failure: bool,
}

impl Default for ManifestExecution {
    fn default() -> Self {
        Self {
            stop_on_critical_failure: true,
        }
    }
}

/// Where reports are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestReporting {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_aggregate_report")]
    pub aggregate_report: String,
}

impl Default for ManifestReporting {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            aggregate_report: default_aggregate_report(),
        }
    }
}

/// A suite listed in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteEntry {
    pub name: String,

    /// Suite config path, relative to the manifest
    pub config: PathBuf,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// A failed critical suite may stop the run
    #[serde(default)]
    pub critical: bool,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default)]
    pub datetime_format: Option<String>,
}

/// Test manifest: an ordered list of suites plus run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub execution: ManifestExecution,

    #[serde(default)]
    pub reporting: ManifestReporting,

    pub suites: Vec<SuiteEntry>,

    /// Directory holding the manifest
    #[serde(skip)]
    pub manifest_dir: PathBuf,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut manifest: Manifest = load_file(path)?;
        manifest.manifest_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suites.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one suite must be defined".to_string(),
            ));
        }

        for (index, suite) in self.suites.iter().enumerate() {
            if suite.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("Suite {} has an empty 'name'", index)));
            }
        }

        Ok(())
    }

    /// Resolve a path relative to the manifest directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_path(&self.manifest_dir, path)
    }
}

/// Join `path` onto `base` unless it is already absolute
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Read and deserialize a config file, choosing the format by extension
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
    // Editors on Windows like to leave a BOM behind
    let contents = contents.trim_start_matches('\u{feff}');

    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e))),
        Some("toml") => toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e))),
        _ => serde_json::from_str(contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e))),
    }
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_aggregate_report() -> String {
    "aggregate_summary.json".to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
