//! Row sources for data-driven validation
//!
//! A row source yields `(row_number, DataRow)` pairs, numbered from 1 in file
//! order. Keys are header names, or zero-based column indices (`"0"`, `"1"`,
//! ...) for files without a header row, and stay the same for every row.
//! Each call to [`RowSource::rows`] starts from the beginning of the file.

pub mod csv;
pub mod excel;
pub mod modify;

pub use crate::csv::{encoding_for_label, CsvSource};
pub use crate::excel::ExcelSource;
pub use crate::modify::{increment_numeric_suffix, modifier_for, KeyColumn, KeyModifier};

use rowproof_core::{DataRow, FileConfig};
use std::path::{Path, PathBuf};

/// Iterator over the rows of one pass through a source
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<(usize, DataRow), SourceError>> + Send + 'a>;

/// Errors raised while reading a data file
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("Failed to read row {row} of {path}: {message}")]
    Read {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid delimiter '{0}': must be a single ASCII character")]
    InvalidDelimiter(char),

    #[error("Unknown text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Key column: {0}")]
    KeyColumn(String),

    #[error("Cannot increment empty value")]
    EmptyKey,

    #[error("No numeric suffix found in '{0}'")]
    NoNumericSuffix(String),
}

/// A finite, restartable sequence of data rows
pub trait RowSource: Send + Sync {
    /// Column keys, in file order
    fn headers(&self) -> Result<Vec<String>, SourceError>;

    /// Number of data rows (header excluded)
    fn count_rows(&self) -> Result<usize, SourceError>;

    /// Start a new pass over the data rows
    fn rows(&self) -> Result<RowIter<'_>, SourceError>;
}

/// Data file formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" => Ok(FileFormat::Excel),
            other => Err(SourceError::UnsupportedFormat(format!(
                ".{} (supported: .csv, .xlsx, .xls)",
                other
            ))),
        }
    }
}

/// Open the source described by a suite's `file` section
///
/// `path` is the data file already resolved against the config directory.
pub fn open_source(path: &Path, config: &FileConfig) -> Result<Box<dyn RowSource>, SourceError> {
    match FileFormat::detect(path)? {
        FileFormat::Csv => {
            let encoding = config.encoding.as_deref().map(encoding_for_label).transpose()?;
            Ok(Box::new(
                CsvSource::new(path, config.delimiter, config.has_header)?.with_encoding(encoding),
            ))
        }
        FileFormat::Excel => Ok(Box::new(ExcelSource::new(
            path,
            config.sheet.clone(),
            config.has_header,
        ))),
    }
}
