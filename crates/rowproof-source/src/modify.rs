//! In-place key rewriting for data files
//!
//! Suites that insert their rows through batch scripts need fresh keys on
//! every run. [`KeyModifier::increment_keys`] bumps the trailing number of
//! every value in the key column (`POL-0001` becomes `POL-0002`) and writes
//! the file back.

use crate::csv::encoding_for_label;
use crate::excel::{cell_text, header_names, open_workbook, sheet_name};
use crate::{FileFormat, SourceError};
use calamine::{Data, Reader};
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use rowproof_core::{FileConfig, PrimaryKeyConfig, SheetRef};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Which column holds the key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyColumn {
    Name(String),
    Index(usize),
}

impl KeyColumn {
    /// Pick the key column from a `primary_key` section (name wins)
    pub fn from_config(config: &PrimaryKeyConfig) -> Result<Self, SourceError> {
        match (&config.column, config.column_index) {
            (Some(name), _) => Ok(KeyColumn::Name(name.clone())),
            (None, Some(index)) => Ok(KeyColumn::Index(index)),
            (None, None) => Err(SourceError::KeyColumn(
                "Either 'column' or 'column_index' must be specified".to_string(),
            )),
        }
    }

    fn position(&self, headers: Option<&[String]>) -> Result<usize, SourceError> {
        match (self, headers) {
            (KeyColumn::Index(index), Some(headers)) if *index >= headers.len() => {
                Err(SourceError::KeyColumn(format!(
                    "Column index {} out of range (max: {})",
                    index,
                    headers.len().saturating_sub(1)
                )))
            }
            (KeyColumn::Index(index), _) => Ok(*index),
            (KeyColumn::Name(name), Some(headers)) => {
                headers.iter().position(|h| h == name).ok_or_else(|| {
                    SourceError::KeyColumn(format!(
                        "Column '{}' not found in headers: {}",
                        name,
                        headers.join(", ")
                    ))
                })
            }
            (KeyColumn::Name(name), None) => Err(SourceError::KeyColumn(format!(
                "Column '{}' cannot be found by name without a header row; use 'column_index'",
                name
            ))),
        }
    }
}

/// Rewrites the key column of a data file in place
pub trait KeyModifier {
    /// Increment every non-empty key; returns the number of keys changed
    ///
    /// Keys without a numeric suffix are left as they are and logged.
    fn increment_keys(&self, column: &KeyColumn) -> Result<usize, SourceError>;
}

/// Increment the trailing decimal number of `value`
///
/// Zero padding is kept up to the original width and the number may grow a
/// digit: `TEST0099` becomes `TEST0100`, `KEY9999` becomes `KEY10000`.
pub fn increment_numeric_suffix(value: &str) -> Result<String, SourceError> {
    if value.is_empty() {
        return Err(SourceError::EmptyKey);
    }

    let prefix_len = value.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if prefix_len == value.len() {
        return Err(SourceError::NoNumericSuffix(value.to_string()));
    }

    let (prefix, digits) = value.split_at(prefix_len);
    let mut bumped: Vec<u8> = digits.bytes().collect();
    let mut carry = true;
    for digit in bumped.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            carry = false;
            break;
        }
    }
    if carry {
        bumped.insert(0, b'1');
    }

    let mut out = String::with_capacity(value.len() + 1);
    out.push_str(prefix);
    out.extend(bumped.into_iter().map(char::from));
    Ok(out)
}

/// Pick the modifier for a data file by extension
pub fn modifier_for(path: &Path, config: &FileConfig) -> Result<Box<dyn KeyModifier>, SourceError> {
    match FileFormat::detect(path)? {
        FileFormat::Csv => {
            let encoding = config.encoding.as_deref().map(encoding_for_label).transpose()?;
            Ok(Box::new(CsvModifier::new(path, config.delimiter, config.has_header)?
                .with_encoding(encoding)))
        }
        FileFormat::Excel => Ok(Box::new(ExcelModifier::new(
            path,
            config.sheet.clone(),
            config.has_header,
        )?)),
    }
}

/// Bump each key in `values`, counting the ones changed
fn increment_column<'a>(values: impl Iterator<Item = (usize, &'a mut String)>) -> usize {
    let mut modified = 0;
    for (row, value) in values {
        if value.trim().is_empty() {
            continue;
        }
        match increment_numeric_suffix(value.trim()) {
            Ok(next) => {
                *value = next;
                modified += 1;
            }
            Err(e) => tracing::warn!(row, "key left unchanged: {}", e),
        }
    }
    modified
}

/// Key modifier for delimited text files
///
/// Fields are written back untrimmed, in the file's own encoding.
#[derive(Debug, Clone)]
pub struct CsvModifier {
    path: PathBuf,
    delimiter: u8,
    has_header: bool,
    encoding: Option<&'static Encoding>,
}

impl CsvModifier {
    pub fn new(path: impl Into<PathBuf>, delimiter: char, has_header: bool) -> Result<Self, SourceError> {
        if !delimiter.is_ascii() {
            return Err(SourceError::InvalidDelimiter(delimiter));
        }

        Ok(Self {
            path: path.into(),
            delimiter: delimiter as u8,
            has_header,
            encoding: None,
        })
    }

    pub fn with_encoding(mut self, encoding: Option<&'static Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    fn read_records(&self) -> Result<Vec<Vec<String>>, SourceError> {
        let file = File::open(&self.path).map_err(|e| SourceError::Open {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let decoded = DecodeReaderBytesBuilder::new()
            .encoding(self.encoding)
            .build(file);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(decoded);

        reader
            .records()
            .enumerate()
            .map(|(i, record)| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| SourceError::Read {
                        path: self.path.clone(),
                        row: i + 1,
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    fn write_records(&self, records: &[Vec<String>]) -> Result<(), SourceError> {
        let write_error = |message: String| SourceError::Write {
            path: self.path.clone(),
            message,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());
        for record in records {
            writer.write_record(record).map_err(|e| write_error(e.to_string()))?;
        }
        let utf8 = writer
            .into_inner()
            .map_err(|e| write_error(e.to_string()))?;

        let bytes = match self.encoding {
            Some(encoding) if encoding != UTF_8 => {
                let text = String::from_utf8_lossy(&utf8);
                encoding.encode(&text).0.into_owned()
            }
            _ => utf8,
        };

        std::fs::write(&self.path, bytes).map_err(|e| write_error(e.to_string()))
    }
}

impl KeyModifier for CsvModifier {
    fn increment_keys(&self, column: &KeyColumn) -> Result<usize, SourceError> {
        let mut records = self.read_records()?;
        if records.is_empty() {
            return Err(SourceError::KeyColumn(format!(
                "{} is empty",
                self.path.display()
            )));
        }

        let data_start = usize::from(self.has_header);
        let headers: Option<Vec<String>> = self.has_header.then(|| {
            records[0]
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let h = h.trim();
                    let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                    h.to_string()
                })
                .collect()
        });
        let width = match &headers {
            Some(headers) => headers.len(),
            None => records[0].len(),
        };
        let target = column.position(headers.as_deref())?;
        if headers.is_none() && target >= width {
            return Err(SourceError::KeyColumn(format!(
                "Column index {} out of range (max: {})",
                target,
                width.saturating_sub(1)
            )));
        }

        let modified = increment_column(
            records
                .iter_mut()
                .enumerate()
                .skip(data_start)
                .filter_map(|(i, record)| record.get_mut(target).map(|v| (i + 1, v))),
        );

        self.write_records(&records)?;
        tracing::info!(path = %self.path.display(), modified, "incremented key column");
        Ok(modified)
    }
}

/// Key modifier for Excel workbooks
///
/// The workbook is rewritten from cell values: every sheet keeps its
/// contents, formulas are replaced by their cached results and cell styling
/// other than date formats is lost. Only `.xlsx` files can be written.
#[derive(Debug, Clone)]
pub struct ExcelModifier {
    path: PathBuf,
    sheet: Option<SheetRef>,
    has_header: bool,
}

impl ExcelModifier {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<SheetRef>, has_header: bool) -> Result<Self, SourceError> {
        let path = path.into();
        let is_xlsx = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if !is_xlsx {
            return Err(SourceError::UnsupportedFormat(format!(
                "{} cannot be rewritten; save it as .xlsx to increment keys",
                path.display()
            )));
        }

        Ok(Self {
            path,
            sheet,
            has_header,
        })
    }

    fn write_error(&self, e: XlsxError) -> SourceError {
        SourceError::Write {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

impl KeyModifier for ExcelModifier {
    fn increment_keys(&self, column: &KeyColumn) -> Result<usize, SourceError> {
        let mut source = open_workbook(&self.path)?;
        let target_sheet = sheet_name(&source, &self.path, self.sheet.as_ref())?;

        let mut sheets = Vec::new();
        for name in source.sheet_names() {
            let range = source.worksheet_range(&name).map_err(|e| SourceError::Open {
                path: self.path.clone(),
                message: format!("sheet '{}': {}", name, e),
            })?;
            sheets.push((name, range));
        }
        // Release the file before writing over it
        drop(source);

        let mut book = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let mut modified = 0;

        for (name, range) in &sheets {
            let (row0, col0) = range.start().unwrap_or((0, 0));
            let sheet = book.add_worksheet();
            sheet.set_name(name).map_err(|e| self.write_error(e))?;

            let mut key = None;
            if *name == target_sheet {
                if range.is_empty() {
                    return Err(SourceError::KeyColumn(format!(
                        "sheet '{}' of {} is empty",
                        name,
                        self.path.display()
                    )));
                }
                let mut rows = range.rows();
                let headers = if self.has_header {
                    rows.next().map(header_names)
                } else {
                    None
                };
                let target = column.position(headers.as_deref())?;
                if headers.is_none() && target >= range.width() {
                    return Err(SourceError::KeyColumn(format!(
                        "Column index {} out of range (max: {})",
                        target,
                        range.width().saturating_sub(1)
                    )));
                }
                key = Some(target);
            }

            for (r, cells) in range.rows().enumerate() {
                let row = row0 + r as u32;
                for (c, cell) in cells.iter().enumerate() {
                    let col = (col0 as usize + c) as u16;
                    let is_key = key == Some(c) && (r > 0 || !self.has_header);
                    if is_key {
                        let mut text = cell_text(cell);
                        modified += increment_column(std::iter::once((row as usize + 1, &mut text)));
                        if !text.is_empty() {
                            sheet.write_string(row, col, text).map_err(|e| self.write_error(e))?;
                        }
                        continue;
                    }
                    write_cell(sheet, row, col, cell, &date_format).map_err(|e| self.write_error(e))?;
                }
            }
        }

        book.save(&self.path).map_err(|e| self.write_error(e))?;
        tracing::info!(path = %self.path.display(), sheet = %target_sheet, modified, "incremented key column");
        Ok(modified)
    }
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Data, date_format: &Format) -> Result<(), XlsxError> {
    match cell {
        Data::Empty => {}
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            sheet.write_string(row, col, s.as_str())?;
        }
        Data::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Data::Float(f) => {
            sheet.write_number(row, col, *f)?;
        }
        Data::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Data::DateTime(d) => {
            sheet.write_number_with_format(row, col, d.as_f64(), date_format)?;
        }
        Data::Error(e) => {
            sheet.write_string(row, col, e.to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_incremented() {
        assert_eq!(increment_numeric_suffix("POL-0001").unwrap(), "POL-0002");
        assert_eq!(increment_numeric_suffix("ABC1234").unwrap(), "ABC1235");
        assert_eq!(increment_numeric_suffix("POL-2024-0001").unwrap(), "POL-2024-0002");
        assert_eq!(increment_numeric_suffix("12345678").unwrap(), "12345679");
    }

    #[test]
    fn padding_is_kept_and_can_overflow() {
        assert_eq!(increment_numeric_suffix("TEST0099").unwrap(), "TEST0100");
        assert_eq!(increment_numeric_suffix("0001").unwrap(), "0002");
        assert_eq!(increment_numeric_suffix("KEY9999").unwrap(), "KEY10000");
        assert_eq!(increment_numeric_suffix("A99").unwrap(), "A100");
        assert_eq!(
            increment_numeric_suffix("ID99999999999999999999").unwrap(),
            "ID100000000000000000000"
        );
    }

    #[test]
    fn keys_without_digits_are_rejected() {
        assert!(matches!(increment_numeric_suffix(""), Err(SourceError::EmptyKey)));
        for value in ["ABC", "KEY-", "test-abc"] {
            let err = increment_numeric_suffix(value).unwrap_err();
            assert_eq!(err.to_string(), format!("No numeric suffix found in '{}'", value));
        }
    }

    #[test]
    fn key_column_prefers_the_name() {
        let config = PrimaryKeyConfig {
            column: Some("PolicyNumber".into()),
            column_index: Some(3),
            auto_increment: true,
        };
        assert_eq!(
            KeyColumn::from_config(&config).unwrap(),
            KeyColumn::Name("PolicyNumber".into())
        );
        assert!(KeyColumn::from_config(&PrimaryKeyConfig::default()).is_err());
    }

    #[test]
    fn named_column_needs_headers() {
        let column = KeyColumn::Name("id".into());
        assert!(column.position(None).is_err());
        let headers = vec!["name".to_string(), "id".to_string()];
        assert_eq!(column.position(Some(&headers)).unwrap(), 1);
        assert!(KeyColumn::Index(2).position(Some(&headers)).is_err());
    }
}
