//! Delimited text files

use crate::{RowIter, RowSource, SourceError};
use encoding_rs::Encoding;
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use rowproof_core::DataRow;
use std::fs::File;
use std::path::{Path, PathBuf};

const BOM: char = '\u{feff}';

type DecodedReader = csv::Reader<DecodeReaderBytes<File, Vec<u8>>>;

/// Look up a text encoding by label (`utf-8`, `latin1`, `windows-1252`, ...)
///
/// Accepts the WHATWG labels plus the `utf-8-sig`, `latin-1` and `utf_8`
/// spellings common in existing configs.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, SourceError> {
    let trimmed = label.trim();
    if let Some(encoding) = Encoding::for_label(trimmed.as_bytes()) {
        return Ok(encoding);
    }

    let squashed: String = trimmed
        .trim_end_matches("-sig")
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect();
    Encoding::for_label(squashed.as_bytes())
        .ok_or_else(|| SourceError::UnknownEncoding(label.to_string()))
}

/// A CSV (or other single-byte delimited) file
///
/// Header names and field values are trimmed of surrounding whitespace.
/// Rows shorter than the header are padded with empty strings; fields past
/// the last header are dropped. Headerless files are keyed by position over
/// the widest row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
    has_header: bool,
    encoding: Option<&'static Encoding>,
}

impl CsvSource {
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

    /// Transcode the file from `encoding` to UTF-8 while reading
    ///
    /// Without an explicit encoding the file must be UTF-8; a byte order
    /// mark still selects UTF-16 when present.
    pub fn with_encoding(mut self, encoding: Option<&'static Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }

    fn reader(&self) -> Result<DecodedReader, SourceError> {
        let file = File::open(&self.path).map_err(|e| SourceError::Open {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let decoded = DecodeReaderBytesBuilder::new()
            .encoding(self.encoding)
            .build(file);

        Ok(csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(decoded))
    }

    fn read_error(&self, row: usize, e: csv::Error) -> SourceError {
        SourceError::Read {
            path: self.path.clone(),
            row,
            message: e.to_string(),
        }
    }
}

fn strip_bom(field: &str) -> &str {
    field.strip_prefix(BOM).map(str::trim_start).unwrap_or(field)
}

impl RowSource for CsvSource {
    fn headers(&self) -> Result<Vec<String>, SourceError> {
        let mut reader = self.reader()?;

        if self.has_header {
            let record = reader.headers().map_err(|e| self.read_error(0, e))?;
            return Ok(record
                .iter()
                .enumerate()
                .map(|(i, h)| if i == 0 { strip_bom(h) } else { h }.to_string())
                .collect());
        }

        // Ragged files are keyed by their widest row
        let mut record = csv::StringRecord::new();
        let mut width = 0;
        let mut row = 0;
        while reader
            .read_record(&mut record)
            .map_err(|e| self.read_error(row + 1, e))?
        {
            row += 1;
            width = width.max(record.len());
        }
        Ok((0..width).map(|i| i.to_string()).collect())
    }

    fn count_rows(&self) -> Result<usize, SourceError> {
        let mut reader = self.reader()?;
        let mut record = csv::StringRecord::new();
        let mut count = 0;
        while reader
            .read_record(&mut record)
            .map_err(|e| self.read_error(count + 1, e))?
        {
            count += 1;
        }
        Ok(count)
    }

    fn rows(&self) -> Result<RowIter<'_>, SourceError> {
        let headers = self.headers()?;
        let reader = self.reader()?;

        let rows = reader.into_records().enumerate().map(move |(index, record)| {
            let row_number = index + 1;
            let record = record.map_err(|e| self.read_error(row_number, e))?;

            let mut row = DataRow::with_capacity(headers.len());
            for (i, key) in headers.iter().enumerate() {
                let field = record.get(i).unwrap_or_default();
                let field = if i == 0 && !self.has_header && row_number == 1 {
                    strip_bom(field)
                } else {
                    field
                };
                row.insert(key.clone(), field.to_string());
            }

            tracing::trace!(row = row_number, "read data row");
            Ok((row_number, row))
        });

        Ok(Box::new(rows))
    }
}
