//! Excel workbooks (`.xlsx`, `.xls`)

use crate::{RowIter, RowSource, SourceError};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::Timelike;
use rowproof_core::{DataRow, SheetRef};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub(crate) type Workbook = Sheets<BufReader<File>>;

/// One worksheet of a workbook
///
/// Cells are rendered as text: integral numbers without a fraction, dates at
/// midnight as `YYYY-MM-DD`, other timestamps as `YYYY-MM-DD HH:MM:SS`.
/// Completely empty rows are skipped and do not consume a row number. Blank
/// header cells are named `Column{index}`.
#[derive(Debug, Clone)]
pub struct ExcelSource {
    path: PathBuf,
    sheet: Option<SheetRef>,
    has_header: bool,
}

impl ExcelSource {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<SheetRef>, has_header: bool) -> Self {
        Self {
            path: path.into(),
            sheet,
            has_header,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn range(&self) -> Result<Range<Data>, SourceError> {
        let mut workbook = open_workbook(&self.path)?;
        let name = sheet_name(&workbook, &self.path, self.sheet.as_ref())?;
        workbook
            .worksheet_range(&name)
            .map_err(|e| SourceError::Open {
                path: self.path.clone(),
                message: format!("sheet '{}': {}", name, e),
            })
    }

    fn data_rows(&self) -> Result<(Vec<String>, Vec<Vec<String>>), SourceError> {
        let range = self.range()?;
        let mut rows = range.rows();

        let headers = if self.has_header {
            match rows.next() {
                Some(cells) => header_names(cells),
                None => return Ok((Vec::new(), Vec::new())),
            }
        } else {
            (0..range.width()).map(|i| i.to_string()).collect()
        };

        let values = rows
            .map(|cells| cells.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|values| values.iter().any(|v| !v.is_empty()))
            .collect();

        Ok((headers, values))
    }
}

pub(crate) fn open_workbook(path: &Path) -> Result<Workbook, SourceError> {
    open_workbook_auto(path).map_err(|e| SourceError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Resolve a sheet reference to a sheet name (first sheet when `None`)
pub(crate) fn sheet_name(
    workbook: &Workbook,
    path: &Path,
    sheet: Option<&SheetRef>,
) -> Result<String, SourceError> {
    let names = workbook.sheet_names();
    let found = match sheet {
        None => names.first().cloned(),
        Some(SheetRef::Index(i)) => names.get(*i).cloned(),
        Some(SheetRef::Name(name)) => names.iter().find(|n| *n == name).cloned(),
    };

    found.ok_or_else(|| SourceError::Open {
        path: path.to_path_buf(),
        message: match sheet {
            Some(sheet) => format!("sheet {} not found (sheets: {})", sheet, names.join(", ")),
            None => "workbook has no sheets".to_string(),
        },
    })
}

pub(crate) fn header_names(cells: &[Data]) -> Vec<String> {
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_text(cell);
            if name.is_empty() {
                format!("Column{}", i)
            } else {
                name
            }
        })
        .collect()
}

/// Render one cell the way it would be typed into a CSV file
pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => match d.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 => {
                dt.format("%Y-%m-%d").to_string()
            }
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => d.as_f64().to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

impl RowSource for ExcelSource {
    fn headers(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.data_rows()?.0)
    }

    fn count_rows(&self) -> Result<usize, SourceError> {
        Ok(self.data_rows()?.1.len())
    }

    fn rows(&self) -> Result<RowIter<'_>, SourceError> {
        let (headers, values) = self.data_rows()?;

        let rows = values.into_iter().enumerate().map(move |(index, values)| {
            let mut row = DataRow::with_capacity(headers.len());
            for (i, key) in headers.iter().enumerate() {
                row.insert(key.clone(), values.get(i).cloned().unwrap_or_default());
            }
            tracing::trace!(row = index + 1, "read worksheet row");
            Ok((index + 1, row))
        });

        Ok(Box::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_as_csv_text() {
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("  POL-0001 ".into())), "POL-0001");
        assert_eq!(cell_text(&Data::Float(100.0)), "100");
        assert_eq!(cell_text(&Data::Float(1388.19)), "1388.19");
        assert_eq!(cell_text(&Data::Int(-7)), "-7");
        assert_eq!(cell_text(&Data::Bool(true)), "true");
    }

    #[test]
    fn blank_headers_are_named_by_position() {
        let cells = vec![Data::String("id".into()), Data::Empty, Data::String("amount".into())];
        assert_eq!(header_names(&cells), vec!["id", "Column1", "amount"]);
    }
}
