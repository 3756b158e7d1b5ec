//! CSV worksheet loader
//!
//! Reads the logger's worksheets exported one per CSV file into [`RawTable`]s.
//! Cells that parse as finite numbers become numbers, blank cells become empty,
//! everything else is kept as text for the cleaning stage to interpret.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::InputConfig;
use crate::types::{
    CellValue, InputTables, RawTable, CURRENT_HARMONIC_TABLE, TREND_TABLE, VOLTAGE_HARMONIC_TABLE,
};

// ============================================================================
// Layout
// ============================================================================

/// Where the header sits and how many records follow it before the data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsvLayout {
    /// Zero-based line holding the column names
    pub header_row: usize,
    /// Records between the header and the first data row (units, blank lines)
    pub skip_rows_after_header: usize,
}

impl CsvLayout {
    /// Trend sheet layout from the `[input]` config section
    pub fn trend(input: &InputConfig) -> Self {
        Self {
            header_row: input.trend_header_row,
            skip_rows_after_header: input.trend_skip_rows_after_header,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Empty file: {}", .0.display())]
    Empty(PathBuf),
    #[error("Header row {row} not found in {} ({records} records)", path.display())]
    HeaderRow {
        path: PathBuf,
        row: usize,
        records: usize,
    },
}

// ============================================================================
// Record reader
// ============================================================================

/// Streams CSV records out of a buffered reader.
///
/// A record ends at a line break outside quotes. Inside a quoted field the
/// line break is part of the value (spreadsheet exports write multi-line
/// channel labels this way), so one record may span several physical lines.
/// `""` inside quotes is a literal quote; CRLF and LF endings are both accepted.
/// An unterminated quote runs to end of input.
pub struct CsvRecords<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> CsvRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    fn read_record(&mut self) -> io::Result<Option<Vec<String>>> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut started = false;

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                if !started {
                    return Ok(None);
                }
                break;
            }
            started = true;

            let text = self.line.strip_suffix('\n').unwrap_or(self.line.as_str());
            let text = text.strip_suffix('\r').unwrap_or(text);
            let mut chars = text.chars().peekable();
            while let Some(ch) = chars.next() {
                match (ch, in_quotes) {
                    ('"', true) if chars.peek() == Some(&'"') => {
                        field.push('"');
                        chars.next();
                    }
                    ('"', _) => in_quotes = !in_quotes,
                    (',', false) => fields.push(std::mem::take(&mut field)),
                    _ => field.push(ch),
                }
            }

            if !in_quotes {
                break;
            }
            field.push('\n');
        }

        fields.push(field);
        Ok(Some(fields))
    }
}

impl<R: BufRead> Iterator for CsvRecords<R> {
    type Item = io::Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

fn is_blank(record: &[String]) -> bool {
    matches!(record, [only] if only.trim().is_empty())
}

/// Classify one field
pub fn parse_cell(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Number(v),
        _ => CellValue::Text(trimmed.to_string()),
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load one worksheet export
pub fn load_table(path: impl AsRef<Path>, layout: CsvLayout) -> Result<RawTable, TableLoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TableLoadError::Io(path.to_path_buf(), e))?;

    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut records_seen = 0usize;
    let data_start = layout.header_row + layout.skip_rows_after_header + 1;

    for (index, record) in CsvRecords::new(BufReader::new(file)).enumerate() {
        let record = record.map_err(|e| TableLoadError::Io(path.to_path_buf(), e))?;
        records_seen += 1;

        if index == layout.header_row {
            header = Some(
                record
                    .iter()
                    .enumerate()
                    .map(|(col, name)| {
                        // Spreadsheet exports often start with a byte-order mark
                        let name = if col == 0 { name.trim_start_matches('\u{feff}') } else { name };
                        name.trim().to_string()
                    })
                    .collect(),
            );
            continue;
        }
        if index < data_start || is_blank(&record) {
            continue;
        }
        rows.push(record.iter().map(String::as_str).map(parse_cell).collect());
    }

    if records_seen == 0 {
        return Err(TableLoadError::Empty(path.to_path_buf()));
    }
    let columns = header.ok_or_else(|| TableLoadError::HeaderRow {
        path: path.to_path_buf(),
        row: layout.header_row,
        records: records_seen,
    })?;

    debug!(
        file = %path.display(),
        columns = columns.len(),
        rows = rows.len(),
        "Worksheet loaded"
    );
    Ok(RawTable::new(columns, rows))
}

/// Load the three worksheets of one logger export
pub fn load_workbook(
    trend: impl AsRef<Path>,
    voltage_harmonics: impl AsRef<Path>,
    current_harmonics: impl AsRef<Path>,
    trend_layout: CsvLayout,
) -> Result<InputTables, TableLoadError> {
    let tables = InputTables::new()
        .with(TREND_TABLE, load_table(trend, trend_layout)?)
        .with(
            VOLTAGE_HARMONIC_TABLE,
            load_table(voltage_harmonics, CsvLayout::default())?,
        )
        .with(
            CURRENT_HARMONIC_TABLE,
            load_table(current_harmonics, CsvLayout::default())?,
        );

    info!(
        trend_rows = tables.get(TREND_TABLE).map_or(0, RawTable::len),
        "Workbook loaded"
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn records(input: &str) -> Vec<Vec<String>> {
        CsvRecords::new(input.as_bytes())
            .collect::<io::Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_records_respect_quotes() {
        assert_eq!(records("a,b,c"), vec![vec!["a", "b", "c"]]);
        assert_eq!(records("\"x,y\",2\n"), vec![vec!["x,y", "2"]]);
        assert_eq!(records("\"say \"\"hi\"\"\",1"), vec![vec!["say \"hi\"", "1"]]);
        assert_eq!(records("a,,\r\nb,c\r\n"), vec![vec!["a", "", ""], vec!["b", "c"]]);
    }

    #[test]
    fn test_quoted_line_break_stays_in_one_record() {
        let parsed = records("Date,\"U1 RMS\n(V)\",Time\n15/03/2567,230.0,10:00:00\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], vec!["Date", "U1 RMS\n(V)", "Time"]);
        assert_eq!(parsed[1], vec!["15/03/2567", "230.0", "10:00:00"]);
    }

    #[test]
    fn test_multiline_header_does_not_shift_data_rows() {
        let file = write_csv("\"V1h3\nmax\",V1h5\n1.5,0.5\n2.5,0.7\n");
        let table = load_table(file.path(), CsvLayout::default()).unwrap();
        assert_eq!(table.columns, vec!["V1h3\nmax", "V1h5"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0), &CellValue::Number(2.5));
    }

    #[test]
    fn test_parse_cell_kinds() {
        assert_eq!(parse_cell(" 229.5 "), CellValue::Number(229.5));
        assert_eq!(parse_cell(""), CellValue::Empty);
        assert_eq!(parse_cell("15/03/2567"), CellValue::Text("15/03/2567".into()));
        assert_eq!(parse_cell("NaN"), CellValue::Text("NaN".into()));
    }

    #[test]
    fn test_load_table_with_units_row() {
        let file = write_csv(
            "Logger export\nDate,Time,U1 RMS\n,,V\n15/03/2567,10:00:00,230.1\n\n15/03/2567,10:00:03,\n",
        );
        let layout = CsvLayout {
            header_row: 1,
            skip_rows_after_header: 1,
        };
        let table = load_table(file.path(), layout).unwrap();
        assert_eq!(table.columns, vec!["Date", "Time", "U1 RMS"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 2), &CellValue::Number(230.1));
        assert_eq!(table.cell(1, 2), &CellValue::Empty);
    }

    #[test]
    fn test_bom_is_stripped_from_header() {
        let file = write_csv("\u{feff}V1h2,V1h3\n0.1,0.2\n");
        let table = load_table(file.path(), CsvLayout::default()).unwrap();
        assert_eq!(table.column_index("V1h2"), Some(0));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let file = write_csv("");
        assert!(matches!(
            load_table(file.path(), CsvLayout::default()),
            Err(TableLoadError::Empty(_))
        ));
    }

    #[test]
    fn test_missing_header_row_is_an_error() {
        let file = write_csv("only one line\n");
        let layout = CsvLayout {
            header_row: 3,
            skip_rows_after_header: 0,
        };
        assert!(matches!(
            load_table(file.path(), layout),
            Err(TableLoadError::HeaderRow { row: 3, records: 1, .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_table("/nonexistent/trend.csv", CsvLayout::default());
        assert!(matches!(result, Err(TableLoadError::Io(..))));
    }

    #[test]
    fn test_load_workbook_names_tables() {
        let trend = write_csv("Date,Time,A1 THD\n15/03/2567,10:00:00,3.2\n");
        let vh = write_csv("V1h3\n1.0\n");
        let ah = write_csv("A1h3\n2.0\n");
        let tables =
            load_workbook(trend.path(), vh.path(), ah.path(), CsvLayout::default()).unwrap();
        assert!(tables.missing().is_empty());
        assert_eq!(tables.get(TREND_TABLE).unwrap().len(), 1);
    }
}
