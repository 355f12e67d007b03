//! CSV loading.
//!
//! The loader keeps every source column as text and performs no schema
//! validation: missing columns and bad values surface later, in the aggregator,
//! where the column names requested by the user are known.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::error::AppError;

/// A delimited file held in memory.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    header_map: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl RawTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of a column by exact (trimmed) header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header_map.get(name.trim()).copied()
    }
}

/// Load a CSV file with a header row.
pub fn load_table(path: &Path) -> Result<RawTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}'", path.display()), e))?;
    let table = read_table(file)?;
    debug!(path = %path.display(), rows = table.len(), columns = table.headers.len(), "loaded CSV");
    Ok(table)
}

/// Parse CSV content from any reader.
pub fn read_table<R: Read>(reader: R) -> Result<RawTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header_name)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::Parse(
            "CSV has no header row (a header row is required).".to_string(),
        ));
    }

    let header_map = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), idx))
        .collect();

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and CSV lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| {
            // csv already reports positions for record-level errors.
            let positioned = e.position().is_some();
            match AppError::from(e) {
                AppError::Parse(msg) if !positioned => AppError::Parse(format!("line {line}: {msg}")),
                other => other,
            }
        })?;
        records.push(record);
    }

    Ok(RawTable {
        headers,
        header_map,
        records,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Parse a calendar date, keeping only the date part of date-times.
///
/// Slash and dash dates with a trailing year are read month-first.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];
    const DATETIME_FMTS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    let s = s.trim();
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, MM/DD/YYYY, MM-DD-YYYY, YYYY-MM-DD HH:MM[:SS]."
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn read_table_keeps_all_columns() {
        let data = "\u{feff}date, country ,total_inbound_calls\n2024-01-01,UK,10\n2024-01-01,FR,5\n";
        let table = read_table(data.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["date", "country", "total_inbound_calls"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_index("country"), Some(1));
        assert_eq!(&table.records()[1][1], "FR");
    }

    #[test]
    fn ragged_rows_are_parse_errors() {
        let data = "date,y\n2024-01-01,1\n2024-01-02\n";
        let err = read_table(data.as_bytes()).unwrap_err();
        let AppError::Parse(msg) = &err else {
            panic!("expected a parse error, got {err}");
        };
        assert!(msg.contains("line: 3"), "{msg}");
        assert_eq!(msg.matches("line").count(), 1, "{msg}");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = read_table(&b"date,y\n2024-01-01,\xff\n"[..]).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)), "{err}");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = read_table("".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_table(&dir.path().join("nope.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn load_table_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,y").unwrap();
        writeln!(file, "2024-01-01,3").unwrap();
        let table = load_table(file.path()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn parse_date_accepts_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        for s in ["2024-03-09", "2024/03/09", "03/09/2024", "03-09-2024", "2024-03-09 17:45:00", "2024-03-09T08:00:00"] {
            assert_eq!(parse_date(s).unwrap(), expected, "{s}");
        }
        assert!(parse_date("09/13/2024").is_ok());
        assert!(parse_date("13/09/2024").is_err());
        assert!(parse_date("March 9th").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn slash_dates_are_month_first() {
        assert_eq!(parse_date("12/31/2024").unwrap(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(parse_date("03/09/2024").unwrap(), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }
}
