//! Daily aggregation of raw rows into the model's `(ds, y)` schema.
//!
//! Rules:
//! - dates are parsed with `io::ingest::parse_date`; a bad date aborts with its line number
//! - target values must be numeric; a non-numeric value is a schema error, never a silent zero
//! - blank target cells are missing values and are skipped
//! - rows sharing a date are summed; the result has one row per date, ascending

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{AggregatedSeries, SeriesPoint};
use crate::error::AppError;
use crate::io::ingest::{parse_date, RawTable};

/// Group rows by date and sum the target column.
pub fn aggregate_daily(
    table: &RawTable,
    date_column: &str,
    target_column: &str,
) -> Result<AggregatedSeries, AppError> {
    let date_idx = require_column(table, date_column)?;
    let target_idx = require_column(table, target_column)?;

    let mut groups: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    let mut skipped_blank = 0usize;

    for (idx, record) in table.records().iter().enumerate() {
        let line = idx + 2;

        let raw_date = record.get(date_idx).unwrap_or("");
        let ds = parse_date(raw_date).map_err(|e| AppError::Parse(format!("line {line}: {e}")))?;

        let raw_value = record.get(target_idx).unwrap_or("").trim();
        if raw_value.is_empty() {
            skipped_blank += 1;
            // Keep the date so a day with only blank values still aggregates to 0.
            groups.entry(ds).or_default();
            continue;
        }
        let value = parse_value(raw_value).ok_or_else(|| {
            AppError::Schema(format!(
                "line {line}: column `{target_column}` has non-numeric value '{raw_value}'."
            ))
        })?;

        groups.entry(ds).or_default().push(value);
    }

    if skipped_blank > 0 {
        warn!(column = target_column, rows = skipped_blank, "skipped blank target values");
    }

    let points = groups
        .into_iter()
        .map(|(ds, values)| SeriesPoint {
            ds,
            y: order_independent_sum(values),
        })
        .collect();

    let series = AggregatedSeries::new(points)?;
    debug!(rows = table.len(), dates = series.len(), "aggregated daily series");
    Ok(series)
}

fn require_column(table: &RawTable, name: &str) -> Result<usize, AppError> {
    table.column_index(name).ok_or_else(|| {
        AppError::Schema(format!(
            "Missing required column: `{name}` (available: {}).",
            table.headers().join(", ")
        ))
    })
}

fn parse_value(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Sum values in a canonical order.
///
/// Floating-point addition is not associative, so summing in file order would
/// make the result depend on row order.
fn order_independent_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::read_table;

    fn table(data: &str) -> RawTable {
        read_table(data.as_bytes()).unwrap()
    }

    #[test]
    fn one_row_per_distinct_date_sorted() {
        let t = table(
            "date,country,calls\n2024-01-02,UK,5\n2024-01-01,UK,1\n2024-01-02,FR,7\n2024-01-01,FR,2\n2024-01-03,UK,4\n",
        );
        let series = aggregate_daily(&t, "date", "calls").unwrap();
        let got: Vec<(String, f64)> = series
            .points()
            .iter()
            .map(|p| (p.ds.to_string(), p.y))
            .collect();
        assert_eq!(
            got,
            vec![
                ("2024-01-01".to_string(), 3.0),
                ("2024-01-02".to_string(), 12.0),
                ("2024-01-03".to_string(), 4.0),
            ]
        );
    }

    #[test]
    fn datetimes_collapse_to_days() {
        let t = table("ts,v\n2024-01-01 08:00:00,1.5\n2024-01-01 17:30:00,2.5\n");
        let series = aggregate_daily(&t, "ts", "v").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].y, 4.0);
    }

    #[test]
    fn row_order_does_not_change_the_result() {
        let rows = [
            "2024-01-01,0.1",
            "2024-01-01,0.2",
            "2024-01-01,0.3",
            "2024-01-02,1e16",
            "2024-01-02,1.0",
            "2024-01-02,-1e16",
        ];
        let forward = format!("d,v\n{}\n", rows.join("\n"));
        let mut reversed_rows = rows.to_vec();
        reversed_rows.reverse();
        let reversed = format!("d,v\n{}\n", reversed_rows.join("\n"));

        let a = aggregate_daily(&table(&forward), "d", "v").unwrap();
        let b = aggregate_daily(&table(&reversed), "d", "v").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_column_is_schema_error() {
        let t = table("date,calls\n2024-01-01,1\n");
        let err = aggregate_daily(&t, "date", "volume").unwrap_err();
        assert!(matches!(err, AppError::Schema(ref m) if m.contains("volume")));
    }

    #[test]
    fn non_numeric_target_is_schema_error() {
        let t = table("date,calls\n2024-01-01,1\n2024-01-02,lots\n");
        let err = aggregate_daily(&t, "date", "calls").unwrap_err();
        assert!(matches!(err, AppError::Schema(ref m) if m.contains("line 3")));
    }

    #[test]
    fn unparseable_date_is_parse_error() {
        let t = table("date,calls\nyesterday,1\n");
        let err = aggregate_daily(&t, "date", "calls").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn blank_targets_are_skipped() {
        let t = table("date,calls\n2024-01-01,\n2024-01-01,4\n2024-01-02,\n");
        let series = aggregate_daily(&t, "date", "calls").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].y, 4.0);
        assert_eq!(series.points()[1].y, 0.0);
    }
}
