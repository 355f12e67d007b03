//! Export future forecast values to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! two columns, `date` (ISO `YYYY-MM-DD`) and `forecast_value`.

use std::io::Write;

use chrono::NaiveDate;

use crate::domain::{ForecastOutputRow, ForecastTable};
use crate::error::AppError;

/// Keep forecast rows dated strictly after `run_date`, projected to `(date, yhat)`.
pub fn format_forecast_output(forecast: &ForecastTable, run_date: NaiveDate) -> Vec<ForecastOutputRow> {
    forecast
        .iter()
        .filter(|r| r.ds > run_date)
        .map(|r| ForecastOutputRow {
            date: r.ds,
            forecast_value: r.yhat,
        })
        .collect()
}

/// Serialize output rows (with header) to `writer`.
///
/// The header is written even when `rows` is empty.
pub fn write_forecast_csv<W: Write>(writer: W, rows: &[ForecastOutputRow]) -> Result<(), AppError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(["date", "forecast_value"])?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()
        .map_err(|e| AppError::io("Failed to flush forecast CSV", e))?;
    Ok(())
}
