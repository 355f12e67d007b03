//! Console text.

use crate::domain::{AggregatedSeries, ForecastConfig, Metrics};

/// The two metric lines printed after every run.
pub fn format_metrics(metrics: &Metrics) -> String {
    format!("MAE: {}\nRMSE: {}", metrics.mae, metrics.rmse)
}

/// A short run summary for `--verbose` style inspection.
pub fn format_run_summary(config: &ForecastConfig, series: &AggregatedSeries, future_rows: usize) -> String {
    let mut out = String::new();

    out.push_str("=== fc - Daily Forecast ===\n");
    out.push_str(&format!("Source: {}\n", config.source.display()));
    out.push_str(&format!(
        "Columns: date={} | target={}\n",
        config.date_column, config.target_column
    ));
    out.push_str(&format!("Run date: {}\n", config.run_date));
    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "History: n={} | {} .. {}\n",
            series.len(),
            first,
            last
        )),
        _ => out.push_str("History: empty\n"),
    }
    out.push_str(&format!(
        "Forecast: horizon={}d | rows after run date={}\n",
        config.horizon_days, future_rows
    ));
    out
}
