//! Join actuals with model output and score the in-sample fit.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{AggregatedSeries, CombinedRow, ForecastTable, Metrics};
use crate::error::AppError;

/// Actual-vs-predicted rows plus their error metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub rows: Vec<CombinedRow>,
    pub metrics: Metrics,
}

/// Inner-join the series and the forecast on date.
///
/// Rows keep the series order. Historical dates the forecast does not cover
/// are dropped with a warning; future forecast rows simply have no match.
pub fn reconcile(series: &AggregatedSeries, forecast: &ForecastTable) -> Result<Reconciliation, AppError> {
    let predicted: HashMap<NaiveDate, f64> = forecast.iter().map(|r| (r.ds, r.yhat)).collect();

    let mut rows = Vec::with_capacity(series.len());
    let mut dropped = 0usize;
    for p in series.points() {
        match predicted.get(&p.ds) {
            Some(&yhat) => rows.push(CombinedRow {
                ds: p.ds,
                y: p.y,
                yhat,
                residual: p.y - yhat,
            }),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(dropped, "historical dates missing from the forecast were left out of the metrics");
    }

    let metrics = compute_metrics(&rows)?;
    debug!(n = metrics.n, mae = metrics.mae, mse = metrics.mse, "reconciled actuals");
    Ok(Reconciliation { rows, metrics })
}

/// MAE, MSE and RMSE over the combined rows.
pub fn compute_metrics(rows: &[CombinedRow]) -> Result<Metrics, AppError> {
    if rows.is_empty() {
        return Err(AppError::ModelFit(
            "No historical date matched the forecast; nothing to score.".to_string(),
        ));
    }
    let n = rows.len() as f64;
    let mae = rows.iter().map(|r| r.residual.abs()).sum::<f64>() / n;
    let mse = rows.iter().map(|r| r.residual * r.residual).sum::<f64>() / n;
    if !(mae.is_finite() && mse.is_finite()) {
        return Err(AppError::ModelFit("Non-finite residuals during reconciliation.".to_string()));
    }
    Ok(Metrics {
        mae,
        mse,
        rmse: mse.sqrt(),
        n: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastRow, SeriesPoint};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn row(ds: NaiveDate, yhat: f64) -> ForecastRow {
        ForecastRow {
            ds,
            trend: yhat,
            yearly: 0.0,
            weekly: 0.0,
            additive_terms: 0.0,
            yhat,
            yhat_lower: yhat - 1.0,
            yhat_upper: yhat + 1.0,
        }
    }

    fn series(values: &[(u32, f64)]) -> AggregatedSeries {
        AggregatedSeries::new(values.iter().map(|&(day, y)| SeriesPoint { ds: d(day), y }).collect()).unwrap()
    }

    #[test]
    fn residuals_are_actual_minus_predicted() {
        let s = series(&[(1, 10.0), (2, 12.0), (3, 9.0)]);
        let f = vec![row(d(1), 11.0), row(d(2), 12.0), row(d(3), 7.0), row(d(4), 8.0)];
        let rec = reconcile(&s, &f).unwrap();

        assert_eq!(rec.rows.len(), 3);
        let residuals: Vec<f64> = rec.rows.iter().map(|r| r.residual).collect();
        assert_eq!(residuals, vec![-1.0, 0.0, 2.0]);
        assert!((rec.metrics.mae - 1.0).abs() < 1e-12);
        assert!((rec.metrics.mse - 5.0 / 3.0).abs() < 1e-12);
        assert!((rec.metrics.rmse - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn perfect_fit_has_zero_mae() {
        let s = series(&[(1, 4.0), (2, 5.0)]);
        let f = vec![row(d(1), 4.0), row(d(2), 5.0)];
        let m = reconcile(&s, &f).unwrap().metrics;
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
    }

    #[test]
    fn join_is_by_date_not_position() {
        let s = series(&[(1, 4.0), (2, 5.0), (5, 6.0)]);
        // Forecast lacks 2024-03-02 and is listed out of order.
        let f = vec![row(d(5), 6.5), row(d(1), 3.0)];
        let rec = reconcile(&s, &f).unwrap();

        let dates: Vec<NaiveDate> = rec.rows.iter().map(|r| r.ds).collect();
        assert_eq!(dates, vec![d(1), d(5)]);
        assert_eq!(rec.rows[0].residual, 1.0);
        assert_eq!(rec.rows[1].residual, -0.5);
        assert_eq!(rec.metrics.n, 2);
    }

    #[test]
    fn empty_join_is_a_fit_error() {
        let s = series(&[(1, 4.0)]);
        let f = vec![row(d(9), 1.0)];
        assert!(matches!(reconcile(&s, &f), Err(AppError::ModelFit(_))));
    }
}
