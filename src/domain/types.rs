//! Shared domain types.
//!
//! These types flow between the pipeline stages:
//!
//! - `AggregatedSeries` (aggregator -> model, reconciler, reporter)
//! - `ForecastTable` (model -> reconciler, output formatter, reporter)
//! - `CombinedRow` / `Metrics` (reconciler -> console, reporter)
//! - `ForecastOutputRow` (output formatter -> CSV, reporter)

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

use crate::error::AppError;

/// Default forecast horizon in calendar days.
pub const DEFAULT_HORIZON_DAYS: u32 = 365;

/// Longest accepted forecast horizon (about a century).
pub const MAX_HORIZON_DAYS: u32 = 36_500;

/// One aggregated observation, named after the model's `(ds, y)` schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub ds: NaiveDate,
    pub y: f64,
}

/// Per-date summed target values, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedSeries {
    points: Vec<SeriesPoint>,
}

impl AggregatedSeries {
    /// Build a series, rejecting duplicate or out-of-order dates.
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self, AppError> {
        for w in points.windows(2) {
            if w[1].ds <= w[0].ds {
                return Err(AppError::Parse(format!(
                    "Aggregated series dates must be unique and ascending ({} follows {}).",
                    w[1].ds, w[0].ds
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.ds)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.ds)
    }
}

/// A single row of model output.
///
/// Historical rows carry the in-sample fit; future rows extend past the last
/// historical date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub trend: f64,
    pub yearly: f64,
    pub weekly: f64,
    /// Sum of all seasonal terms (`yearly + weekly`).
    pub additive_terms: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Model output covering the history plus the forecast horizon, ascending by date.
pub type ForecastTable = Vec<ForecastRow>;

/// A trend changepoint estimated by the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Changepoint {
    pub ds: NaiveDate,
    /// Change in trend slope at this date (scaled units).
    pub delta: f64,
}

/// Which periodic component a profile describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonalityKind {
    Weekly,
    Yearly,
}

impl SeasonalityKind {
    pub fn display_name(self) -> &'static str {
        match self {
            SeasonalityKind::Weekly => "weekly",
            SeasonalityKind::Yearly => "yearly",
        }
    }

    /// Period length in days.
    pub fn period_days(self) -> f64 {
        match self {
            SeasonalityKind::Weekly => 7.0,
            SeasonalityKind::Yearly => 365.25,
        }
    }
}

/// One full period of a fitted seasonal component.
///
/// `points` are `(offset, effect)` pairs: weekday index (0 = Monday) for the
/// weekly profile, day of year (1-based) for the yearly one.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalProfile {
    pub kind: SeasonalityKind,
    pub points: Vec<(f64, f64)>,
}

/// Actual and predicted values joined on date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedRow {
    pub ds: NaiveDate,
    pub y: f64,
    pub yhat: f64,
    pub residual: f64,
}

/// In-sample error metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub n: usize,
}

/// One line of the forecast CSV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastOutputRow {
    pub date: NaiveDate,
    pub forecast_value: f64,
}

/// Whether a seasonal component is fitted.
///
/// `Auto` enables yearly seasonality when the history spans at least two years
/// and weekly seasonality when it spans at least two weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeasonalityMode {
    Auto,
    On,
    Off,
}

/// Settings for the additive model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    /// Maximum number of candidate trend changepoints.
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    /// Fixed L2 penalty on changepoint deltas. `None` selects it by GCV.
    pub changepoint_penalty: Option<f64>,
    pub yearly: SeasonalityMode,
    pub yearly_order: usize,
    pub weekly: SeasonalityMode,
    pub weekly_order: usize,
    /// Coverage of the uncertainty interval, in `(0, 1)`.
    pub interval_width: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_penalty: None,
            yearly: SeasonalityMode::Auto,
            yearly_order: 10,
            weekly: SeasonalityMode::Auto,
            weekly_order: 3,
            interval_width: 0.8,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults). The run date is resolved
/// once by the caller and never recomputed downstream.
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    pub source: PathBuf,
    pub date_column: String,
    pub target_column: String,
    pub run_date: NaiveDate,
    pub horizon_days: u32,
    pub output_dir: PathBuf,
    pub model: ModelSettings,
}

impl ForecastConfig {
    pub fn csv_file_name(&self) -> String {
        format!("forecast_output_{}.csv", self.run_date.format("%Y-%m-%d"))
    }

    pub fn pdf_file_name(&self) -> String {
        format!("forecast_{}_plots.pdf", self.run_date.format("%Y-%m-%d"))
    }
}
