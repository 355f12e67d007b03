//! Forecasting models.
//!
//! The pipeline only talks to a model through two traits mirroring the
//! `fit(series) -> model` / `predict(model, horizon) -> table` contract, so a
//! different statistical model can be dropped in without touching the
//! aggregation, reconciliation or reporting code.

pub mod additive;

pub use additive::*;

use crate::domain::{AggregatedSeries, Changepoint, ForecastTable, SeasonalProfile};
use crate::error::AppError;

/// An unfitted model configuration.
pub trait ForecastModel {
    type Fitted: FittedModel;

    /// Fit the model to a daily `(ds, y)` series.
    fn fit(&self, series: &AggregatedSeries) -> Result<Self::Fitted, AppError>;
}

/// A fitted model.
pub trait FittedModel {
    /// Predict every historical date plus `horizon_days` daily steps past the
    /// last historical date.
    fn predict(&self, horizon_days: u32) -> Result<ForecastTable, AppError>;

    /// All candidate changepoints with their estimated slope changes.
    fn changepoints(&self) -> &[Changepoint];

    /// One period of each fitted seasonal component.
    fn seasonality_profiles(&self) -> Vec<SeasonalProfile>;
}
