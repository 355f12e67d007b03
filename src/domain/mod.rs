//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the aggregated `(ds, y)` series handed to the model
//! - model outputs (`ForecastRow`, `Changepoint`, `SeasonalProfile`)
//! - reconciliation outputs (`CombinedRow`, `Metrics`) and CSV rows
//! - run configuration (`ForecastConfig`, `ModelSettings`)

pub mod types;

pub use types::*;
