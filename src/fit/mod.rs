//! Model calibration.
//!
//! Responsibilities:
//!
//! - generate the changepoint penalty grid
//! - evaluate each candidate penalty (parallel)
//! - select the penalty by generalized cross-validation

pub mod penalty_grid;
pub mod selection;

pub use penalty_grid::*;
pub use selection::*;
