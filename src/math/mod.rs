//! Mathematical utilities: basis functions and penalised least squares.

pub mod basis;
pub mod ols;

pub use basis::*;
pub use ols::*;
