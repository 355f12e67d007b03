//! Reporting: reconciliation against actuals, console text, and the PDF report.
//!
//! We keep formatting code in one place so:
//! - the model code stays clean and testable
//! - output changes are localized

pub mod format;
pub mod reconcile;

pub use format::*;
pub use reconcile::*;
