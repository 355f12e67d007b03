//! Input/output helpers.
//!
//! - CSV ingest + parsing (`ingest`)
//! - forecast CSV export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
