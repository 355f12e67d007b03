//! `daily-forecast` library crate.
//!
//! The binary (`fc`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model sits behind a trait and can be swapped without touching the pipeline
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod transform;
