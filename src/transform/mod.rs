//! Data preparation between the loader and the model.

pub mod aggregate;

pub use aggregate::*;
