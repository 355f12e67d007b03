//! PDF report rendering.
//!
//! Charts are built with Plotters and painted onto `printpdf` pages through
//! [`pdf_backend::PdfBackend`].

pub mod pdf_backend;
pub mod report;

pub use pdf_backend::*;
pub use report::*;
