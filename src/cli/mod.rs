//! Command-line parsing for the daily forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_HORIZON_DAYS, MAX_HORIZON_DAYS, SeasonalityMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fc", version, about = "Daily volume forecaster (CSV in, CSV + PDF out)")]
pub struct Cli {
    /// Log debug detail to stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate a CSV by date, fit the model, and write the forecast CSV and PDF report.
    ///
    /// This is also what a bare `fc <SOURCE> <DATE_COLUMN> <TARGET_COLUMN>` runs.
    Run(RunArgs),
    /// Write a synthetic multi-country daily call-volume CSV.
    Sample(SampleArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Source CSV file.
    pub source: PathBuf,

    /// Column holding the observation date.
    pub date_column: String,

    /// Numeric column to sum per date and forecast.
    pub target_column: String,

    /// Directory receiving the forecast CSV and the PDF report.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Only forecast dates after this one are written (default: today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub run_date: Option<NaiveDate>,

    /// Days to forecast past the last observed date.
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_DAYS,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HORIZON_DAYS))
    )]
    pub horizon: u32,

    /// Coverage of the uncertainty interval.
    #[arg(long, default_value_t = 0.8)]
    pub interval_width: f64,

    /// Maximum number of candidate trend changepoints.
    #[arg(long, default_value_t = 25)]
    pub changepoints: usize,

    /// Share of the history in which changepoints may be placed.
    #[arg(long, default_value_t = 0.8)]
    pub changepoint_range: f64,

    /// Fixed penalty on trend changes (default: chosen by cross-validation).
    #[arg(long)]
    pub changepoint_penalty: Option<f64>,

    /// Yearly seasonality.
    #[arg(long, value_enum, default_value_t = SeasonalityMode::Auto)]
    pub yearly: SeasonalityMode,

    /// Fourier order of the yearly seasonality.
    #[arg(long, default_value_t = 10)]
    pub yearly_order: usize,

    /// Weekly seasonality.
    #[arg(long, value_enum, default_value_t = SeasonalityMode::Auto)]
    pub weekly: SeasonalityMode,

    /// Fourier order of the weekly seasonality.
    #[arg(long, default_value_t = 3)]
    pub weekly_order: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    pub out: PathBuf,

    /// Number of consecutive days to generate.
    #[arg(long, default_value_t = 730)]
    pub days: u32,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of countries (rows per day).
    #[arg(long, default_value_t = 3)]
    pub countries: usize,

    /// First generated date.
    #[arg(long, value_name = "YYYY-MM-DD", default_value = "2023-01-01")]
    pub start: NaiveDate,
}
