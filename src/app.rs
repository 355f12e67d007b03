//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves the run date (once)
//! - runs the forecast pipeline
//! - prints the metrics

use std::fs::File;
use std::io::BufWriter;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs, SampleArgs};
use crate::data::{SampleSettings, generate_sample, write_sample_csv};
use crate::domain::{ForecastConfig, ModelSettings};
use crate::error::AppError;
use crate::models::AdditiveModel;

pub mod pipeline;

/// Entry point for the `fc` binary.
pub fn run() -> Result<(), AppError> {
    // `fc data.csv date calls` should behave like `fc run data.csv date calls`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// Install the stderr `fmt` subscriber. `RUST_LOG` wins over the flags.
fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    // A second init (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let run_date = args
        .run_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let config = forecast_config_from_args(&args, run_date);
    let model = AdditiveModel::new(config.model.clone())?;

    let run = pipeline::run_forecast(&config, &model)?;
    let paths = pipeline::write_outputs(&run, &config)?;

    debug!(
        "run summary:\n{}",
        crate::report::format_run_summary(&config, &run.series, run.output_rows.len())
    );
    info!(csv = %paths.csv.display(), pdf = %paths.pdf.display(), "outputs written");
    println!("{}", crate::report::format_metrics(&run.reconciliation.metrics));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let settings = SampleSettings {
        days: args.days,
        seed: args.seed,
        countries: args.countries,
        start: args.start,
    };
    let rows = generate_sample(&settings)?;

    let file = File::create(&args.out)
        .map_err(|e| AppError::io(format!("Failed to create sample CSV '{}'", args.out.display()), e))?;
    write_sample_csv(BufWriter::new(file), &rows)?;

    info!(path = %args.out.display(), rows = rows.len(), "sample written");
    Ok(())
}

pub fn forecast_config_from_args(args: &RunArgs, run_date: NaiveDate) -> ForecastConfig {
    ForecastConfig {
        source: args.source.clone(),
        date_column: args.date_column.clone(),
        target_column: args.target_column.clone(),
        run_date,
        horizon_days: args.horizon,
        output_dir: args.output_dir.clone(),
        model: ModelSettings {
            n_changepoints: args.changepoints,
            changepoint_range: args.changepoint_range,
            changepoint_penalty: args.changepoint_penalty,
            yearly: args.yearly,
            yearly_order: args.yearly_order,
            weekly: args.weekly,
            weekly_order: args.weekly_order,
            interval_width: args.interval_width,
        },
    }
}

/// Rewrite argv so a bare invocation defaults to `run`.
///
/// Rules:
/// - `fc data.csv date calls`      -> `fc run data.csv date calls`
/// - `fc -v data.csv date calls`   -> `fc -v run data.csv date calls`
/// - `fc run ...` / `fc sample ...` -> unchanged
/// - `fc`, `fc --help/--version`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let first_positional = argv
        .iter()
        .skip(1)
        .position(|a| !matches!(a.as_str(), "-v" | "--verbose" | "-q" | "--quiet"))
        .map(|i| i + 1);
    let Some(idx) = first_positional else {
        return argv;
    };

    let keep = matches!(
        argv[idx].as_str(),
        "run" | "sample" | "help" | "-h" | "--help" | "-V" | "--version"
    );
    if !keep {
        argv.insert(idx, "run".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_becomes_run() {
        assert_eq!(
            rewrite_args(args(&["fc", "data.csv", "date", "calls"])),
            args(&["fc", "run", "data.csv", "date", "calls"])
        );
        assert_eq!(
            rewrite_args(args(&["fc", "-v", "data.csv", "date", "calls"])),
            args(&["fc", "-v", "run", "data.csv", "date", "calls"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for argv in [
            args(&["fc"]),
            args(&["fc", "--help"]),
            args(&["fc", "sample", "out.csv"]),
            args(&["fc", "-q", "run", "a.csv", "d", "t"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }

    #[test]
    fn config_carries_model_settings() {
        let cli = Cli::parse_from(["fc", "run", "a.csv", "day", "calls", "--changepoints", "10", "--horizon", "30"]);
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        let config = forecast_config_from_args(&run, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.model.n_changepoints, 10);
        assert_eq!(config.horizon_days, 30);
        assert_eq!(config.date_column, "day");
    }
}
