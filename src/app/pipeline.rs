//! The forecast pipeline.
//!
//! load -> aggregate -> fit -> predict -> reconcile -> format output,
//! then render the CSV and PDF and move both into place together.

use std::io::BufWriter;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::{
    AggregatedSeries, Changepoint, ForecastConfig, ForecastOutputRow, ForecastTable, SeasonalProfile,
};
use crate::error::AppError;
use crate::io::{format_forecast_output, load_table, write_forecast_csv};
use crate::models::{FittedModel, ForecastModel};
use crate::plot::{ReportInput, render_report};
use crate::report::{Reconciliation, reconcile};
use crate::transform::aggregate_daily;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: AggregatedSeries,
    pub forecast: ForecastTable,
    pub changepoints: Vec<Changepoint>,
    pub profiles: Vec<SeasonalProfile>,
    pub reconciliation: Reconciliation,
    pub output_rows: Vec<ForecastOutputRow>,
}

/// Where the outputs landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub pdf: PathBuf,
}

/// Execute the pipeline up to (but not including) writing files.
pub fn run_forecast<M: ForecastModel>(config: &ForecastConfig, model: &M) -> Result<RunOutput, AppError> {
    let table = load_table(&config.source)?;
    info!(rows = table.len(), source = %config.source.display(), "loaded source");

    let series = aggregate_daily(&table, &config.date_column, &config.target_column)?;
    info!(dates = series.len(), "aggregated daily totals");

    let fitted = model.fit(&series)?;
    let forecast = fitted.predict(config.horizon_days)?;
    debug!(rows = forecast.len(), "predicted");

    let reconciliation = reconcile(&series, &forecast)?;
    let metrics = reconciliation.metrics;
    info!(n = metrics.n, mae = metrics.mae, mse = metrics.mse, rmse = metrics.rmse, "in-sample metrics");

    let output_rows = format_forecast_output(&forecast, config.run_date);
    info!(rows = output_rows.len(), run_date = %config.run_date, "forecast rows after run date");

    Ok(RunOutput {
        series,
        changepoints: fitted.changepoints().to_vec(),
        profiles: fitted.seasonality_profiles(),
        forecast,
        reconciliation,
        output_rows,
    })
}

/// Write the forecast CSV and the PDF report into `config.output_dir`.
///
/// Both files are rendered into temporary files in the output directory and
/// only renamed into place once both succeeded, so a failure leaves neither.
pub fn write_outputs(run: &RunOutput, config: &ForecastConfig) -> Result<OutputPaths, AppError> {
    let dir = &config.output_dir;
    let paths = OutputPaths {
        csv: dir.join(config.csv_file_name()),
        pdf: dir.join(config.pdf_file_name()),
    };

    let csv_tmp = NamedTempFile::new_in(dir)
        .map_err(|e| AppError::io(format!("Failed to create a temporary file in '{}'", dir.display()), e))?;
    write_forecast_csv(BufWriter::new(csv_tmp.as_file()), &run.output_rows)?;

    let pdf_tmp = NamedTempFile::new_in(dir)
        .map_err(|e| AppError::io(format!("Failed to create a temporary file in '{}'", dir.display()), e))?;
    let input = ReportInput {
        series: &run.series,
        forecast: &run.forecast,
        changepoints: &run.changepoints,
        profiles: &run.profiles,
        reconciliation: &run.reconciliation,
        output_rows: &run.output_rows,
        run_date: config.run_date,
    };
    let summary = render_report(BufWriter::new(pdf_tmp.as_file()), &input)?;
    debug!(pages = summary.pages, "report rendered");

    csv_tmp
        .persist(&paths.csv)
        .map_err(|e| AppError::io(format!("Failed to write '{}'", paths.csv.display()), e.error))?;
    pdf_tmp
        .persist(&paths.pdf)
        .map_err(|e| AppError::io(format!("Failed to write '{}'", paths.pdf.display()), e.error))?;

    Ok(paths)
}
