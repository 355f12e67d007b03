//! The five-page PDF report.
//!
//! Pages, in order:
//! 1. aggregated actuals used to fit the model
//! 2. in-sample fit and forecast with the uncertainty band, trend and changepoints
//! 3. components (trend, then each fitted seasonality)
//! 4. forecast values after the run date
//! 5. residuals over time
//!
//! Dates are plotted as day numbers and formatted back to `YYYY-MM-DD` on the axis.

use std::convert::Infallible;
use std::io::{BufWriter, Write};

use chrono::{Datelike, Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use printpdf::{BuiltinFont, IndirectFontRef, PdfDocument, PdfLayerReference};
use tracing::debug;

use crate::domain::{
    AggregatedSeries, Changepoint, ForecastOutputRow, ForecastTable, SeasonalProfile, SeasonalityKind,
};
use crate::error::AppError;
use crate::models::significant_changepoints;
use crate::plot::pdf_backend::{pt_to_mm, PdfBackend};
use crate::report::Reconciliation;

/// Page width in points (18 in).
pub const PAGE_WIDTH: u32 = 1296;
/// Height of the first page (5 in).
pub const SHORT_PAGE_HEIGHT: u32 = 360;
/// Height of every other page (8 in).
pub const TALL_PAGE_HEIGHT: u32 = 576;

const LAYER_NAME: &str = "Layer 1";

/// Title shared by the forecast pages (2 and 4).
const FORECAST_TITLE: &str = "Aggregated Forecasted Volume";
/// Axis descriptions shared by the forecast pages.
const FORECAST_AXES: (&str, &str) = ("Date", "Forecasted Volume");

type Area = DrawingArea<PdfBackend, Shift>;
type DrawResult = Result<(), DrawingAreaErrorKind<Infallible>>;

/// Everything the report draws. All fields are produced by the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub series: &'a AggregatedSeries,
    pub forecast: &'a ForecastTable,
    pub changepoints: &'a [Changepoint],
    pub profiles: &'a [SeasonalProfile],
    pub reconciliation: &'a Reconciliation,
    pub output_rows: &'a [ForecastOutputRow],
    pub run_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub pages: usize,
}

/// Render the report as a PDF into `writer`.
///
/// Any drawing failure aborts the whole document.
pub fn render_report<W: Write>(writer: W, input: &ReportInput<'_>) -> Result<ReportSummary, AppError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        format!("Forecast {}", input.run_date),
        pt_to_mm(PAGE_WIDTH),
        pt_to_mm(SHORT_PAGE_HEIGHT),
        LAYER_NAME,
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Render(format!("Failed to load PDF font: {e}")))?;

    let first = doc.get_page(first_page).get_layer(first_layer);
    draw_page(first, &font, SHORT_PAGE_HEIGHT, |root| draw_actuals(root, input))?;
    let mut pages = 1;

    let tall_pages: [&dyn Fn(&Area) -> DrawResult; 4] = [
        &|root: &Area| draw_forecast(root, input),
        &|root: &Area| draw_components(root, input),
        &|root: &Area| draw_future(root, input),
        &|root: &Area| draw_residuals(root, input),
    ];
    for draw in tall_pages {
        let (page, layer) = doc.add_page(pt_to_mm(PAGE_WIDTH), pt_to_mm(TALL_PAGE_HEIGHT), LAYER_NAME);
        draw_page(doc.get_page(page).get_layer(layer), &font, TALL_PAGE_HEIGHT, draw)?;
        pages += 1;
    }

    let mut out = BufWriter::new(writer);
    doc.save(&mut out)
        .map_err(|e| AppError::Render(format!("Failed to write PDF: {e}")))?;
    out.flush().map_err(|e| AppError::io("Failed to flush PDF", e))?;

    debug!(pages, "rendered report");
    Ok(ReportSummary { pages })
}

fn draw_page<F>(layer: PdfLayerReference, font: &IndirectFontRef, height: u32, draw: F) -> Result<(), AppError>
where
    F: FnOnce(&Area) -> DrawResult,
{
    let root = PdfBackend::new(layer, font.clone(), (PAGE_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    draw(&root).map_err(render_error)?;
    root.present().map_err(render_error)
}

fn render_error(err: DrawingAreaErrorKind<Infallible>) -> AppError {
    AppError::Render(format!("Failed to draw report page: {err}"))
}

fn draw_actuals(root: &Area, input: &ReportInput<'_>) -> DrawResult {
    let points: Vec<(f64, f64)> = input.series.points().iter().map(|p| (day_num(p.ds), p.y)).collect();
    let (x, y) = bounds(&points, points.iter().map(|p| p.1));
    let mut chart = date_chart(root, "Total Actual Volumes - Aggregated Daily - Used to Predict", x, y)?;
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Volume")
        .x_label_formatter(&fmt_day)
        .label_style(label_font())
        .draw()?;
    chart.draw_series(LineSeries::new(points, BLUE.stroke_width(1)))?;
    Ok(())
}

fn draw_forecast(root: &Area, input: &ReportInput<'_>) -> DrawResult {
    let actual: Vec<(f64, f64)> = input.series.points().iter().map(|p| (day_num(p.ds), p.y)).collect();
    let yhat: Vec<(f64, f64)> = input.forecast.iter().map(|r| (day_num(r.ds), r.yhat)).collect();
    let trend: Vec<(f64, f64)> = input.forecast.iter().map(|r| (day_num(r.ds), r.trend)).collect();

    let xs: Vec<(f64, f64)> = actual.iter().chain(yhat.iter()).copied().collect();
    let ys = actual
        .iter()
        .map(|p| p.1)
        .chain(input.forecast.iter().flat_map(|r| [r.yhat_lower, r.yhat_upper]));
    let (x, (y0, y1)) = bounds(&xs, ys);
    let mut chart = date_chart(root, FORECAST_TITLE, x, (y0, y1))?;
    chart
        .configure_mesh()
        .x_desc(FORECAST_AXES.0)
        .y_desc(FORECAST_AXES.1)
        .x_label_formatter(&fmt_day)
        .label_style(label_font())
        .draw()?;

    let band: Vec<(f64, f64)> = input
        .forecast
        .iter()
        .map(|r| (day_num(r.ds), r.yhat_upper))
        .chain(input.forecast.iter().rev().map(|r| (day_num(r.ds), r.yhat_lower)))
        .collect();
    let band_color = RGBColor(0, 114, 178);
    chart
        .draw_series(std::iter::once(Polygon::new(band, band_color.mix(0.2).filled())))?
        .label("uncertainty")
        .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 20, y + 4)], band_color.mix(0.2).filled()));

    chart
        .draw_series(LineSeries::new(yhat, band_color.stroke_width(2)))?
        .label("yhat")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], band_color.stroke_width(2)));

    chart
        .draw_series(actual.iter().map(|&p| Circle::new(p, 2, BLACK.filled())))?
        .label("actual")
        .legend(|(x, y)| Circle::new((x + 10, y), 2, BLACK.filled()));

    chart
        .draw_series(LineSeries::new(trend, RED.stroke_width(2)))?
        .label("trend")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    let cps = significant_changepoints(input.changepoints);
    chart.draw_series(cps.iter().map(|c| {
        let x = day_num(c.ds);
        PathElement::new(vec![(x, y0), (x, y1)], RED.mix(0.5).stroke_width(1))
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(label_font())
        .draw()?;
    Ok(())
}

fn draw_components(root: &Area, input: &ReportInput<'_>) -> DrawResult {
    let panels = root.split_evenly((1 + input.profiles.len(), 1));
    let Some((trend_area, profile_areas)) = panels.split_first() else {
        return Ok(());
    };

    let trend: Vec<(f64, f64)> = input.forecast.iter().map(|r| (day_num(r.ds), r.trend)).collect();
    let (x, y) = bounds(&trend, trend.iter().map(|p| p.1));
    let mut chart = date_chart(trend_area, "trend", x, y)?;
    chart
        .configure_mesh()
        .x_desc("ds")
        .y_desc("trend")
        .x_label_formatter(&fmt_day)
        .label_style(label_font())
        .draw()?;
    chart.draw_series(LineSeries::new(trend, BLUE.stroke_width(2)))?;

    for (area, profile) in profile_areas.iter().zip(input.profiles) {
        draw_profile(area, profile)?;
    }
    Ok(())
}

fn draw_profile(area: &Area, profile: &SeasonalProfile) -> DrawResult {
    let (x0, x1) = padded_range(profile.points.iter().map(|p| p.0), 0.0);
    let (y0, y1) = padded_range(profile.points.iter().map(|p| p.1), 0.05);
    let name = profile.kind.display_name();

    let mut chart = ChartBuilder::on(area)
        .caption(name, caption_font())
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(80)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    let fmt_x: fn(&f64) -> String = match profile.kind {
        SeasonalityKind::Weekly => fmt_weekday,
        SeasonalityKind::Yearly => fmt_day_of_year,
    };
    let x_desc = match profile.kind {
        SeasonalityKind::Weekly => "Day of week",
        SeasonalityKind::Yearly => "Day of year",
    };
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(name)
        .x_labels(match profile.kind {
            SeasonalityKind::Weekly => 7,
            SeasonalityKind::Yearly => 12,
        })
        .x_label_formatter(&fmt_x)
        .label_style(label_font())
        .draw()?;
    chart.draw_series(LineSeries::new(profile.points.iter().copied(), BLUE.stroke_width(2)))?;
    Ok(())
}

fn draw_future(root: &Area, input: &ReportInput<'_>) -> DrawResult {
    if input.output_rows.is_empty() {
        root.draw(&Text::new(
            format!("{FORECAST_TITLE}: no forecast dates after {}", input.run_date),
            (40, 40),
            caption_font(),
        ))?;
        return Ok(());
    }

    let points: Vec<(f64, f64)> = input
        .output_rows
        .iter()
        .map(|r| (day_num(r.date), r.forecast_value))
        .collect();
    let (x, y) = bounds(&points, points.iter().map(|p| p.1));
    let mut chart = date_chart(root, FORECAST_TITLE, x, y)?;
    chart
        .configure_mesh()
        .x_desc(FORECAST_AXES.0)
        .y_desc(FORECAST_AXES.1)
        .x_label_formatter(&fmt_day)
        .label_style(label_font())
        .draw()?;
    chart.draw_series(LineSeries::new(points, BLUE.stroke_width(2)))?;
    Ok(())
}

fn draw_residuals(root: &Area, input: &ReportInput<'_>) -> DrawResult {
    let points: Vec<(f64, f64)> = input
        .reconciliation
        .rows
        .iter()
        .map(|r| (day_num(r.ds), r.residual))
        .collect();
    let ((x0, x1), y) = bounds(&points, points.iter().map(|p| p.1).chain(std::iter::once(0.0)));
    let mut chart = date_chart(root, "Residuals", (x0, x1), y)?;
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Residual")
        .x_label_formatter(&fmt_day)
        .label_style(label_font())
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(x0, 0.0), (x1, 0.0)],
        BLACK.mix(0.6).stroke_width(1),
    )))?;
    chart.draw_series(LineSeries::new(points, BLUE.stroke_width(1)))?;
    Ok(())
}

type Bounds = ((f64, f64), (f64, f64));

/// Axis bounds: x from `points`, y from `ys`.
fn bounds(points: &[(f64, f64)], ys: impl Iterator<Item = f64>) -> Bounds {
    (padded_range(points.iter().map(|p| p.0), 0.01), padded_range(ys, 0.05))
}

/// A chart with a date x-axis.
fn date_chart<'a>(
    area: &'a Area,
    caption: &str,
    (x0, x1): (f64, f64),
    (y0, y1): (f64, f64),
) -> Result<
    ChartContext<'a, PdfBackend, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
    DrawingAreaErrorKind<Infallible>,
> {
    ChartBuilder::on(area)
        .caption(caption, caption_font())
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(80)
        .build_cartesian_2d(x0..x1, y0..y1)
}

fn caption_font() -> TextStyle<'static> {
    ("sans-serif", 20).into_font().into()
}

fn label_font() -> TextStyle<'static> {
    ("sans-serif", 11).into_font().into()
}

/// `[min, max]` widened by `pad` of the span on each side; never empty.
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(1.0) {
        return (lo - 1.0, hi + 1.0);
    }
    (lo - pad * span, hi + pad * span)
}

fn day_num(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn fmt_day(v: &f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn fmt_weekday(v: &f64) -> String {
    const NAMES: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];
    let i = v.round();
    if (0.0..7.0).contains(&i) {
        NAMES[i as usize].to_string()
    } else {
        String::new()
    }
}

fn fmt_day_of_year(v: &f64) -> String {
    let day = v.round() as i64;
    if !(1..=365).contains(&day) {
        return String::new();
    }
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .map(|jan1| (jan1 + Duration::days(day - 1)).format("%B %-d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CombinedRow, ForecastRow, Metrics, SeriesPoint};

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    struct Fixture {
        series: AggregatedSeries,
        forecast: ForecastTable,
        changepoints: Vec<Changepoint>,
        profiles: Vec<SeasonalProfile>,
        reconciliation: Reconciliation,
        output_rows: Vec<ForecastOutputRow>,
    }

    fn fixture() -> Fixture {
        let series = AggregatedSeries::new(
            (0..60)
                .map(|i| SeriesPoint {
                    ds: d(i),
                    y: 100.0 + i as f64,
                })
                .collect(),
        )
        .unwrap();
        let forecast: ForecastTable = (0..90)
            .map(|i| {
                let yhat = 100.0 + i as f64;
                ForecastRow {
                    ds: d(i),
                    trend: yhat,
                    yearly: 0.0,
                    weekly: 0.0,
                    additive_terms: 0.0,
                    yhat,
                    yhat_lower: yhat - 5.0,
                    yhat_upper: yhat + 5.0,
                }
            })
            .collect();
        let rows = (0..60)
            .map(|i| CombinedRow {
                ds: d(i),
                y: 100.0 + i as f64,
                yhat: 100.0 + i as f64,
                residual: 0.0,
            })
            .collect();
        let output_rows = forecast
            .iter()
            .skip(60)
            .map(|r| ForecastOutputRow {
                date: r.ds,
                forecast_value: r.yhat,
            })
            .collect();
        Fixture {
            series,
            forecast,
            changepoints: vec![Changepoint { ds: d(20), delta: 0.3 }],
            profiles: vec![SeasonalProfile {
                kind: SeasonalityKind::Weekly,
                points: (0..7).map(|i| (i as f64, (i as f64 - 3.0) * 2.0)).collect(),
            }],
            reconciliation: Reconciliation {
                rows,
                metrics: Metrics {
                    mae: 0.0,
                    mse: 0.0,
                    rmse: 0.0,
                    n: 60,
                },
            },
            output_rows,
        }
    }

    #[test]
    fn report_has_five_pages() {
        let f = fixture();
        let input = ReportInput {
            series: &f.series,
            forecast: &f.forecast,
            changepoints: &f.changepoints,
            profiles: &f.profiles,
            reconciliation: &f.reconciliation,
            output_rows: &f.output_rows,
            run_date: d(59),
        };
        let mut buf = Vec::new();
        let summary = render_report(&mut buf, &input).unwrap();
        assert_eq!(summary.pages, 5);
        assert!(buf.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_future_still_renders() {
        let f = fixture();
        let input = ReportInput {
            series: &f.series,
            forecast: &f.forecast,
            changepoints: &[],
            profiles: &[],
            reconciliation: &f.reconciliation,
            output_rows: &[],
            run_date: d(400),
        };
        let mut buf = Vec::new();
        assert_eq!(render_report(&mut buf, &input).unwrap().pages, 5);
    }

    #[test]
    fn padded_range_handles_flat_and_empty_input() {
        assert_eq!(padded_range([3.0, 3.0].into_iter(), 0.1), (2.0, 4.0));
        assert_eq!(padded_range(std::iter::empty(), 0.1), (0.0, 1.0));
        let (lo, hi) = padded_range([0.0, 10.0].into_iter(), 0.1);
        assert!((lo + 1.0).abs() < 1e-12 && (hi - 11.0).abs() < 1e-12);
    }

    #[test]
    fn forecast_pages_use_reader_facing_labels() {
        assert_eq!(FORECAST_TITLE, "Aggregated Forecasted Volume");
        assert_eq!(FORECAST_AXES, ("Date", "Forecasted Volume"));
    }

    #[test]
    fn axis_labels_format_back_to_dates() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(fmt_day(&day_num(day)), "2024-02-29");
        assert_eq!(fmt_weekday(&0.0), "Monday");
        assert_eq!(fmt_day_of_year(&32.0), "February 1");
    }
}
