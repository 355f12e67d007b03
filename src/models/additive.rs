//! Additive trend + seasonality model.
//!
//! ```text
//! y(t) = trend(t) + yearly(t) + weekly(t)
//! trend(t) = m + k t + Σ_j δ_j (t - s_j)+
//! ```
//!
//! - `t` is time scaled to `[0, 1]` over the history; `y` is scaled by `max |y|`.
//! - Candidate changepoints `s_j` are spread uniformly over the first part of
//!   the history (`changepoint_range`); their slope changes `δ_j` carry an L2
//!   penalty chosen by GCV (see `fit::selection`) unless a fixed one is given.
//! - Seasonal components are Fourier series with a small fixed penalty.
//! - Intervals combine the residual scale with the trend uncertainty implied
//!   by the fitted changepoint rate and magnitude, which grows with distance
//!   past the end of the history.

use chrono::{Duration, NaiveDate};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};

use crate::domain::{
    AggregatedSeries, Changepoint, ForecastRow, ForecastTable, MAX_HORIZON_DAYS, ModelSettings, SeasonalProfile,
    SeasonalityKind, SeasonalityMode,
};
use crate::error::AppError;
use crate::fit::{default_penalty_grid, select_penalty};
use crate::math::{epoch_days, fill_fourier, hinge, solve_penalized};
use crate::models::{FittedModel, ForecastModel};

/// Minimum `|δ|` (scaled units) for a changepoint to count as detected.
pub const CHANGEPOINT_THRESHOLD: f64 = 0.01;

/// Fixed ridge weight on Fourier coefficients.
const SEASONALITY_PENALTY: f64 = 1e-4;

/// History span (days) from which `auto` enables each seasonality.
const YEARLY_MIN_SPAN_DAYS: i64 = 730;
const WEEKLY_MIN_SPAN_DAYS: i64 = 14;

/// Column layout of the design matrix:
/// `[1, t, hinge_1..hinge_C, yearly sin/cos pairs, weekly sin/cos pairs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignLayout {
    /// Changepoint locations in scaled time.
    pub changepoints: Vec<f64>,
    pub yearly_order: usize,
    pub weekly_order: usize,
}

impl DesignLayout {
    pub fn width(&self) -> usize {
        2 + self.changepoints.len() + 2 * (self.yearly_order + self.weekly_order)
    }

    fn yearly_offset(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn weekly_offset(&self) -> usize {
        self.yearly_offset() + 2 * self.yearly_order
    }

    /// Fill a design row for scaled time `t` and absolute day number `days`.
    ///
    /// # Panics
    /// Panics if `out.len() != self.width()`.
    pub fn fill_row(&self, t: f64, days: f64, out: &mut [f64]) {
        out[0] = 1.0;
        out[1] = t;
        for (j, &s) in self.changepoints.iter().enumerate() {
            out[2 + j] = hinge(t, s);
        }
        let yo = self.yearly_offset();
        fill_fourier(
            days,
            SeasonalityKind::Yearly.period_days(),
            self.yearly_order,
            &mut out[yo..yo + 2 * self.yearly_order],
        );
        let wo = self.weekly_offset();
        fill_fourier(
            days,
            SeasonalityKind::Weekly.period_days(),
            self.weekly_order,
            &mut out[wo..wo + 2 * self.weekly_order],
        );
    }

    /// Per-column ridge weights for a given changepoint penalty.
    pub fn penalty(&self, delta_penalty: f64) -> Vec<f64> {
        let mut out = vec![SEASONALITY_PENALTY; self.width()];
        out[0] = 0.0;
        out[1] = 0.0;
        for j in 0..self.changepoints.len() {
            out[2 + j] = delta_penalty;
        }
        out
    }
}

/// Maps dates to scaled time.
#[derive(Debug, Clone, Copy)]
struct TimeScale {
    start: NaiveDate,
    span_days: f64,
}

impl TimeScale {
    fn t(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }
}

/// Scaled component values at one date.
#[derive(Debug, Clone, Copy)]
struct Components {
    trend: f64,
    yearly: f64,
    weekly: f64,
}

/// Model configuration (the unfitted model).
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    settings: ModelSettings,
}

impl AdditiveModel {
    pub fn new(settings: ModelSettings) -> Result<Self, AppError> {
        if !(settings.changepoint_range.is_finite()
            && settings.changepoint_range > 0.0
            && settings.changepoint_range <= 1.0)
        {
            return Err(AppError::Config(format!(
                "changepoint range must be in (0, 1], got {}.",
                settings.changepoint_range
            )));
        }
        interval_multiplier(settings.interval_width)?;
        if let Some(l) = settings.changepoint_penalty {
            if !(l.is_finite() && l >= 0.0) {
                return Err(AppError::Config(format!(
                    "changepoint penalty must be finite and >= 0, got {l}."
                )));
            }
        }
        Ok(Self { settings })
    }
}

impl ForecastModel for AdditiveModel {
    type Fitted = FittedAdditive;

    fn fit(&self, series: &AggregatedSeries) -> Result<FittedAdditive, AppError> {
        let points = series.points();
        let n = points.len();
        let (Some(start), Some(end)) = (series.first_date(), series.last_date()) else {
            return Err(AppError::ModelFit("Series is empty; nothing to fit.".to_string()));
        };
        if n < 2 {
            return Err(AppError::ModelFit(format!(
                "Series has {n} distinct date(s); at least 2 are required to fit a trend."
            )));
        }
        if points.iter().any(|p| !p.y.is_finite()) {
            return Err(AppError::ModelFit("Series contains non-finite values.".to_string()));
        }

        let span = (end - start).num_days();
        let scale = TimeScale {
            start,
            span_days: span as f64,
        };
        let y_scale = match points.iter().map(|p| p.y.abs()).fold(0.0, f64::max) {
            m if m > 0.0 => m,
            _ => 1.0,
        };

        let cp_idx = changepoint_indices(n, self.settings.n_changepoints, self.settings.changepoint_range);
        let t: Vec<f64> = points.iter().map(|p| scale.t(p.ds)).collect();

        let layout = DesignLayout {
            changepoints: cp_idx.iter().map(|&i| t[i]).collect(),
            yearly_order: resolve_order(
                self.settings.yearly,
                span >= YEARLY_MIN_SPAN_DAYS,
                self.settings.yearly_order,
            ),
            weekly_order: resolve_order(
                self.settings.weekly,
                span >= WEEKLY_MIN_SPAN_DAYS,
                self.settings.weekly_order,
            ),
        };

        let p = layout.width();
        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut y = DVector::<f64>::zeros(n);
        let mut row = vec![0.0; p];
        for (i, point) in points.iter().enumerate() {
            layout.fill_row(t[i], epoch_days(point.ds), &mut row);
            for j in 0..p {
                x[(i, j)] = row[j];
            }
            y[i] = point.y / y_scale;
        }

        let (penalty, fit) = match self.settings.changepoint_penalty {
            Some(l) => {
                let fit = solve_penalized(&x, &y, &layout.penalty(l)).ok_or_else(|| {
                    AppError::ModelFit("Design matrix is singular; model could not be fit.".to_string())
                })?;
                (l, fit)
            }
            None => {
                let grid = default_penalty_grid()?;
                let selection = select_penalty(&x, &y, &grid, |l| layout.penalty(l))?;
                debug!(
                    penalty = selection.penalty,
                    gcv = selection.gcv,
                    candidates = selection.evaluated,
                    "selected changepoint penalty"
                );
                (selection.penalty, selection.fit)
            }
        };

        let beta: Vec<f64> = fit.beta.iter().copied().collect();
        let sigma = (fit.sse / (n as f64 - fit.dof).max(1.0)).sqrt();

        let changepoints: Vec<Changepoint> = cp_idx
            .iter()
            .enumerate()
            .map(|(j, &i)| Changepoint {
                ds: points[i].ds,
                delta: beta[2 + j],
            })
            .collect();
        let mean_abs_delta = if changepoints.is_empty() {
            0.0
        } else {
            changepoints.iter().map(|c| c.delta.abs()).sum::<f64>() / changepoints.len() as f64
        };

        let z = interval_multiplier(self.settings.interval_width)?;

        info!(
            points = n,
            changepoints = changepoints.len(),
            yearly_order = layout.yearly_order,
            weekly_order = layout.weekly_order,
            penalty,
            dof = fit.dof,
            "fitted additive model"
        );

        Ok(FittedAdditive {
            history: series.clone(),
            layout,
            beta,
            scale,
            y_scale,
            sigma,
            z,
            changepoints,
            mean_abs_delta,
        })
    }
}

/// A fitted additive model.
#[derive(Debug, Clone)]
pub struct FittedAdditive {
    history: AggregatedSeries,
    layout: DesignLayout,
    beta: Vec<f64>,
    scale: TimeScale,
    y_scale: f64,
    /// Residual scale in scaled units.
    sigma: f64,
    /// Normal multiplier for the configured interval width.
    z: f64,
    changepoints: Vec<Changepoint>,
    mean_abs_delta: f64,
}

impl FittedAdditive {
    pub fn layout(&self) -> &DesignLayout {
        &self.layout
    }

    /// Residual standard deviation in the units of the input series.
    pub fn sigma(&self) -> f64 {
        self.sigma * self.y_scale
    }

    fn components(&self, date: NaiveDate) -> Components {
        let mut row = vec![0.0; self.layout.width()];
        self.layout.fill_row(self.scale.t(date), epoch_days(date), &mut row);

        let dot = |range: std::ops::Range<usize>| -> f64 { range.map(|j| row[j] * self.beta[j]).sum() };
        let yo = self.layout.yearly_offset();
        let wo = self.layout.weekly_offset();
        Components {
            trend: dot(0..yo),
            yearly: dot(yo..wo),
            weekly: dot(wo..self.layout.width()),
        }
    }

    /// Trend standard deviation (scaled) at scaled time `t`.
    ///
    /// Past the history, slope changes arrive at the historical changepoint rate
    /// with Laplace-distributed size (scale = mean |δ|); the variance of the
    /// accumulated drift is `rate · 2b² · (t - 1)³ / 3`.
    fn trend_sd(&self, t: f64) -> f64 {
        if t <= 1.0 || self.changepoints.is_empty() {
            return 0.0;
        }
        let rate = self.changepoints.len() as f64;
        self.mean_abs_delta * (2.0 * rate / 3.0).sqrt() * (t - 1.0).powf(1.5)
    }
}

impl FittedModel for FittedAdditive {
    fn predict(&self, horizon_days: u32) -> Result<ForecastTable, AppError> {
        if !(1..=MAX_HORIZON_DAYS).contains(&horizon_days) {
            return Err(AppError::Config(format!(
                "Forecast horizon must be between 1 and {MAX_HORIZON_DAYS} days, got {horizon_days}."
            )));
        }
        let Some(last) = self.history.last_date() else {
            return Err(AppError::ModelFit("Model has no history.".to_string()));
        };

        let mut dates: Vec<NaiveDate> = self.history.points().iter().map(|p| p.ds).collect();
        for i in 1..=i64::from(horizon_days) {
            let ds = last.checked_add_signed(Duration::days(i)).ok_or_else(|| {
                AppError::Config(format!("Forecast date {i} days after {last} is out of range."))
            })?;
            dates.push(ds);
        }

        let mut out = Vec::with_capacity(dates.len());
        for ds in dates {
            let c = self.components(ds);
            let yhat = c.trend + c.yearly + c.weekly;
            let sd = (self.sigma * self.sigma + self.trend_sd(self.scale.t(ds)).powi(2)).sqrt();
            let half = self.z * sd;

            let row = ForecastRow {
                ds,
                trend: c.trend * self.y_scale,
                yearly: c.yearly * self.y_scale,
                weekly: c.weekly * self.y_scale,
                additive_terms: (c.yearly + c.weekly) * self.y_scale,
                yhat: yhat * self.y_scale,
                yhat_lower: (yhat - half) * self.y_scale,
                yhat_upper: (yhat + half) * self.y_scale,
            };
            if !(row.yhat.is_finite() && row.yhat_lower.is_finite() && row.yhat_upper.is_finite()) {
                return Err(AppError::ModelFit(format!("Non-finite prediction at {ds}.")));
            }
            out.push(row);
        }
        Ok(out)
    }

    fn changepoints(&self) -> &[Changepoint] {
        &self.changepoints
    }

    fn seasonality_profiles(&self) -> Vec<SeasonalProfile> {
        let mut out = Vec::new();

        if self.layout.weekly_order > 0 {
            // 2024-01-01 is a Monday, so offset 0 is Monday.
            let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);
            let points = (0..7)
                .map(|offset| {
                    let c = self.components(monday + Duration::days(offset));
                    (offset as f64, c.weekly * self.y_scale)
                })
                .collect();
            out.push(SeasonalProfile {
                kind: SeasonalityKind::Weekly,
                points,
            });
        }

        if self.layout.yearly_order > 0 {
            let jan1 = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN);
            let points = (0..365)
                .map(|offset| {
                    let c = self.components(jan1 + Duration::days(offset));
                    ((offset + 1) as f64, c.yearly * self.y_scale)
                })
                .collect();
            out.push(SeasonalProfile {
                kind: SeasonalityKind::Yearly,
                points,
            });
        }

        out
    }
}

/// Changepoints whose slope change clears `CHANGEPOINT_THRESHOLD`.
pub fn significant_changepoints(changepoints: &[Changepoint]) -> Vec<Changepoint> {
    changepoints
        .iter()
        .filter(|c| c.delta.abs() >= CHANGEPOINT_THRESHOLD)
        .copied()
        .collect()
}

/// Indices of candidate changepoints in an `n`-point history.
///
/// Candidates sit at evenly spaced indices in the first `range` share of the
/// history, excluding the first point. Short histories get fewer candidates.
pub fn changepoint_indices(n: usize, max_changepoints: usize, range: f64) -> Vec<usize> {
    let hist = (n as f64 * range).floor() as usize;
    let k = max_changepoints.min(hist.saturating_sub(1));
    if k == 0 {
        return Vec::new();
    }
    let last = (hist - 1) as f64;
    (1..=k)
        .map(|i| (last * i as f64 / k as f64).round() as usize)
        .collect()
}

/// Two-sided standard normal multiplier covering `interval_width` of the mass.
pub fn interval_multiplier(interval_width: f64) -> Result<f64, AppError> {
    if !(interval_width > 0.0 && interval_width < 1.0) {
        return Err(AppError::Config(format!(
            "interval width must be in (0, 1), got {interval_width}."
        )));
    }
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AppError::Config(format!("Normal distribution error: {e}")))?;
    Ok(normal.inverse_cdf(0.5 + interval_width / 2.0))
}

fn resolve_order(mode: SeasonalityMode, auto_enabled: bool, order: usize) -> usize {
    match mode {
        SeasonalityMode::On => order,
        SeasonalityMode::Off => 0,
        SeasonalityMode::Auto if auto_enabled => order,
        SeasonalityMode::Auto => 0,
    }
}
