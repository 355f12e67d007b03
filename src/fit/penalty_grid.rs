//! Penalty grid generation.
//!
//! The changepoint penalty is chosen by a deterministic search over a
//! log-spaced grid rather than by nonlinear optimisation:
//! - no local minima
//! - identical inputs give identical fits
//! - each candidate is a single linear solve, so a modest grid is cheap

use crate::error::AppError;

/// Smallest penalty in the default grid (almost free changepoints).
pub const PENALTY_MIN: f64 = 1e-3;
/// Largest penalty in the default grid (trend close to a straight line).
pub const PENALTY_MAX: f64 = 1e3;
/// Number of grid points between the bounds.
pub const PENALTY_STEPS: usize = 13;

/// Generate `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && max > min) {
        return Err(AppError::Config(format!(
            "Invalid penalty range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    if steps < 2 {
        return Err(AppError::Config("Penalty grid steps must be >= 2.".to_string()));
    }

    let ln_min = min.ln();
    let ln_max = max.ln();
    let step = (ln_max - ln_min) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_min + step * i as f64).exp());
    }
    Ok(out)
}

/// The grid searched when no fixed penalty is configured.
pub fn default_penalty_grid() -> Result<Vec<f64>, AppError> {
    log_space(PENALTY_MIN, PENALTY_MAX, PENALTY_STEPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_space_includes_endpoints() {
        let v = log_space(0.1, 10.0, 5).unwrap();
        assert!((v[0] - 0.1).abs() < 1e-12);
        assert!((v[v.len() - 1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn log_space_rejects_bad_ranges() {
        assert!(log_space(0.0, 1.0, 5).is_err());
        assert!(log_space(2.0, 1.0, 5).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
    }

    #[test]
    fn default_grid_is_ascending() {
        let grid = default_penalty_grid().unwrap();
        assert_eq!(grid.len(), PENALTY_STEPS);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }
}
