//! Basis functions for the additive model.
//!
//! - Fourier terms: `sin(2π k t / P)`, `cos(2π k t / P)` for `k = 1..=order`,
//!   evaluated on absolute days since the Unix epoch so the phase does not
//!   depend on where the history starts.
//! - Hinge terms: `(t - s)+`, the slope change introduced by a changepoint at `s`.

use std::f64::consts::PI;

use chrono::NaiveDate;

/// Days since 1970-01-01 (may be negative).
pub fn epoch_days(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

/// Fill `out` with `2 * order` Fourier terms, interleaved as `[sin1, cos1, sin2, cos2, ...]`.
///
/// # Panics
/// Panics if `out.len() < 2 * order`.
pub fn fill_fourier(days: f64, period: f64, order: usize, out: &mut [f64]) {
    for k in 0..order {
        let x = 2.0 * PI * (k as f64 + 1.0) * days / period;
        out[2 * k] = x.sin();
        out[2 * k + 1] = x.cos();
    }
}

/// `(t - s)+`.
pub fn hinge(t: f64, s: f64) -> f64 {
    (t - s).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourier_terms_repeat_each_period() {
        let mut a = [0.0; 6];
        let mut b = [0.0; 6];
        fill_fourier(3.0, 7.0, 3, &mut a);
        fill_fourier(10.0, 7.0, 3, &mut b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn fourier_first_pair_is_unit_circle() {
        let mut out = [0.0; 2];
        fill_fourier(100.0, 365.25, 1, &mut out);
        assert!((out[0] * out[0] + out[1] * out[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hinge_is_zero_before_changepoint() {
        assert_eq!(hinge(0.2, 0.5), 0.0);
        assert!((hinge(0.75, 0.5) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn epoch_days_counts_from_1970() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 11).unwrap();
        assert_eq!(epoch_days(d), 10.0);
    }
}
