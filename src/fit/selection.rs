//! Penalty selection by generalized cross-validation.
//!
//! For each candidate penalty λ the design is solved once and scored with:
//!
//! ```text
//! GCV(λ) = n * SSE / (n - df)^2
//! ```
//!
//! where `df` is the effective number of parameters. Candidates are evaluated
//! in parallel; the minimum GCV wins and ties go to the earlier grid entry.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::error::AppError;
use crate::math::{solve_penalized, PenalizedFit};

/// The chosen penalty and its fit.
#[derive(Debug, Clone)]
pub struct PenaltySelection {
    pub penalty: f64,
    pub fit: PenalizedFit,
    pub gcv: f64,
    /// How many grid entries produced a usable fit.
    pub evaluated: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    idx: usize,
    penalty: f64,
    fit: PenalizedFit,
    gcv: f64,
}

/// Generalized cross-validation score. Infinite when `df` leaves no residual freedom.
pub fn gcv_score(n: usize, sse: f64, dof: f64) -> f64 {
    let n = n as f64;
    let denom = n - dof;
    if denom <= 1e-9 {
        return f64::INFINITY;
    }
    n * sse / (denom * denom)
}

/// Fit every penalty in `grid` and keep the one with the lowest GCV.
///
/// `penalty_for(λ)` expands a scalar penalty into per-column weights.
pub fn select_penalty<F>(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    grid: &[f64],
    penalty_for: F,
) -> Result<PenaltySelection, AppError>
where
    F: Fn(f64) -> Vec<f64> + Sync,
{
    if grid.is_empty() {
        return Err(AppError::Config("Penalty grid is empty.".to_string()));
    }
    let n = y.len();

    let candidates: Vec<Candidate> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(idx, &penalty)| {
            let weights = penalty_for(penalty);
            solve_penalized(x, y, &weights).map(|fit| Candidate {
                idx,
                penalty,
                gcv: gcv_score(n, fit.sse, fit.dof),
                fit,
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::ModelFit(
            "No penalty candidate produced a solvable system.".to_string(),
        ));
    }

    // Deterministic selection: pick the minimum GCV; break ties by grid index.
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.gcv < best.gcv || (c.gcv == best.gcv && c.idx < best.idx) {
            best = c;
        }
    }

    Ok(PenaltySelection {
        penalty: best.penalty,
        fit: best.fit.clone(),
        gcv: best.gcv,
        evaluated: candidates.len(),
    })
}
