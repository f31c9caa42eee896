//! Weighted linear least squares.
//!
//! Two small linear problems show up in this crate:
//!
//! ```text
//! minimize Σ w_i (y_i - x_i^T β)^2
//! ```
//!
//! - straight-line fits used by the models' initial guesses (`weighted_line`)
//! - the damped normal equations inside the Levenberg–Marquardt step, when the
//!   Cholesky factorisation is rejected (`solve_least_squares`)
//!
//! Rows are scaled by `sqrt(w_i)` and the ordinary problem is solved with SVD,
//! which copes with tall and nearly collinear systems.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Progressively looser tolerances for nearly singular systems.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Result of a weighted straight-line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// Weighted sum of squared residuals.
    pub sse: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Weighted straight-line fit.
///
/// Returns `None` with fewer than two points, when x does not vary over points
/// with positive weight, or when the solve is not finite.
pub fn weighted_line(x: &[f64], y: &[f64], w: &[f64]) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n || w.len() != n {
        return None;
    }

    let mut xw = DMatrix::<f64>::zeros(n, 2);
    let mut yw = DVector::<f64>::zeros(n);
    for i in 0..n {
        let sw = w[i].max(0.0).sqrt();
        xw[(i, 0)] = sw;
        xw[(i, 1)] = x[i] * sw;
        yw[i] = y[i] * sw;
    }

    let (lo, hi) = x
        .iter()
        .zip(w.iter())
        .filter(|(_, wi)| **wi > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (&xi, _)| (lo.min(xi), hi.max(xi)));
    if !(hi > lo) {
        return None;
    }

    let beta = solve_least_squares(&xw, &yw)?;
    let fit = LineFit {
        slope: beta[1],
        intercept: beta[0],
        sse: 0.0,
    };
    let sse = (0..n)
        .map(|i| {
            let r = y[i] - fit.at(x[i]);
            w[i] * r * r
        })
        .sum();

    Some(LineFit { sse, ..fit })
}
