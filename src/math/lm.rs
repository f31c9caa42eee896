//! Bounded Levenberg–Marquardt for small weighted least-squares problems.
//!
//! The caller supplies a closure filling the *weighted* residual vector
//! `sqrt(w_i) * (y_i - f(x_i; p))`, so the solver minimises
//!
//! ```text
//! cost(p) = ½ Σ w_i (y_i - f(x_i; p))^2
//! ```
//!
//! Implementation notes:
//! - forward-difference Jacobian, stepping inward at an upper bound
//! - Marquardt scaling `(JᵀJ + μ·diag(JᵀJ)) δ = -Jᵀr`, with Nielsen's damping update
//! - bounds are handled by projecting every trial point into the box
//! - termination on ftol / xtol / gtol; exhausting `max_nfev` is a failure
//!
//! [`SolverOptions`] is the only knob set accepted here. Batch execution
//! settings live in a different type and never reach this module.

use nalgebra::{DMatrix, DVector};

use crate::domain::Bounds;
use crate::error::FailureReason;
use crate::math::solve_least_squares;

/// Numerical controls for a single least-squares solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Residual-evaluation budget, Jacobian columns included.
    /// `None` means `200 * (n_params + 1)`.
    pub max_nfev: Option<usize>,
    /// Relative reduction of the cost below which the solve has converged.
    pub ftol: f64,
    /// Relative step size below which the solve has converged.
    pub xtol: f64,
    /// Gradient max-norm below which the solve has converged.
    pub gtol: f64,
    /// Relative finite-difference step for the Jacobian.
    pub diff_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_nfev: None,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            diff_step: f64::EPSILON.sqrt(),
        }
    }
}

/// Which criterion stopped a successful solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ExactFit,
    Ftol,
    Xtol,
    Gtol,
}

/// Converged solver state.
#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: Vec<f64>,
    /// Weighted residuals at `params`.
    pub residuals: Vec<f64>,
    /// Jacobian of the weighted residuals at `params` (m × n).
    pub jacobian: DMatrix<f64>,
    pub cost: f64,
    pub nfev: usize,
    pub termination: Termination,
}

/// Minimise `½‖r(p)‖²` starting from `p0`.
///
/// `m` is the residual count. `p0` is projected into `bounds` first.
pub fn minimize<F>(
    residual: F,
    m: usize,
    p0: &[f64],
    bounds: Option<&Bounds>,
    opts: &SolverOptions,
) -> Result<LmReport, FailureReason>
where
    F: Fn(&[f64], &mut [f64]),
{
    let n = p0.len();
    let max_nfev = opts.max_nfev.unwrap_or(200 * (n + 1));

    let mut p = p0.to_vec();
    if let Some(b) = bounds {
        b.project(&mut p);
    }

    let mut r = vec![0.0; m];
    residual(&p, &mut r);
    let mut nfev = 1;
    if !all_finite(&r) {
        return Err(FailureReason::NonFiniteResidual);
    }
    let mut cost = half_sq(&r);
    let mut jac = jacobian(&residual, &p, &r, bounds, opts.diff_step, &mut nfev)?;

    let mut mu: Option<f64> = None;
    let mut nu = 2.0;
    let mut r_trial = vec![0.0; m];

    loop {
        if cost == 0.0 {
            return Ok(finish(p, r, jac, cost, nfev, Termination::ExactFit));
        }

        let jt = jac.transpose();
        let a = &jt * &jac;
        let g = &jt * DVector::from_column_slice(&r);
        if g.amax() <= opts.gtol {
            return Ok(finish(p, r, jac, cost, nfev, Termination::Gtol));
        }

        let max_diag = (0..n).map(|j| a[(j, j)]).fold(0.0_f64, f64::max);
        let floor = (max_diag * f64::EPSILON).max(f64::MIN_POSITIVE);
        let scale: Vec<f64> = (0..n).map(|j| a[(j, j)].max(floor)).collect();
        let mut damping = *mu.get_or_insert(1e-3 * max_diag.max(floor));

        // Inner loop: raise the damping until a step reduces the cost.
        loop {
            if nfev >= max_nfev {
                return Err(FailureReason::MaxEvaluations { nfev });
            }

            let mut lhs = a.clone();
            for j in 0..n {
                lhs[(j, j)] += damping * scale[j];
            }
            let Some(delta) = solve_damped(lhs, &(-g.clone())) else {
                damping *= nu;
                nu *= 2.0;
                continue;
            };

            let mut p_trial: Vec<f64> = p.iter().zip(delta.iter()).map(|(pi, di)| pi + di).collect();
            if let Some(b) = bounds {
                b.project(&mut p_trial);
            }
            let h = DVector::from_iterator(n, p_trial.iter().zip(p.iter()).map(|(t, c)| t - c));
            let p_norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
            if h.norm() <= opts.xtol * (p_norm + opts.xtol) {
                return Ok(finish(p, r, jac, cost, nfev, Termination::Xtol));
            }

            residual(&p_trial, &mut r_trial);
            nfev += 1;
            let cost_trial = if all_finite(&r_trial) {
                half_sq(&r_trial)
            } else {
                f64::INFINITY
            };

            let predicted = -g.dot(&h) - 0.5 * h.dot(&(&a * &h));
            let actual = cost - cost_trial;
            if actual > 0.0 && predicted > 0.0 {
                let rho = actual / predicted;
                let converged = actual <= opts.ftol * cost;

                p = p_trial;
                std::mem::swap(&mut r, &mut r_trial);
                cost = cost_trial;
                damping *= (1.0 / 3.0_f64).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;
                mu = Some(damping);
                jac = jacobian(&residual, &p, &r, bounds, opts.diff_step, &mut nfev)?;

                if converged {
                    return Ok(finish(p, r, jac, cost, nfev, Termination::Ftol));
                }
                break;
            }

            damping *= nu;
            nu *= 2.0;
            if !damping.is_finite() {
                return Err(FailureReason::MaxEvaluations { nfev });
            }
        }
    }
}

/// Covariance `(JᵀJ)⁻¹` from the Jacobian of the weighted residuals.
///
/// Uses the SVD of `J`; a rank-deficient Jacobian is reported as
/// [`FailureReason::SingularJacobian`].
pub fn covariance(jac: &DMatrix<f64>) -> Result<DMatrix<f64>, FailureReason> {
    let (m, n) = jac.shape();
    let svd = jac.clone().svd(false, true);
    let v_t = svd.v_t.ok_or(FailureReason::SingularJacobian { rank: 0, n_params: n })?;

    let s_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    let tol = f64::EPSILON * m.max(n) as f64 * s_max;
    let rank = svd.singular_values.iter().filter(|&&s| s > tol).count();
    if rank < n || !(s_max > 0.0) {
        return Err(FailureReason::SingularJacobian { rank, n_params: n });
    }

    let inv_sq = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / (s * s)));
    Ok(v_t.transpose() * inv_sq * v_t)
}

fn jacobian<F>(
    residual: &F,
    p: &[f64],
    r: &[f64],
    bounds: Option<&Bounds>,
    diff_step: f64,
    nfev: &mut usize,
) -> Result<DMatrix<f64>, FailureReason>
where
    F: Fn(&[f64], &mut [f64]),
{
    let m = r.len();
    let n = p.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut shifted = p.to_vec();
    let mut r_shift = vec![0.0; m];

    for j in 0..n {
        let mut h = diff_step * p[j].abs().max(1.0);
        if let Some(b) = bounds {
            if p[j] + h > b.upper[j] {
                h = -h;
            }
        }
        shifted[j] = p[j] + h;
        residual(&shifted, &mut r_shift);
        *nfev += 1;
        shifted[j] = p[j];

        // Actual step after rounding, so the quotient is exact in h.
        let h_eff = (p[j] + h) - p[j];
        for i in 0..m {
            jac[(i, j)] = (r_shift[i] - r[i]) / h_eff;
        }
    }

    if jac.iter().all(|v| v.is_finite()) {
        Ok(jac)
    } else {
        Err(FailureReason::NonFiniteResidual)
    }
}

fn solve_damped(lhs: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    match lhs.clone().cholesky() {
        Some(chol) => {
            let delta = chol.solve(rhs);
            if delta.iter().all(|v| v.is_finite()) {
                Some(delta)
            } else {
                solve_least_squares(&lhs, rhs)
            }
        }
        None => solve_least_squares(&lhs, rhs),
    }
}

fn finish(
    params: Vec<f64>,
    residuals: Vec<f64>,
    jacobian: DMatrix<f64>,
    cost: f64,
    nfev: usize,
    termination: Termination,
) -> LmReport {
    LmReport {
        params,
        residuals,
        jacobian,
        cost,
        nfev,
        termination,
    }
}

fn half_sq(r: &[f64]) -> f64 {
    0.5 * r.iter().map(|v| v * v).sum::<f64>()
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}
