//! Exponential families.
//!
//! Guesses come from a weighted straight-line fit of `ln(y - d)` against `x`,
//! where `d` is the offset (zero for the plain exponential).

use crate::domain::UsedObservations;
use crate::error::FitError;
use crate::math::weighted_line;
use crate::models::FitModel;
use crate::models::model::{degenerate, positive_subset};

/// `f(x) = A·exp(-c·x)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exponential;

static EXP_PARAMS: [&str; 2] = ["c", "A"];

impl FitModel for Exponential {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &EXP_PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        params[1] * (-params[0] * x).exp()
    }

    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        let (x, y, w) = positive_subset(used, false, true);
        let ln_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
        let Some(fit) = weighted_line(&x, &ln_y, &w) else {
            return Err(degenerate(
                "exponential guess needs two positive y values at distinct x",
            ));
        };
        Ok(vec![-fit.slope, fit.intercept.exp()])
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{A}} \cdot e^{-{{c}} x}"
    }
}

/// `f(x) = A·exp(-c·x) + d`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExponentialPlusC;

static EXPC_PARAMS: [&str; 3] = ["c", "A", "d"];

impl FitModel for ExponentialPlusC {
    fn name(&self) -> &'static str {
        "exponential_plus_c"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &EXPC_PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        params[1] * (-params[0] * x).exp() + params[2]
    }

    /// The offset starts one range-per-point below the smallest y so that every
    /// shifted value is positive.
    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        let (ylo, yhi) = used.require_y_spread("exponential offset guess")?;
        let d = ylo - (yhi - ylo) / used.len() as f64;
        let ln_y: Vec<f64> = used.y.iter().map(|v| (v - d).ln()).collect();
        let Some(fit) = weighted_line(&used.x, &ln_y, &used.w) else {
            return Err(degenerate("exponential guess requires x to vary"));
        };
        Ok(vec![-fit.slope, fit.intercept.exp(), d])
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{A}} \cdot e^{-{{c}} x} + {{d}}"
    }
}
