//! The capability set every fit model supplies.
//!
//! A model is a pure description: how to evaluate `f(x; p)`, how to guess `p`
//! from the observations that will be fitted, and how to typeset `f`. The
//! fitting lifecycle in [`crate::fit::FitFunction`] assumes nothing else.
//!
//! TeX templates reference parameters as `{{name}}` placeholders, where `name`
//! is an entry of [`FitModel::param_names`]. The label formatter substitutes
//! either the TeX symbol or the fitted value.

use crate::domain::UsedObservations;
use crate::error::{FailureReason, FitError};

pub trait FitModel {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Parameter names in solver order.
    fn param_names(&self) -> &'static [&'static str];

    /// Evaluate the model at a single abscissa.
    fn function(&self, x: f64, params: &[f64]) -> f64;

    /// Initial guess derived from the used observations.
    ///
    /// Returns `FitFailed(DegenerateData)` when the data cannot support a guess.
    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError>;

    /// LaTeX template of the model form.
    fn tex_function(&self) -> &'static str;

    /// TeX symbols for the parameters, aligned with `param_names`.
    fn tex_arg_names(&self) -> &'static [&'static str] {
        self.param_names()
    }

    /// Indices of parameters whose sign does not change `f`. Their fitted
    /// values are reported as non-negative.
    fn even_params(&self) -> &'static [usize] {
        &[]
    }

    fn n_params(&self) -> usize {
        self.param_names().len()
    }

    /// Vectorized evaluation.
    fn evaluate(&self, x: &[f64], params: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.function(xi, params)).collect()
    }
}

pub(crate) fn degenerate(message: impl Into<String>) -> FitError {
    FitError::FitFailed(FailureReason::DegenerateData(message.into()))
}

/// Used observations with positive x and/or y, as `(x, y, w)` columns.
pub(crate) fn positive_subset(used: &UsedObservations, need_x: bool, need_y: bool) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut out = (Vec::new(), Vec::new(), Vec::new());
    for i in 0..used.len() {
        let (x, y, w) = (used.x[i], used.y[i], used.w[i]);
        if (!need_x || x > 0.0) && (!need_y || y > 0.0) {
            out.0.push(x);
            out.1.push(y);
            out.2.push(w);
        }
    }
    out
}

/// Weights for moment estimates: observation weight times height above the floor.
pub(crate) fn height_weights(used: &UsedObservations, floor: f64) -> Vec<f64> {
    used.y
        .iter()
        .zip(used.w.iter())
        .map(|(&y, &w)| (y - floor).max(0.0) * w)
        .collect()
}
