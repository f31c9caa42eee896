//! Power law `f(x) = A·x^b`.

use crate::domain::UsedObservations;
use crate::error::FitError;
use crate::math::weighted_line;
use crate::models::FitModel;
use crate::models::model::{degenerate, positive_subset};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerLaw;

static PARAMS: [&str; 2] = ["A", "b"];

impl FitModel for PowerLaw {
    fn name(&self) -> &'static str {
        "power_law"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * x.powf(params[1])
    }

    /// Straight line in log-log space over the positive quadrant.
    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        let (x, y, w) = positive_subset(used, true, true);
        let ln_x: Vec<f64> = x.iter().map(|v| v.ln()).collect();
        let ln_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
        let Some(fit) = weighted_line(&ln_x, &ln_y, &w) else {
            return Err(degenerate(
                "power-law guess needs two observations with positive x and y at distinct x",
            ));
        };
        Ok(vec![fit.intercept.exp(), fit.slope])
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{A}} \cdot x^{{{b}}}"
    }
}
