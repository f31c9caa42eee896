//! Straight line `f(x) = m·x + b`.

use crate::domain::UsedObservations;
use crate::error::FitError;
use crate::math::weighted_mean;
use crate::models::FitModel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Line;

static PARAMS: [&str; 2] = ["m", "b"];

impl FitModel for Line {
    fn name(&self) -> &'static str {
        "line"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * x + params[1]
    }

    /// Slope through the edge points, intercept through the weighted centroid.
    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        used.require_x_spread("line slope guess")?;
        let Some(((x0, y0), (x1, y1))) = used.edge_points() else {
            return Err(crate::models::model::degenerate("no observations"));
        };
        let m = (y1 - y0) / (x1 - x0);

        let xbar = weighted_mean(&used.x, &used.w).unwrap_or(0.5 * (x0 + x1));
        let ybar = weighted_mean(&used.y, &used.w).unwrap_or(0.5 * (y0 + y1));
        Ok(vec![m, ybar - m * xbar])
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{m}} \cdot x + {{b}}"
    }
}
