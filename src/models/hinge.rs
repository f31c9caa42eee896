//! Piecewise-linear models with a fitted breakpoint.
//!
//! The breakpoint guess is a change-point scan: the used observations are
//! ordered by x and split at every admissible position; each side is fitted
//! with its own segment and the split with the lowest weighted SSE wins.

use crate::domain::UsedObservations;
use crate::error::FitError;
use crate::math::{LineFit, weighted_line, weighted_mean};
use crate::models::FitModel;
use crate::models::model::degenerate;

/// Rising (or falling) line that saturates into a plateau:
/// `f(x) = y_h + m·(x - x_h)` for `x < x_h`, otherwise `y_h`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HingeSaturation;

static SAT_PARAMS: [&str; 3] = ["xh", "yh", "m"];
static SAT_TEX: [&str; 3] = ["x_h", "y_h", "m"];

impl FitModel for HingeSaturation {
    fn name(&self) -> &'static str {
        "hinge_saturation"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &SAT_PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        let (xh, yh, m) = (params[0], params[1], params[2]);
        if x < xh { yh + m * (x - xh) } else { yh }
    }

    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        used.require_x_spread("hinge breakpoint scan")?;
        let sorted = Sorted::from(used);

        let best = sorted.scan(2, 1, |left, right| {
            let line = weighted_line(left.x, left.y, left.w)?;
            let plateau = weighted_mean(right.y, right.w)?;
            let sse = line.sse + sse_about(right.y, right.w, plateau);
            // Where the left segment meets the plateau, kept inside the split gap.
            let xh = if line.slope != 0.0 {
                ((plateau - line.intercept) / line.slope).clamp(left.last_x(), right.first_x())
            } else {
                0.5 * (left.last_x() + right.first_x())
            };
            Some((sse, vec![xh, plateau, line.slope]))
        });

        best.ok_or_else(|| degenerate("hinge breakpoint scan found no admissible split"))
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = \begin{cases} {{yh}} + {{m}} (x - {{xh}}) & x < {{xh}} \\ {{yh}} & x \geq {{xh}} \end{cases}"
    }

    fn tex_arg_names(&self) -> &'static [&'static str] {
        &SAT_TEX
    }
}

/// Continuous two-segment line joined at `(x_h, y_h)`:
/// slope `m1` left of the breakpoint, `m2` right of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TwoLine;

static TWO_PARAMS: [&str; 4] = ["xh", "yh", "m1", "m2"];
static TWO_TEX: [&str; 4] = ["x_h", "y_h", "m_1", "m_2"];

impl FitModel for TwoLine {
    fn name(&self) -> &'static str {
        "two_line"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &TWO_PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        let (xh, yh, m1, m2) = (params[0], params[1], params[2], params[3]);
        let slope = if x < xh { m1 } else { m2 };
        yh + slope * (x - xh)
    }

    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        let (xlo, xhi) = used.require_x_spread("two-line breakpoint scan")?;
        let sorted = Sorted::from(used);

        let best = sorted.scan(2, 2, |left, right| {
            let l = weighted_line(left.x, left.y, left.w)?;
            let r = weighted_line(right.x, right.y, right.w)?;
            let xh = intersection(&l, &r)
                .filter(|x| (xlo..=xhi).contains(x))
                .unwrap_or(0.5 * (left.last_x() + right.first_x()));
            let yh = 0.5 * (l.at(xh) + r.at(xh));
            Some((l.sse + r.sse, vec![xh, yh, l.slope, r.slope]))
        });

        best.ok_or_else(|| degenerate("two-line breakpoint scan found no admissible split"))
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{yh}} + \begin{cases} {{m1}} (x - {{xh}}) & x < {{xh}} \\ {{m2}} (x - {{xh}}) & x \geq {{xh}} \end{cases}"
    }

    fn tex_arg_names(&self) -> &'static [&'static str] {
        &TWO_TEX
    }
}

fn intersection(a: &LineFit, b: &LineFit) -> Option<f64> {
    let dm = a.slope - b.slope;
    if dm.abs() <= f64::EPSILON * a.slope.abs().max(b.slope.abs()) {
        return None;
    }
    Some((b.intercept - a.intercept) / dm)
}

fn sse_about(y: &[f64], w: &[f64], level: f64) -> f64 {
    y.iter().zip(w.iter()).map(|(v, wi)| wi * (v - level) * (v - level)).sum()
}

/// Used observations sorted by x.
struct Sorted {
    x: Vec<f64>,
    y: Vec<f64>,
    w: Vec<f64>,
}

/// One side of a split.
struct Side<'a> {
    x: &'a [f64],
    y: &'a [f64],
    w: &'a [f64],
}

impl Side<'_> {
    fn first_x(&self) -> f64 {
        self.x[0]
    }

    fn last_x(&self) -> f64 {
        self.x[self.x.len() - 1]
    }
}

impl From<&UsedObservations> for Sorted {
    fn from(used: &UsedObservations) -> Self {
        let order = used.order_by_x();
        Self {
            x: order.iter().map(|&i| used.x[i]).collect(),
            y: order.iter().map(|&i| used.y[i]).collect(),
            w: order.iter().map(|&i| used.w[i]).collect(),
        }
    }
}

impl Sorted {
    /// Try every split with at least `min_left` / `min_right` points per side,
    /// skipping splits between equal x values. Returns the lowest-SSE guess
    /// (earliest split on ties).
    fn scan<F>(&self, min_left: usize, min_right: usize, score: F) -> Option<Vec<f64>>
    where
        F: Fn(Side<'_>, Side<'_>) -> Option<(f64, Vec<f64>)>,
    {
        let n = self.x.len();
        let mut best: Option<(f64, Vec<f64>)> = None;
        if n < min_left + min_right {
            return None;
        }

        for k in min_left..=(n - min_right) {
            if self.x[k - 1] == self.x[k] {
                continue;
            }
            let left = Side {
                x: &self.x[..k],
                y: &self.y[..k],
                w: &self.w[..k],
            };
            let right = Side {
                x: &self.x[k..],
                y: &self.y[k..],
                w: &self.w[k..],
            };
            let Some((sse, guess)) = score(left, right) else {
                continue;
            };
            if !sse.is_finite() || guess.iter().any(|v| !v.is_finite()) {
                continue;
            }
            match &best {
                Some((best_sse, _)) if *best_sse <= sse => {}
                _ => best = Some((sse, guess)),
            }
        }

        best.map(|(_, guess)| guess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(model: &dyn FitModel, params: &[f64]) -> UsedObservations {
        let x: Vec<f64> = (0..21).map(|i| i as f64 * 0.5).collect();
        let y = model.evaluate(&x, params);
        UsedObservations { w: vec![1.0; x.len()], x, y }
    }

    #[test]
    fn saturation_shape() {
        let p = [4.0, 10.0, 2.0];
        assert!((HingeSaturation.function(3.0, &p) - 8.0).abs() < 1e-12);
        assert!((HingeSaturation.function(7.0, &p) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn saturation_scan_finds_breakpoint() {
        let used = sampled(&HingeSaturation, &[4.0, 10.0, 2.0]);
        let p0 = HingeSaturation.p0(&used).unwrap();
        assert!((p0[0] - 4.0).abs() <= 0.5, "breakpoint guess {p0:?}");
        assert!((p0[1] - 10.0).abs() < 1e-6);
        assert!((p0[2] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn two_line_scan_finds_breakpoint() {
        let used = sampled(&TwoLine, &[6.0, 3.0, 1.5, -0.5]);
        let p0 = TwoLine.p0(&used).unwrap();
        assert!((p0[0] - 6.0).abs() < 1e-6, "breakpoint guess {p0:?}");
        assert!((p0[1] - 3.0).abs() < 1e-6);
        assert!((p0[2] - 1.5).abs() < 1e-6);
        assert!((p0[3] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn too_few_points_for_any_split() {
        let used = UsedObservations {
            x: vec![0.0, 1.0, 2.0],
            y: vec![0.0, 1.0, 0.0],
            w: vec![1.0; 3],
        };
        assert!(matches!(TwoLine.p0(&used), Err(FitError::FitFailed(_))));
    }
}
