//! Raw observations and the derived used subset.
//!
//! The raw `(x, y, w)` arrays are kept exactly as supplied so residuals can be
//! evaluated over every original point. The used subset is gathered once at
//! construction: a point is used when `x`, `y`, `w` are finite, `w >= 0`, and
//! it lies inside the configured [`ObservationLimits`].

use crate::domain::ObservationLimits;
use crate::error::FitError;

/// The full observation set supplied by the caller.
#[derive(Debug, Clone)]
pub struct Observations {
    x: Vec<f64>,
    y: Vec<f64>,
    w: Vec<f64>,
    mask: Vec<bool>,
    used: UsedObservations,
}

impl Observations {
    /// Validate lengths and derive the used subset.
    ///
    /// `w` defaults to uniform ones.
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        w: Option<Vec<f64>>,
        limits: &ObservationLimits,
    ) -> Result<Self, FitError> {
        let w = w.unwrap_or_else(|| vec![1.0; x.len()]);
        if x.len() != y.len() || x.len() != w.len() {
            return Err(FitError::InvalidObservations(format!(
                "x, y, w must have equal length (got {}, {}, {})",
                x.len(),
                y.len(),
                w.len()
            )));
        }

        let mask: Vec<bool> = (0..x.len())
            .map(|i| {
                let (xi, yi, wi) = (x[i], y[i], w[i]);
                xi.is_finite() && yi.is_finite() && wi.is_finite() && wi >= 0.0 && limits.contains(xi, yi, wi)
            })
            .collect();

        let mut used = UsedObservations::default();
        for (i, _) in mask.iter().enumerate().filter(|(_, keep)| **keep) {
            used.x.push(x[i]);
            used.y.push(y[i]);
            used.w.push(w[i]);
        }

        Ok(Self { x, y, w, mask, used })
    }

    /// Number of originally supplied observations.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn n_used(&self) -> usize {
        self.used.len()
    }

    pub fn raw_x(&self) -> &[f64] {
        &self.x
    }

    pub fn raw_y(&self) -> &[f64] {
        &self.y
    }

    pub fn raw_w(&self) -> &[f64] {
        &self.w
    }

    /// `true` at indices that entered the fit.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn used(&self) -> &UsedObservations {
        &self.used
    }
}

/// Observations that survived filtering, in original order.
#[derive(Debug, Clone, Default)]
pub struct UsedObservations {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub w: Vec<f64>,
}

impl UsedObservations {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `(min, max)` of x, or `None` when empty.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        min_max(&self.x)
    }

    /// `(min, max)` of y, or `None` when empty.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        min_max(&self.y)
    }

    /// Index of the largest y (first one on ties).
    pub fn argmax_y(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &v) in self.y.iter().enumerate() {
            match best {
                Some(b) if self.y[b] >= v => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Indices ordered by ascending x (stable on ties).
    pub fn order_by_x(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.len()).collect();
        idx.sort_by(|&a, &b| self.x[a].partial_cmp(&self.x[b]).unwrap_or(std::cmp::Ordering::Equal));
        idx
    }

    /// The observations at the smallest and largest x.
    pub fn edge_points(&self) -> Option<((f64, f64), (f64, f64))> {
        let order = self.order_by_x();
        let first = *order.first()?;
        let last = *order.last()?;
        Some(((self.x[first], self.y[first]), (self.x[last], self.y[last])))
    }

    /// Fail with `DegenerateData` unless y spans a non-zero range.
    pub fn require_y_spread(&self, what: &str) -> Result<(f64, f64), FitError> {
        match self.y_range() {
            Some((lo, hi)) if hi > lo => Ok((lo, hi)),
            _ => Err(FitError::FitFailed(crate::error::FailureReason::DegenerateData(format!(
                "{what} requires y to vary across the used observations"
            )))),
        }
    }

    /// Fail with `DegenerateData` unless x spans a non-zero range.
    pub fn require_x_spread(&self, what: &str) -> Result<(f64, f64), FitError> {
        match self.x_range() {
            Some((lo, hi)) if hi > lo => Ok((lo, hi)),
            _ => Err(FitError::FitFailed(crate::error::FailureReason::DegenerateData(format!(
                "{what} requires x to vary across the used observations"
            )))),
        }
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut it = values.iter().copied();
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_points_are_excluded_but_kept_raw() {
        let x = vec![0.0, 1.0, f64::NAN, 3.0, 4.0];
        let y = vec![1.0, f64::INFINITY, 2.0, 3.0, 4.0];
        let obs = Observations::new(x, y, None, &ObservationLimits::default()).unwrap();
        assert_eq!(obs.len(), 5);
        assert_eq!(obs.n_used(), 3);
        assert_eq!(obs.mask(), &[true, false, false, true, true]);
        assert_eq!(obs.used().x, vec![0.0, 3.0, 4.0]);
        assert!(obs.raw_x()[2].is_nan());
    }

    #[test]
    fn negative_and_nan_weights_are_excluded() {
        let obs = Observations::new(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 2.0],
            Some(vec![1.0, -1.0, f64::NAN]),
            &ObservationLimits::default(),
        )
        .unwrap();
        assert_eq!(obs.n_used(), 1);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = Observations::new(vec![0.0, 1.0], vec![0.0], None, &ObservationLimits::default());
        assert!(matches!(err, Err(FitError::InvalidObservations(_))));
    }

    #[test]
    fn limits_reduce_used_subset() {
        let limits = ObservationLimits {
            xmax: Some(1.5),
            ..Default::default()
        };
        let obs = Observations::new(vec![0.0, 1.0, 2.0], vec![5.0, 6.0, 7.0], None, &limits).unwrap();
        assert_eq!(obs.n_used(), 2);
        assert_eq!(obs.len(), 3);
    }

    #[test]
    fn used_helpers() {
        let used = UsedObservations {
            x: vec![3.0, 1.0, 2.0],
            y: vec![0.5, 4.0, 4.0],
            w: vec![1.0; 3],
        };
        assert_eq!(used.argmax_y(), Some(1));
        assert_eq!(used.order_by_x(), vec![1, 2, 0]);
        assert_eq!(used.edge_points(), Some(((1.0, 4.0), (3.0, 0.5))));
        assert!(used.require_y_spread("test").is_ok());

        let flat = UsedObservations {
            x: vec![1.0, 2.0],
            y: vec![3.0, 3.0],
            w: vec![1.0; 2],
        };
        assert!(matches!(flat.require_y_spread("test"), Err(FitError::FitFailed(_))));
    }
}
