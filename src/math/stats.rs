//! Descriptive and goodness-of-fit statistics.

/// Weighted mean. `None` when the weights sum to zero or less.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    let sw: f64 = weights.iter().sum();
    if !(sw > 0.0) {
        return None;
    }
    let s: f64 = values.iter().zip(weights.iter()).map(|(v, w)| v * w).sum();
    Some(s / sw)
}

/// Weighted mean and standard deviation of `values` under `weights`.
pub fn weighted_moments(values: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    let mean = weighted_mean(values, weights)?;
    let sw: f64 = weights.iter().sum();
    let var: f64 = values
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| w * (v - mean) * (v - mean))
        .sum::<f64>()
        / sw;
    Some((mean, var.max(0.0).sqrt()))
}

/// `Σ w r²`.
pub fn chisq(residuals: &[f64], weights: &[f64]) -> f64 {
    residuals.iter().zip(weights.iter()).map(|(r, w)| w * r * r).sum()
}

/// Weighted coefficient of determination `1 - SS_res / SS_tot`.
///
/// NaN when y has no weighted spread.
pub fn r_squared(y: &[f64], residuals: &[f64], weights: &[f64]) -> f64 {
    let Some(ybar) = weighted_mean(y, weights) else {
        return f64::NAN;
    };
    let ss_tot: f64 = y
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| w * (v - ybar) * (v - ybar))
        .sum();
    if !(ss_tot > 0.0) {
        return f64::NAN;
    }
    1.0 - chisq(residuals, weights) / ss_tot
}

/// `n` evenly spaced points on `[lo, hi]` (inclusive).
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n as f64 - 1.0);
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moments_of_symmetric_weights() {
        let (mean, std) = weighted_moments(&[1.0, 2.0, 3.0], &[1.0, 2.0, 1.0]).unwrap();
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((std - 0.5f64.sqrt()).abs() < 1e-12);
        assert!(weighted_mean(&[1.0], &[0.0]).is_none());
    }

    #[test]
    fn r_squared_perfect_and_flat() {
        let y = [1.0, 2.0, 3.0];
        assert!((r_squared(&y, &[0.0; 3], &[1.0; 3]) - 1.0).abs() < 1e-12);
        assert!(r_squared(&[2.0; 3], &[0.0; 3], &[1.0; 3]).is_nan());
    }

    #[test]
    fn linspace_endpoints() {
        let v = linspace(0.0, 1.0, 5);
        assert_eq!(v.len(), 5);
        assert!((v[4] - 1.0).abs() < 1e-12);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
    }
}
