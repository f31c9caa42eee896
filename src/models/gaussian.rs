//! Peaked profiles: Gaussian and Moyal.
//!
//! Both guesses start from the same statistics of the used subset: the peak
//! height, and the first two moments of x weighted by height above the lowest y.
//! A flat y has no peak to locate, which is reported as degenerate data.

use crate::domain::UsedObservations;
use crate::error::FitError;
use crate::math::weighted_moments;
use crate::models::FitModel;
use crate::models::model::{degenerate, height_weights};

/// `f(x) = A·exp(-½((x-μ)/σ)²)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gaussian;

static GAUSS_PARAMS: [&str; 3] = ["mu", "sigma", "A"];
static GAUSS_TEX: [&str; 3] = [r"\mu", r"\sigma", "A"];

impl FitModel for Gaussian {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &GAUSS_PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        let (mu, sigma, a) = (params[0], params[1], params[2]);
        let z = (x - mu) / sigma;
        a * (-0.5 * z * z).exp()
    }

    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        let (mu, std, peak) = peak_statistics(used, "gaussian guess")?;
        Ok(vec![mu, std, peak])
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{A}} \cdot \exp\left[-\frac{1}{2}\left(\frac{x - {{mu}}}{{{sigma}}}\right)^2\right]"
    }

    fn tex_arg_names(&self) -> &'static [&'static str] {
        &GAUSS_TEX
    }

    fn even_params(&self) -> &'static [usize] {
        &[1]
    }
}

/// Moyal (Landau approximation) `f(x) = A·exp(-½(z + e^{-z}))`, `z = (x-μ)/σ`.
///
/// The peak sits at `x = μ` with height `A·e^{-½}`. Unlike the Gaussian, `f`
/// is not even in σ: a negative σ mirrors the profile so the long tail runs
/// towards lower x, and the fitted sign is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Moyal;

impl FitModel for Moyal {
    fn name(&self) -> &'static str {
        "moyal"
    }

    fn param_names(&self) -> &'static [&'static str] {
        &GAUSS_PARAMS
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        let (mu, sigma, a) = (params[0], params[1], params[2]);
        let z = (x - mu) / sigma;
        a * (-0.5 * (z + (-z).exp())).exp()
    }

    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        let (_, std, peak) = peak_statistics(used, "moyal guess")?;
        let Some(i_peak) = used.argmax_y() else {
            return Err(degenerate("moyal guess requires observations"));
        };
        // Moyal standard deviation is π·σ/√2.
        let sigma = std * std::f64::consts::SQRT_2 / std::f64::consts::PI;
        Ok(vec![used.x[i_peak], sigma, peak * 0.5f64.exp()])
    }

    fn tex_function(&self) -> &'static str {
        r"f(x) = {{A}} \cdot \exp\left[-\frac{1}{2}\left(z + e^{-z}\right)\right], \; z = \frac{x - {{mu}}}{{{sigma}}}"
    }

    fn tex_arg_names(&self) -> &'static [&'static str] {
        &GAUSS_TEX
    }
}

/// `(mean, std, peak)` of the profile described by the used subset.
fn peak_statistics(used: &UsedObservations, what: &str) -> Result<(f64, f64, f64), FitError> {
    let (ylo, yhi) = used.require_y_spread(what)?;
    let (xlo, xhi) = used.require_x_spread(what)?;

    let weights = height_weights(used, ylo);
    let Some((mean, std)) = weighted_moments(&used.x, &weights) else {
        return Err(degenerate(format!("{what} found no weight above the baseline")));
    };
    // A single dominant point gives zero spread; fall back to the sampling pitch.
    let std = if std > 0.0 {
        std
    } else {
        (xhi - xlo) / used.len() as f64
    };
    Ok((mean, std, yhi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;

    fn sampled(model: &dyn FitModel, params: &[f64]) -> UsedObservations {
        let x = linspace(0.0, 10.0, 41);
        let y = model.evaluate(&x, params);
        UsedObservations { w: vec![1.0; x.len()], x, y }
    }

    #[test]
    fn gaussian_peak_value() {
        assert!((Gaussian.function(5.0, &[5.0, 1.0, 10.0]) - 10.0).abs() < 1e-12);
        assert!((Gaussian.function(6.0, &[5.0, 1.0, 10.0]) - 10.0 * (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn gaussian_guess_is_close() {
        let used = sampled(&Gaussian, &[5.0, 1.0, 10.0]);
        let p0 = Gaussian.p0(&used).unwrap();
        assert!((p0[0] - 5.0).abs() < 1e-9);
        assert!((p0[1] - 1.0).abs() < 0.2);
        assert!((p0[2] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn flat_profile_is_degenerate() {
        let used = UsedObservations {
            x: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            y: vec![2.0; 5],
            w: vec![1.0; 5],
        };
        assert!(matches!(Gaussian.p0(&used), Err(FitError::FitFailed(_))));
        assert!(matches!(Moyal.p0(&used), Err(FitError::FitFailed(_))));
    }

    #[test]
    fn gaussian_is_even_in_sigma() {
        for x in [3.0, 4.5, 7.0] {
            assert_eq!(Gaussian.function(x, &[5.0, -1.3, 2.0]), Gaussian.function(x, &[5.0, 1.3, 2.0]));
        }
        assert_ne!(Moyal.function(6.0, &[5.0, -1.0, 2.0]), Moyal.function(6.0, &[5.0, 1.0, 2.0]));
    }

    #[test]
    fn moyal_peak_at_mu() {
        let p = [4.0, 0.8, 3.0];
        let at_mu = Moyal.function(4.0, &p);
        assert!((at_mu - 3.0 * (-0.5f64).exp()).abs() < 1e-12);
        assert!(Moyal.function(3.9, &p) < at_mu);
        assert!(Moyal.function(4.1, &p) < at_mu);
    }

    #[test]
    fn moyal_guess_locates_peak() {
        let used = sampled(&Moyal, &[4.0, 0.8, 3.0]);
        let p0 = Moyal.p0(&used).unwrap();
        assert!((p0[0] - 4.0).abs() <= 0.25 + 1e-12);
        assert!(p0[1] > 0.0);
    }
}
