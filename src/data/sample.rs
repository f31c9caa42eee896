//! Synthetic series generation for the demo binary and tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::ModelKind;
use crate::error::AppError;
use crate::fit::Series;
use crate::math::linspace;
use crate::models::FitModel;

/// Everything needed to draw one noisy series from a model.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub model: ModelKind,
    pub params: Vec<f64>,
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    /// Standard deviation of the additive Gaussian noise.
    pub noise: f64,
    pub seed: u64,
}

/// How one parameter moves across a batch: `params[index] + slope * center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drift {
    pub index: usize,
    pub slope: f64,
}

/// Draw one series on an evenly spaced x grid.
///
/// With non-zero noise, weights are `1 / noise²`.
pub fn generate_series(spec: &SampleSpec, center: f64) -> Result<Series, AppError> {
    validate(spec)?;

    let mut rng = StdRng::seed_from_u64(sample_seed(spec, center));
    let x = linspace(spec.x_min, spec.x_max, spec.n_points);
    let mut y = spec.model.evaluate(&x, &spec.params);

    if spec.noise > 0.0 {
        let normal = Normal::new(0.0, spec.noise)
            .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
        for v in y.iter_mut() {
            *v += normal.sample(&mut rng);
        }
    }

    let mut series = Series::new(center, x, y);
    if spec.noise > 0.0 {
        let w = 1.0 / (spec.noise * spec.noise);
        series = series.with_weights(vec![w; spec.n_points]);
    }
    Ok(series)
}

/// Draw `n_series` series centred at `0, 1, ..., n_series - 1`, with one
/// parameter drifting linearly in the centre.
pub fn generate_batch(spec: &SampleSpec, n_series: usize, drift: Option<Drift>) -> Result<Vec<Series>, AppError> {
    if n_series == 0 {
        return Err(AppError::new(2, "Series count must be > 0."));
    }
    if let Some(d) = drift {
        if d.index >= spec.params.len() {
            return Err(AppError::new(2, format!("Drift parameter index {} out of range.", d.index)));
        }
    }

    (0..n_series)
        .map(|k| {
            let center = k as f64;
            let mut params = spec.params.clone();
            if let Some(d) = drift {
                params[d.index] += d.slope * center;
            }
            let drifted = SampleSpec {
                params,
                ..spec.clone()
            };
            generate_series(&drifted, center).map(|s| s.with_label(format!("bin-{k:03}")))
        })
        .collect()
}

fn validate(spec: &SampleSpec) -> Result<(), AppError> {
    let n_params = spec.model.n_params();
    if spec.params.len() != n_params {
        return Err(AppError::new(
            2,
            format!(
                "Model {} takes {n_params} parameters ({}), got {}.",
                spec.model.display_name(),
                spec.model.param_names().join(", "),
                spec.params.len()
            ),
        ));
    }
    if spec.params.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(2, "Model parameters must be finite."));
    }
    if spec.n_points < 2 {
        return Err(AppError::new(2, "Point count must be >= 2."));
    }
    if !(spec.x_min.is_finite() && spec.x_max.is_finite() && spec.x_max > spec.x_min) {
        return Err(AppError::new(2, "Invalid x range for sample generation."));
    }
    if !(spec.noise.is_finite() && spec.noise >= 0.0) {
        return Err(AppError::new(2, "Noise must be finite and >= 0."));
    }
    Ok(())
}

fn sample_seed(spec: &SampleSpec, center: f64) -> u64 {
    let mut hasher = DefaultHasher::new();
    spec.seed.hash(&mut hasher);
    spec.model.hash(&mut hasher);
    spec.n_points.hash(&mut hasher);
    center.to_bits().hash(&mut hasher);
    hasher.finish()
}
