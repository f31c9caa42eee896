//! Batch fitting across many series, and the trend of one parameter across them.
//!
//! `TrendFit` fits the same model independently to each series (in parallel when
//! asked to), keeps every result in input order, and can then fit a second model
//! to how one fitted parameter varies with the series centres.

use std::fmt;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::{FailurePolicy, FitState, ParameterSet, Subset};
use crate::error::FitError;
use crate::fit::fitter::{FitConfig, FitFunction, FitOutcome};
use crate::models::FitModel;

/// One series of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub w: Option<Vec<f64>>,
    /// Ordering variable of the series (e.g. a bin centre).
    pub center: f64,
    pub label: Option<String>,
}

impl Series {
    pub fn new(center: f64, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            x,
            y,
            w: None,
            center,
            label: None,
        }
    }

    pub fn with_weights(mut self, w: Vec<f64>) -> Self {
        self.w = Some(w);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// How a batch is executed. Nothing here reaches the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Worker threads. `1` runs sequentially; `0` lets rayon pick.
    pub n_jobs: usize,
    pub failure_policy: FailurePolicy,
    /// Log every series outcome at info level instead of debug.
    pub verbose: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            n_jobs: 1,
            failure_policy: FailurePolicy::Record,
            verbose: false,
        }
    }
}

/// Counts from one `make_1dfits` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub n_series: usize,
    pub n_fitted: usize,
    pub n_failed: usize,
    /// Input index and error of every recorded failure.
    pub failures: Vec<(usize, FitError)>,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} series: {} fitted, {} failed",
            self.n_series, self.n_fitted, self.n_failed
        )
    }
}

/// Weights of the trend fit's points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TrendWeighting {
    #[default]
    Uniform,
    /// `1 / psigma²` of the trended parameter.
    InverseVariance,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendOptions {
    pub weighting: TrendWeighting,
    /// Drop series whose `psigma / |popt|` exceeds this.
    pub max_relative_error: Option<f64>,
    pub failure_policy: FailurePolicy,
    /// Configuration of the trend fit itself.
    pub config: FitConfig,
}

#[derive(Debug, Clone)]
pub struct TrendFit<M: FitModel> {
    model: M,
    series: Vec<Series>,
    config: FitConfig,
    fits: Option<Vec<FitFunction<M>>>,
}

impl<M> TrendFit<M>
where
    M: FitModel + Clone + Send + Sync,
{
    /// `config` applies to every per-series fit.
    pub fn new(model: M, series: Vec<Series>, config: FitConfig) -> Self {
        Self {
            model,
            series,
            config,
            fits: None,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Fit every series once.
    ///
    /// Under `Record`, series that fail with `FitFailed` or `InsufficientData`
    /// stay in the results as Failed placeholders. Any other error, or any
    /// failure under `Raise`, aborts the batch with the first error in input
    /// order and leaves the instance unfit.
    pub fn make_1dfits(&mut self, exec: &ExecutionConfig) -> Result<BatchReport, FitError> {
        let pool = (exec.n_jobs != 1).then(|| worker_pool(exec.n_jobs));
        self.make_1dfits_on(exec, pool)
    }

    /// Batch body. `pool` is `None` for a sequential run; a pool that failed to
    /// build degrades to a sequential run with a warning.
    fn make_1dfits_on(
        &mut self,
        exec: &ExecutionConfig,
        pool: Option<Result<ThreadPool, ThreadPoolBuildError>>,
    ) -> Result<BatchReport, FitError> {
        if self.fits.is_some() {
            return Err(FitError::AlreadyFit);
        }
        let n = self.series.len();
        let policy = exec.failure_policy;

        let mut indexed = match pool {
            None => self.fit_sequential(policy),
            Some(Ok(pool)) => pool.install(|| {
                self.series
                    .par_iter()
                    .enumerate()
                    .map(|(i, s)| (i, self.fit_one(s, policy)))
                    .collect::<Vec<_>>()
            }),
            Some(Err(err)) => {
                log::warn!("could not start {} workers ({err}); fitting {n} series sequentially", exec.n_jobs);
                self.fit_sequential(policy)
            }
        };
        indexed.sort_by_key(|(i, _)| *i);

        let mut fits = Vec::with_capacity(n);
        let mut report = BatchReport {
            n_series: n,
            ..Default::default()
        };
        for (i, result) in indexed {
            let fit = result?;
            match fit.outcome() {
                Some(FitOutcome::Failed(err)) => {
                    log::warn!("series {i} ({}): {err}", self.series_name(i));
                    report.n_failed += 1;
                    report.failures.push((i, err.clone()));
                }
                _ => {
                    if exec.verbose {
                        log::info!("series {i} ({}): fitted", self.series_name(i));
                    } else {
                        log::debug!("series {i} ({}): fitted", self.series_name(i));
                    }
                    report.n_fitted += 1;
                }
            }
            fits.push(fit);
        }

        log::info!("{}: {report}", self.model.name());
        self.fits = Some(fits);
        Ok(report)
    }

    fn fit_sequential(&self, policy: FailurePolicy) -> Vec<(usize, Result<FitFunction<M>, FitError>)> {
        self.series
            .iter()
            .enumerate()
            .map(|(i, s)| (i, self.fit_one(s, policy)))
            .collect()
    }

    fn fit_one(&self, series: &Series, policy: FailurePolicy) -> Result<FitFunction<M>, FitError> {
        let mut fit = FitFunction::new(
            self.model.clone(),
            series.x.clone(),
            series.y.clone(),
            series.w.clone(),
            self.config.clone(),
        )?;
        match fit.make_fit(policy) {
            Ok(()) => Ok(fit),
            Err(err) if policy == FailurePolicy::Record && err.is_recoverable() => Ok(fit),
            Err(err) => Err(err),
        }
    }

    fn series_name(&self, i: usize) -> String {
        match &self.series[i].label {
            Some(label) => label.clone(),
            None => format!("center={}", self.series[i].center),
        }
    }

    /// Per-series fits, in input order.
    pub fn fits(&self) -> Result<&[FitFunction<M>], FitError> {
        self.fits.as_deref().ok_or(FitError::NotFitted)
    }

    /// Fitted parameters per series; `None` for failed series.
    pub fn popt_1d(&self) -> Result<Vec<Option<ParameterSet>>, FitError> {
        Ok(self.fits()?.iter().map(|f| f.popt().ok().cloned()).collect())
    }

    pub fn psigma_1d(&self) -> Result<Vec<Option<ParameterSet>>, FitError> {
        Ok(self.fits()?.iter().map(|f| f.psigma().ok().cloned()).collect())
    }

    /// Index and recorded error of every failed series.
    pub fn bad_fits(&self) -> Result<Vec<(usize, &FitError)>, FitError> {
        Ok(self
            .fits()?
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match f.outcome() {
                Some(FitOutcome::Failed(err)) => Some((i, err)),
                _ => None,
            })
            .collect())
    }

    /// Residuals per series; `None` for failed series.
    pub fn residuals(&self, subset: Subset) -> Result<Vec<Option<Vec<f64>>>, FitError> {
        Ok(self.fits()?.iter().map(|f| f.residuals(subset).ok()).collect())
    }

    /// `(center, value, sigma)` of one parameter across the batch. Failed series
    /// give NaN value and sigma.
    pub fn parameter_trend(&self, param: &str) -> Result<Vec<(f64, f64, f64)>, FitError> {
        let fits = self.fits()?;
        if !self.model.param_names().contains(&param) {
            return Err(FitError::UnknownParameter {
                model: self.model.name(),
                name: param.to_string(),
            });
        }
        Ok(fits
            .iter()
            .zip(self.series.iter())
            .map(|(fit, s)| {
                let value = fit.popt().ok().and_then(|p| p.get(param)).unwrap_or(f64::NAN);
                let sigma = fit.psigma().ok().and_then(|p| p.get(param)).unwrap_or(f64::NAN);
                (s.center, value, sigma)
            })
            .collect())
    }

    /// Fit `trend_model` to `param` as a function of the series centres.
    ///
    /// Failed series, and series rejected by `max_relative_error`, enter as NaN
    /// and drop out through the ordinary used-subset filter. Inverse-variance
    /// weighting falls back to uniform weights when a kept series reports a zero
    /// uncertainty (an exact fit), since its weight would be infinite.
    pub fn make_trend_fit<T: FitModel>(
        &self,
        param: &str,
        trend_model: T,
        options: &TrendOptions,
    ) -> Result<FitFunction<T>, FitError> {
        let points = self.parameter_trend(param)?;

        let mut x = Vec::with_capacity(points.len());
        let mut y = Vec::with_capacity(points.len());
        let mut sigmas = Vec::with_capacity(points.len());
        for (center, value, sigma) in points {
            let rejected = options
                .max_relative_error
                .is_some_and(|max| !(sigma / value.abs() <= max));
            x.push(center);
            y.push(if rejected { f64::NAN } else { value });
            sigmas.push(sigma);
        }

        let mut weighting = options.weighting;
        let exact = y.iter().zip(sigmas.iter()).any(|(v, s)| v.is_finite() && *s == 0.0);
        if weighting == TrendWeighting::InverseVariance && exact {
            log::warn!("trend of {param}: a series has zero uncertainty; using uniform weights");
            weighting = TrendWeighting::Uniform;
        }
        let w = sigmas
            .iter()
            .map(|s| match weighting {
                TrendWeighting::Uniform => 1.0,
                TrendWeighting::InverseVariance => 1.0 / (s * s),
            })
            .collect();

        let mut trend = FitFunction::new(trend_model, x, y, Some(w), options.config.clone())?;
        trend.make_fit(options.failure_policy)?;
        if trend.state() == FitState::Fitted {
            log::debug!("trend of {param}: {} of {} series used", trend.observations().n_used(), self.series.len());
        }
        Ok(trend)
    }
}

/// `n_jobs` workers; `0` lets rayon pick the count.
fn worker_pool(n_jobs: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new().num_threads(n_jobs).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gaussian, Line};

    /// Lines whose slope drifts as `1 + 0.5·center`, with a small fixed wiggle.
    fn drifting_lines(k: usize) -> Vec<Series> {
        (0..k)
            .map(|i| {
                let center = i as f64;
                let m = 1.0 + 0.5 * center;
                let x: Vec<f64> = (0..12).map(|j| j as f64).collect();
                let y = x.iter().map(|&v| m * v + 2.0 + 0.05 * (1.3 * v + center).sin()).collect();
                Series::new(center, x, y)
            })
            .collect()
    }

    fn peaks(k: usize) -> Vec<Series> {
        (0..k)
            .map(|i| {
                let mu = 4.0 + 0.2 * i as f64;
                let x: Vec<f64> = (0..40).map(|j| j as f64 * 0.25).collect();
                let y = Gaussian.evaluate(&x, &[mu, 1.0, 5.0]);
                Series::new(i as f64, x, y)
            })
            .collect()
    }

    #[test]
    fn sequential_and_parallel_agree_in_order() {
        let mut seq = TrendFit::new(Line, drifting_lines(8), FitConfig::default());
        let mut par = TrendFit::new(Line, drifting_lines(8), FitConfig::default());
        seq.make_1dfits(&ExecutionConfig::default()).unwrap();
        par.make_1dfits(&ExecutionConfig {
            n_jobs: 4,
            ..Default::default()
        })
        .unwrap();

        let a = seq.popt_1d().unwrap();
        let b = par.popt_1d().unwrap();
        assert_eq!(a, b);
        for (i, p) in a.iter().enumerate() {
            let m = p.as_ref().unwrap().get("m").unwrap();
            assert!((m - (1.0 + 0.5 * i as f64)).abs() < 0.01, "series {i}: m = {m}");
        }
    }

    #[test]
    fn degenerate_series_is_recorded() {
        let mut series = peaks(5);
        series[2].y = vec![3.0; series[2].x.len()];
        let mut batch = TrendFit::new(Gaussian, series, FitConfig::default());
        let report = batch.make_1dfits(&ExecutionConfig::default()).unwrap();

        assert_eq!(report.n_series, 5);
        assert_eq!(report.n_fitted, 4);
        assert_eq!(report.n_failed, 1);
        assert_eq!(report.failures[0].0, 2);

        let bad = batch.bad_fits().unwrap();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].0, 2);
        assert!(batch.popt_1d().unwrap()[2].is_none());
        let residuals = batch.residuals(Subset::Used).unwrap();
        assert!(residuals[2].is_none());
        assert_eq!(residuals[0].as_ref().map(Vec::len), Some(40));
    }

    #[test]
    fn short_series_is_recorded_as_insufficient() {
        let mut series = drifting_lines(3);
        series[1].x.truncate(2);
        series[1].y.truncate(2);
        let mut batch = TrendFit::new(Line, series, FitConfig::default());
        let report = batch.make_1dfits(&ExecutionConfig::default()).unwrap();
        assert_eq!(report.n_failed, 1);
        assert!(matches!(report.failures[0].1, FitError::InsufficientData { used: 2, required: 2 }));
    }

    #[test]
    fn raise_returns_first_failure() {
        let mut series = peaks(4);
        series[3].y = vec![1.0; series[3].x.len()];
        series[1].y = vec![1.0; series[1].x.len()];
        let mut batch = TrendFit::new(Gaussian, series, FitConfig::default());
        let exec = ExecutionConfig {
            n_jobs: 2,
            failure_policy: FailurePolicy::Raise,
            verbose: false,
        };
        let err = batch.make_1dfits(&exec).unwrap_err();
        assert!(matches!(err, FitError::FitFailed(_)));
        assert_eq!(batch.fits().unwrap_err(), FitError::NotFitted);
    }

    #[test]
    fn batch_runs_once() {
        let mut batch = TrendFit::new(Line, drifting_lines(2), FitConfig::default());
        batch.make_1dfits(&ExecutionConfig::default()).unwrap();
        assert_eq!(batch.make_1dfits(&ExecutionConfig::default()).unwrap_err(), FitError::AlreadyFit);
    }

    #[test]
    fn trend_fit_recovers_slope_drift() {
        let mut batch = TrendFit::new(Line, drifting_lines(6), FitConfig::default());
        batch.make_1dfits(&ExecutionConfig::default()).unwrap();

        for weighting in [TrendWeighting::Uniform, TrendWeighting::InverseVariance] {
            let options = TrendOptions {
                weighting,
                ..Default::default()
            };
            let trend = batch.make_trend_fit("m", Line, &options).unwrap();
            assert!((trend.param("m").unwrap() - 0.5).abs() < 0.01, "{weighting:?}");
            assert!((trend.param("b").unwrap() - 1.0).abs() < 0.02, "{weighting:?}");
        }
    }

    #[test]
    fn trend_skips_failed_series() {
        let mut series = peaks(6);
        series[0].y = vec![2.0; series[0].x.len()];
        let mut batch = TrendFit::new(Gaussian, series, FitConfig::default());
        batch.make_1dfits(&ExecutionConfig::default()).unwrap();

        let trend = batch.make_trend_fit("mu", Line, &TrendOptions::default()).unwrap();
        assert_eq!(trend.observations().n_used(), 5);
        assert_eq!(trend.residuals(Subset::All).unwrap().len(), 6);
        assert!((trend.param("m").unwrap() - 0.2).abs() < 1e-4);
    }

    #[test]
    fn relative_error_cut_drops_points() {
        let mut batch = TrendFit::new(Line, drifting_lines(5), FitConfig::default());
        batch.make_1dfits(&ExecutionConfig::default()).unwrap();
        let options = TrendOptions {
            max_relative_error: Some(0.0),
            ..Default::default()
        };
        let err = batch.make_trend_fit("m", Line, &options).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { used: 0, .. }));
    }

    #[test]
    fn inverse_variance_trend_of_exact_fits() {
        let series: Vec<Series> = (0..6)
            .map(|i| {
                let center = i as f64;
                let m = 1.0 + 0.5 * center;
                let x: Vec<f64> = (0..8).map(|j| j as f64).collect();
                let y = x.iter().map(|&v| m * v + 2.0).collect();
                Series::new(center, x, y)
            })
            .collect();
        let mut batch = TrendFit::new(Line, series, FitConfig::default());
        batch.make_1dfits(&ExecutionConfig::default()).unwrap();

        let options = TrendOptions {
            weighting: TrendWeighting::InverseVariance,
            ..Default::default()
        };
        let trend = batch.make_trend_fit("m", Line, &options).unwrap();
        assert_eq!(trend.observations().n_used(), 6);
        assert!((trend.param("m").unwrap() - 0.5).abs() < 1e-6);
        assert!((trend.param("b").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn failed_pool_falls_back_to_sequential() {
        // The global pool can only be built once, so the second attempt always errors.
        let err = ThreadPoolBuilder::new()
            .build_global()
            .and_then(|_| ThreadPoolBuilder::new().build_global())
            .unwrap_err();

        let mut seq = TrendFit::new(Line, drifting_lines(5), FitConfig::default());
        seq.make_1dfits(&ExecutionConfig::default()).unwrap();

        let exec = ExecutionConfig {
            n_jobs: 4,
            ..Default::default()
        };
        let mut fallback = TrendFit::new(Line, drifting_lines(5), FitConfig::default());
        let report = fallback.make_1dfits_on(&exec, Some(Err(err))).unwrap();

        assert_eq!(report.n_fitted, 5);
        assert_eq!(seq.popt_1d().unwrap(), fallback.popt_1d().unwrap());
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut batch = TrendFit::new(Line, drifting_lines(3), FitConfig::default());
        assert_eq!(batch.make_trend_fit("m", Line, &TrendOptions::default()).unwrap_err(), FitError::NotFitted);
        batch.make_1dfits(&ExecutionConfig::default()).unwrap();
        let err = batch.make_trend_fit("slope", Line, &TrendOptions::default()).unwrap_err();
        assert!(matches!(err, FitError::UnknownParameter { .. }));
    }
}
