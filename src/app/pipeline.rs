//! Shared "fit pipeline" logic used by the CLI subcommands.
//!
//! Keeping this in one place keeps the workflow separate from printing:
//! sample generation -> fit (or batch fit) -> trend fit
//!
//! `app` then only decides how to present the outputs.

use crate::data::{Drift, SampleSpec, generate_batch, generate_series};
use crate::domain::{FailurePolicy, ModelKind};
use crate::error::{AppError, FitError};
use crate::fit::{BatchReport, ExecutionConfig, FitConfig, FitFunction, Series, TrendFit, TrendOptions};
use crate::models::FitModel;

/// Outputs of a single `fitfn fit` run.
#[derive(Debug, Clone)]
pub struct SingleRun {
    pub series: Series,
    pub fit: FitFunction<ModelKind>,
}

/// What a `fitfn trend` run should do.
#[derive(Debug, Clone)]
pub struct TrendPlan {
    pub sample: SampleSpec,
    pub n_series: usize,
    /// Name and per-centre slope of the drifting parameter.
    pub drift: Option<(String, f64)>,
    pub trend_param: String,
    pub trend_model: ModelKind,
    pub options: TrendOptions,
}

/// Outputs of a `fitfn trend` run.
#[derive(Debug, Clone)]
pub struct TrendRun {
    pub batch: TrendFit<ModelKind>,
    pub report: BatchReport,
    /// `None` when too few series survived to fit the trend.
    pub trend: Option<FitFunction<ModelKind>>,
}

/// Generate one series and fit it.
pub fn run_single(sample: &SampleSpec, config: &FitConfig) -> Result<SingleRun, AppError> {
    let series = generate_series(sample, 0.0)?;
    let mut fit = FitFunction::new(
        sample.model,
        series.x.clone(),
        series.y.clone(),
        series.w.clone(),
        config.clone(),
    )?;
    fit.make_fit(FailurePolicy::Raise)?;
    Ok(SingleRun { series, fit })
}

/// Generate a drifting batch, fit every series, then fit the trend.
pub fn run_trend(plan: &TrendPlan, config: &FitConfig, exec: &ExecutionConfig) -> Result<TrendRun, AppError> {
    let model = plan.sample.model;
    let drift = match &plan.drift {
        Some((name, slope)) => Some(Drift {
            index: param_index(model, name)?,
            slope: *slope,
        }),
        None => None,
    };
    param_index(model, &plan.trend_param)?;

    let series = generate_batch(&plan.sample, plan.n_series, drift)?;
    let mut batch = TrendFit::new(model, series, config.clone());
    let report = batch.make_1dfits(exec)?;

    let trend = match batch.make_trend_fit(&plan.trend_param, plan.trend_model, &plan.options) {
        Ok(trend) => Some(trend),
        Err(err) if err.is_recoverable() => {
            log::warn!("trend of {} not fitted: {err}", plan.trend_param);
            None
        }
        Err(err) => return Err(err.into()),
    };

    Ok(TrendRun { batch, report, trend })
}

fn param_index(model: ModelKind, name: &str) -> Result<usize, FitError> {
    model
        .param_names()
        .iter()
        .position(|n| *n == name)
        .ok_or_else(|| FitError::UnknownParameter {
            model: model.name(),
            name: name.to_string(),
        })
}
