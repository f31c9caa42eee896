//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - turns them into library configuration
//! - runs the pipeline and prints reports

use clap::Parser;

use crate::cli::{Command, FitArgs, SampleArgs, TrendArgs};
use crate::data::SampleSpec;
use crate::domain::ObservationLimits;
use crate::error::AppError;
use crate::fit::{ExecutionConfig, FitConfig, TrendOptions};
use crate::math::SolverOptions;
use crate::models::FitModel;

pub mod pipeline;

/// Entry point for the `fitfn` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Trend(args) => handle_trend(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.sample);
    let run = pipeline::run_single(&sample_spec_from_args(&args.sample), &config)?;

    if args.json {
        let json = serde_json::to_string_pretty(&run.fit.summary())
            .map_err(|e| AppError::new(4, format!("Failed to serialize summary: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", crate::report::format_fit_summary(&run.fit));
    let label = run.fit.tex_info()?.relative_error(args.relative_error);
    println!("TeX label:\n{label}");
    Ok(())
}

fn handle_trend(args: TrendArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args.sample);
    let exec = execution_config_from_args(&args);

    let model = args.sample.model;
    let trend_param = match (&args.trend_param, &args.drift_param) {
        (Some(p), _) | (None, Some(p)) => p.clone(),
        (None, None) => model
            .param_names()
            .first()
            .map(|p| p.to_string())
            .ok_or_else(|| AppError::new(2, "Model has no parameters."))?,
    };

    let plan = pipeline::TrendPlan {
        sample: sample_spec_from_args(&args.sample),
        n_series: args.series,
        drift: args.drift_param.clone().map(|name| (name, args.drift)),
        trend_param: trend_param.clone(),
        trend_model: args.trend_model,
        options: TrendOptions {
            weighting: args.weighting,
            max_relative_error: args.max_relative_error,
            failure_policy: args.policy,
            config: FitConfig::default(),
        },
    };
    let run = pipeline::run_trend(&plan, &config, &exec)?;

    println!("=== fitfn - {} x {} series ===", model.name(), args.series);
    println!("{}", crate::report::format_batch_table(&run.batch, &run.report));

    match &run.trend {
        Some(trend) => {
            println!("Trend of {trend_param} vs center:");
            println!("{}", crate::report::format_fit_summary(trend));
            if let Ok(label) = trend.tex_info() {
                println!("TeX label:\n{label}");
            }
        }
        None => println!("Trend of {trend_param}: not enough fitted series."),
    }
    Ok(())
}

/// Per-fit configuration from the shared sample arguments.
pub fn fit_config_from_args(args: &SampleArgs) -> FitConfig {
    FitConfig {
        bounds: None,
        limits: ObservationLimits {
            xmin: args.fit_x_min,
            xmax: args.fit_x_max,
            ..Default::default()
        },
        solver: SolverOptions {
            max_nfev: args.max_nfev,
            ..Default::default()
        },
    }
}

pub fn sample_spec_from_args(args: &SampleArgs) -> SampleSpec {
    SampleSpec {
        model: args.model,
        params: args.params.clone(),
        n_points: args.points,
        x_min: args.x_min,
        x_max: args.x_max,
        noise: args.noise,
        seed: args.seed,
    }
}

pub fn execution_config_from_args(args: &TrendArgs) -> ExecutionConfig {
    ExecutionConfig {
        n_jobs: args.jobs,
        failure_policy: args.policy,
        verbose: args.verbose,
    }
}
