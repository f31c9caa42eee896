//! Command-line parsing for the `fitfn` demo binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code. Conversion into library config types lives in `app`.

use clap::{Args, Parser, Subcommand};

use crate::domain::{FailurePolicy, ModelKind};
use crate::fit::TrendWeighting;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fitfn", version, about = "Curve fitting on synthetic series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one synthetic series and print parameters, statistics and the TeX label.
    Fit(FitArgs),
    /// Fit a batch of series with a drifting parameter, then fit that parameter's trend.
    Trend(TrendArgs),
}

/// Synthetic data and per-fit options shared by both subcommands.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Model used to generate and fit the data.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelKind::Line)]
    pub model: ModelKind,

    /// True parameters, comma separated, in the model's order.
    #[arg(short = 'p', long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    pub params: Vec<f64>,

    /// Points per series.
    #[arg(short = 'n', long, default_value_t = 50)]
    pub points: usize,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub x_max: f64,

    /// Standard deviation of the additive noise.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// Random seed for sample generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Only fit points with x >= this value.
    #[arg(long, allow_negative_numbers = true)]
    pub fit_x_min: Option<f64>,

    /// Only fit points with x <= this value.
    #[arg(long, allow_negative_numbers = true)]
    pub fit_x_max: Option<f64>,

    /// Solver evaluation budget (default scales with the parameter count).
    #[arg(long)]
    pub max_nfev: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Print the fit summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Show uncertainties in the TeX label as percentages.
    #[arg(long)]
    pub relative_error: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TrendArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    /// Number of series (centres 0, 1, ..., K-1).
    #[arg(short = 'k', long, default_value_t = 10)]
    pub series: usize,

    /// Parameter that drifts with the series centre.
    #[arg(long)]
    pub drift_param: Option<String>,

    /// Drift per unit centre.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub drift: f64,

    /// Parameter whose trend is fitted (defaults to the drift parameter).
    #[arg(long)]
    pub trend_param: Option<String>,

    /// Model fitted to the parameter trend.
    #[arg(long, value_enum, default_value_t = ModelKind::Line)]
    pub trend_model: ModelKind,

    #[arg(long, value_enum, default_value_t = TrendWeighting::Uniform)]
    pub weighting: TrendWeighting,

    /// Exclude series whose relative uncertainty on the trend parameter exceeds this.
    #[arg(long)]
    pub max_relative_error: Option<f64>,

    /// Worker threads for the batch (0 = all cores).
    #[arg(short = 'j', long, default_value_t = 1)]
    pub jobs: usize,

    /// What to do when a series fails.
    #[arg(long, value_enum, default_value_t = FailurePolicy::Record)]
    pub policy: FailurePolicy,

    /// Log every series outcome.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
