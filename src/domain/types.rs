//! Shared domain types.
//!
//! These are the small value types that flow between the fitter, the batch
//! orchestrator and the label formatter. Everything here is plain data.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Which observations an operation should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subset {
    /// Only the observations that entered the fit.
    Used,
    /// Every observation originally supplied, including excluded ones.
    All,
}

/// What `make_fit` does when the solver fails.
///
/// Only recoverable failures (`FitFailed`, and `InsufficientData` inside a batch)
/// are ever recorded. Contract violations are always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the failure to the caller.
    #[default]
    Raise,
    /// Store the failure as the fit's outcome and return `Ok`.
    Record,
}

/// Coarse lifecycle state of a single fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitState {
    Unfit,
    Fitted,
    Failed,
}

/// Runtime-selectable model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Line,
    Gaussian,
    Exponential,
    ExponentialPlusC,
    PowerLaw,
    Moyal,
    HingeSaturation,
    TwoLine,
}

impl ModelKind {
    pub const ALL: [ModelKind; 8] = [
        ModelKind::Line,
        ModelKind::Gaussian,
        ModelKind::Exponential,
        ModelKind::ExponentialPlusC,
        ModelKind::PowerLaw,
        ModelKind::Moyal,
        ModelKind::HingeSaturation,
        ModelKind::TwoLine,
    ];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Line => "Line",
            ModelKind::Gaussian => "Gaussian",
            ModelKind::Exponential => "Exponential",
            ModelKind::ExponentialPlusC => "Exponential + C",
            ModelKind::PowerLaw => "Power law",
            ModelKind::Moyal => "Moyal",
            ModelKind::HingeSaturation => "Hinge (saturation)",
            ModelKind::TwoLine => "Two-line hinge",
        }
    }
}

/// Per-parameter box constraints, in the model's parameter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self { lower, upper }
    }

    /// Build from `(lower, upper)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            lower: pairs.iter().map(|p| p.0).collect(),
            upper: pairs.iter().map(|p| p.1).collect(),
        }
    }

    /// Check shape and ordering against a parameter count.
    ///
    /// Infinite limits are allowed (one-sided constraints), NaN is not.
    pub fn validate(&self, n_params: usize) -> Result<(), FitError> {
        if self.lower.len() != n_params || self.upper.len() != n_params {
            return Err(FitError::InvalidConfig(format!(
                "bounds have {} lower / {} upper entries, model has {n_params} parameters",
                self.lower.len(),
                self.upper.len()
            )));
        }
        for (i, (&lo, &hi)) in self.lower.iter().zip(self.upper.iter()).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo >= hi {
                return Err(FitError::InvalidConfig(format!(
                    "bounds for parameter {i} must satisfy lower < upper (got {lo}, {hi})"
                )));
            }
        }
        Ok(())
    }

    /// Clamp `params` into the box in place.
    pub fn project(&self, params: &mut [f64]) {
        for (p, (&lo, &hi)) in params.iter_mut().zip(self.lower.iter().zip(self.upper.iter())) {
            *p = p.clamp(lo, hi);
        }
    }
}

/// Optional window restricting which observations are used.
///
/// A point outside any configured limit is excluded from the fit exactly like a
/// non-finite point: it still counts for `Subset::All`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationLimits {
    pub xmin: Option<f64>,
    pub xmax: Option<f64>,
    pub ymin: Option<f64>,
    pub ymax: Option<f64>,
    pub wmin: Option<f64>,
    pub wmax: Option<f64>,
}

impl ObservationLimits {
    pub fn contains(&self, x: f64, y: f64, w: f64) -> bool {
        within(x, self.xmin, self.xmax) && within(y, self.ymin, self.ymax) && within(w, self.wmin, self.wmax)
    }
}

fn within(v: f64, lo: Option<f64>, hi: Option<f64>) -> bool {
    lo.is_none_or(|lo| v >= lo) && hi.is_none_or(|hi| v <= hi)
}

/// Ordered `name -> value` mapping in the model's parameter order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    names: &'static [&'static str],
    values: Vec<f64>,
}

impl ParameterSet {
    /// # Panics
    /// Panics if `values.len() != names.len()`. Callers build both from the same model.
    pub fn new(names: &'static [&'static str], values: Vec<f64>) -> Self {
        assert_eq!(names.len(), values.len(), "parameter names/values length mismatch");
        Self { names, values }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| *n == name).map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.names.iter().copied().zip(self.values.iter().copied())
    }
}

/// Smooth model curve handed to a plotting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}
