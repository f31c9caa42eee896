//! Error types.
//!
//! - [`FitError`] is the library taxonomy returned by fitting operations.
//! - [`AppError`] is what the `fitfn` binary reports (message + process exit code).

use thiserror::Error;

/// Why a numerically well-posed fit still did not produce usable parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    /// The solver exhausted its evaluation budget before any tolerance was met.
    #[error("solver did not converge within {nfev} function evaluations")]
    MaxEvaluations { nfev: usize },

    /// The model produced a non-finite residual at the initial guess or during a step.
    #[error("model produced non-finite residuals")]
    NonFiniteResidual,

    /// The Jacobian at the solution is rank deficient, so the covariance is undefined.
    #[error("singular Jacobian at the solution (rank {rank} < {n_params})")]
    SingularJacobian { rank: usize, n_params: usize },

    /// The used observations cannot support an initial guess for this model.
    #[error("degenerate data: {0}")]
    DegenerateData(String),
}

/// Errors raised by [`crate::fit::FitFunction`] and [`crate::fit::TrendFit`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Not enough finite observations to determine the free parameters.
    #[error("insufficient data: {used} usable observations, more than {required} required")]
    InsufficientData { used: usize, required: usize },

    /// Solver non-convergence or numerical breakdown.
    #[error("fit failed: {0}")]
    FitFailed(FailureReason),

    /// A model variant returned a malformed initial guess.
    #[error("invalid initial guess from model '{model}': {reason}")]
    InvalidParameter { model: &'static str, reason: String },

    /// Raw observations violate the construction contract.
    #[error("invalid observations: {0}")]
    InvalidObservations(String),

    /// Bounds, limits, or solver options are inconsistent with the model.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A fitted quantity was requested before `make_fit` ran.
    #[error("fit has not been run yet")]
    NotFitted,

    /// A fitted quantity was requested from a fit that recorded a failure.
    #[error("fit unavailable, the recorded outcome is a failure: {0}")]
    FitUnavailable(Box<FitError>),

    /// `make_fit` / `make_1dfits` may only run once per instance.
    #[error("fit has already been run on this instance")]
    AlreadyFit,

    /// Lookup of a parameter that the model does not define.
    #[error("unknown parameter '{name}' for model '{model}'")]
    UnknownParameter { model: &'static str, name: String },
}

impl FitError {
    /// True for failures that a batch may record as a placeholder instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FitError::FitFailed(_) | FitError::InsufficientData { .. })
    }
}

impl From<FailureReason> for FitError {
    fn from(reason: FailureReason) -> Self {
        FitError::FitFailed(reason)
    }
}

/// Error reported by the `fitfn` binary.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::InvalidObservations(_) | FitError::InvalidConfig(_) => 2,
            FitError::InsufficientData { .. } => 3,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
