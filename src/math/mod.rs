//! Numerical building blocks: the Levenberg–Marquardt solver, weighted linear
//! least squares, and summary statistics.

pub mod lm;
pub mod ols;
pub mod stats;

pub use lm::{LmReport, SolverOptions, Termination, covariance, minimize};
pub use ols::*;
pub use stats::*;
