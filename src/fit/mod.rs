//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - run one model against one series (`FitFunction`)
//! - run one model against many series, optionally in parallel (`TrendFit`)
//! - fit the trend of a fitted parameter across a batch

pub mod fitter;
pub mod trend;

pub use fitter::*;
pub use trend::*;
