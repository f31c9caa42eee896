//! `fitfunctions` library crate.
//!
//! Fits analytic models to (x, y, w) observations and reports parameters,
//! uncertainties, fit quality and a TeX label. `TrendFit` runs one model over
//! many series and fits how a parameter evolves across them.
//!
//! The binary (`fitfn`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting modules stay reusable from other front-ends

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod report;
