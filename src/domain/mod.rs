//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - raw and used observation sets (`Observations`, `UsedObservations`)
//! - configuration enums (`Subset`, `FailurePolicy`, `ModelKind`)
//! - fit value types (`ParameterSet`, `Bounds`, `Curve`)

pub mod observations;
pub mod types;

pub use observations::*;
pub use types::*;
