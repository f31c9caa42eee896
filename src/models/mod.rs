//! Fit model implementations.
//!
//! Each model is a zero-sized type implementing [`FitModel`], so the fitting and
//! batch code stay generic. [`ModelKind`] wraps them for runtime selection.

pub mod exponential;
pub mod gaussian;
pub mod hinge;
pub mod line;
pub mod model;
pub mod power_law;

pub use exponential::{Exponential, ExponentialPlusC};
pub use gaussian::{Gaussian, Moyal};
pub use hinge::{HingeSaturation, TwoLine};
pub use line::Line;
pub use model::FitModel;
pub use power_law::PowerLaw;

use crate::domain::{ModelKind, UsedObservations};
use crate::error::FitError;

impl ModelKind {
    fn as_model(self) -> &'static dyn FitModel {
        match self {
            ModelKind::Line => &Line,
            ModelKind::Gaussian => &Gaussian,
            ModelKind::Exponential => &Exponential,
            ModelKind::ExponentialPlusC => &ExponentialPlusC,
            ModelKind::PowerLaw => &PowerLaw,
            ModelKind::Moyal => &Moyal,
            ModelKind::HingeSaturation => &HingeSaturation,
            ModelKind::TwoLine => &TwoLine,
        }
    }
}

impl FitModel for ModelKind {
    fn name(&self) -> &'static str {
        self.as_model().name()
    }

    fn param_names(&self) -> &'static [&'static str] {
        self.as_model().param_names()
    }

    fn function(&self, x: f64, params: &[f64]) -> f64 {
        self.as_model().function(x, params)
    }

    fn p0(&self, used: &UsedObservations) -> Result<Vec<f64>, FitError> {
        self.as_model().p0(used)
    }

    fn tex_function(&self) -> &'static str {
        self.as_model().tex_function()
    }

    fn tex_arg_names(&self) -> &'static [&'static str] {
        self.as_model().tex_arg_names()
    }

    fn even_params(&self) -> &'static [usize] {
        self.as_model().even_params()
    }
}
