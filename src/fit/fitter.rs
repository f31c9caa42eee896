//! Single-series fitting.
//!
//! A [`FitFunction`] owns one fit's lifecycle:
//!
//! - validate: the used subset must have more points than free parameters
//! - guess: the model derives `p0` from the used subset
//! - solve: weighted, optionally bounded Levenberg–Marquardt
//! - store: `popt`, scaled covariance, `psigma`, χ², reduced χ², R²
//!
//! The instance starts Unfit and moves exactly once to Fitted or Failed.
//! Everything afterwards is read-only.

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::{
    Bounds, Curve, FailurePolicy, FitState, ObservationLimits, Observations, ParameterSet, Subset,
};
use crate::error::{FailureReason, FitError};
use crate::math::{SolverOptions, chisq, covariance, linspace, minimize, r_squared};
use crate::models::FitModel;
use crate::report::TexInfo;

/// Per-fit configuration: everything that shapes the solve.
///
/// Execution settings for batches (worker count, verbosity) are a separate type,
/// [`crate::fit::ExecutionConfig`], and have no path into this struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitConfig {
    /// Per-parameter box constraints.
    pub bounds: Option<Bounds>,
    /// Window restricting which observations are used.
    pub limits: ObservationLimits,
    pub solver: SolverOptions,
}

/// Statistics of a successful fit.
#[derive(Debug, Clone)]
pub struct FitStatistics {
    pub popt: ParameterSet,
    pub psigma: ParameterSet,
    /// Covariance scaled by the reduced χ².
    pub pcov: DMatrix<f64>,
    /// `Σ w r²` over the used subset.
    pub chisq: f64,
    /// `chisq / (n_used - n_params)`.
    pub chisq_dof: f64,
    pub rsq: f64,
    pub n_used: usize,
    pub dof: usize,
    pub nfev: usize,
}

/// Terminal state of a fit.
#[derive(Debug, Clone)]
pub enum FitOutcome {
    Fitted(FitStatistics),
    Failed(FitError),
}

/// Serializable snapshot of a fit in any state.
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub model: &'static str,
    pub state: FitState,
    pub parameters: Vec<&'static str>,
    pub popt: Option<Vec<f64>>,
    pub psigma: Option<Vec<f64>>,
    pub chisq: Option<f64>,
    pub chisq_dof: Option<f64>,
    pub rsq: Option<f64>,
    pub nfev: Option<usize>,
    pub n_used: usize,
    pub n_total: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FitFunction<M: FitModel> {
    model: M,
    observations: Observations,
    config: FitConfig,
    outcome: Option<FitOutcome>,
}

impl<M: FitModel> FitFunction<M> {
    /// Build an unfit instance. `w` defaults to uniform ones.
    pub fn new(model: M, x: Vec<f64>, y: Vec<f64>, w: Option<Vec<f64>>, config: FitConfig) -> Result<Self, FitError> {
        if let Some(bounds) = &config.bounds {
            bounds.validate(model.n_params())?;
        }
        let observations = Observations::new(x, y, w, &config.limits)?;
        Ok(Self {
            model,
            observations,
            config,
            outcome: None,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn outcome(&self) -> Option<&FitOutcome> {
        self.outcome.as_ref()
    }

    pub fn state(&self) -> FitState {
        match self.outcome {
            None => FitState::Unfit,
            Some(FitOutcome::Fitted(_)) => FitState::Fitted,
            Some(FitOutcome::Failed(_)) => FitState::Failed,
        }
    }

    /// `true` iff more observations are used than the model has parameters.
    pub fn sufficient_data(&self) -> bool {
        self.observations.n_used() > self.model.n_params()
    }

    /// Run the fit.
    ///
    /// Any failure moves the instance to Failed. The failure is returned,
    /// except a solver failure (`FitFailed`) under [`FailurePolicy::Record`],
    /// which is only stored.
    pub fn make_fit(&mut self, policy: FailurePolicy) -> Result<(), FitError> {
        if self.outcome.is_some() {
            return Err(FitError::AlreadyFit);
        }

        match self.run_fit() {
            Ok(stats) => {
                self.outcome = Some(FitOutcome::Fitted(stats));
                Ok(())
            }
            Err(err) => {
                log::debug!("{}: fit failed: {err}", self.model.name());
                self.outcome = Some(FitOutcome::Failed(err.clone()));
                match (&err, policy) {
                    (FitError::FitFailed(_), FailurePolicy::Record) => Ok(()),
                    _ => Err(err),
                }
            }
        }
    }

    fn run_fit(&self) -> Result<FitStatistics, FitError> {
        let model = &self.model;
        let n_params = model.n_params();
        let used = self.observations.used();
        if !self.sufficient_data() {
            return Err(FitError::InsufficientData {
                used: used.len(),
                required: n_params,
            });
        }

        let mut p0 = model.p0(used)?;
        if p0.len() != n_params {
            return Err(FitError::InvalidParameter {
                model: model.name(),
                reason: format!("p0 has {} entries, expected {n_params}", p0.len()),
            });
        }
        if let Some(i) = p0.iter().position(|v| !v.is_finite()) {
            return Err(FitError::InvalidParameter {
                model: model.name(),
                reason: format!("p0[{i}] = {} is not finite", p0[i]),
            });
        }
        let bounds = self.config.bounds.as_ref();
        if let Some(b) = bounds {
            b.project(&mut p0);
        }

        let sqrt_w: Vec<f64> = used.w.iter().map(|w| w.sqrt()).collect();
        let weighted_residual = |p: &[f64], out: &mut [f64]| {
            for i in 0..out.len() {
                out[i] = sqrt_w[i] * (used.y[i] - model.function(used.x[i], p));
            }
        };
        let mut report = minimize(weighted_residual, used.len(), &p0, bounds, &self.config.solver)?;
        if report.params.iter().any(|v| !v.is_finite()) {
            return Err(FailureReason::NonFiniteResidual.into());
        }
        fold_even_params(model.even_params(), bounds, &mut report.params, &mut report.jacobian);

        let residuals: Vec<f64> = (0..used.len())
            .map(|i| used.y[i] - model.function(used.x[i], &report.params))
            .collect();
        let dof = used.len() - n_params;
        let chisq = chisq(&residuals, &used.w);
        let chisq_dof = chisq / dof as f64;

        let pcov = covariance(&report.jacobian)? * chisq_dof;
        let psigma: Vec<f64> = (0..n_params)
            .map(|j| {
                let var = pcov[(j, j)];
                if var.is_finite() && var >= 0.0 { var.sqrt() } else { f64::NAN }
            })
            .collect();
        let rsq = r_squared(&used.y, &residuals, &used.w);

        log::debug!(
            "{}: converged ({:?}) after {} evaluations, chi2_nu = {chisq_dof:.4}",
            model.name(),
            report.termination,
            report.nfev
        );

        let names = model.param_names();
        Ok(FitStatistics {
            popt: ParameterSet::new(names, report.params),
            psigma: ParameterSet::new(names, psigma),
            pcov,
            chisq,
            chisq_dof,
            rsq,
            n_used: used.len(),
            dof,
            nfev: report.nfev,
        })
    }

    /// Statistics of the fit; fails unless the instance is Fitted.
    pub fn statistics(&self) -> Result<&FitStatistics, FitError> {
        match &self.outcome {
            None => Err(FitError::NotFitted),
            Some(FitOutcome::Failed(err)) => Err(FitError::FitUnavailable(Box::new(err.clone()))),
            Some(FitOutcome::Fitted(stats)) => Ok(stats),
        }
    }

    pub fn popt(&self) -> Result<&ParameterSet, FitError> {
        Ok(&self.statistics()?.popt)
    }

    pub fn psigma(&self) -> Result<&ParameterSet, FitError> {
        Ok(&self.statistics()?.psigma)
    }

    pub fn pcov(&self) -> Result<&DMatrix<f64>, FitError> {
        Ok(&self.statistics()?.pcov)
    }

    pub fn chisq_dof(&self) -> Result<f64, FitError> {
        Ok(self.statistics()?.chisq_dof)
    }

    /// Fitted value of one named parameter.
    pub fn param(&self, name: &str) -> Result<f64, FitError> {
        self.popt()?.get(name).ok_or_else(|| FitError::UnknownParameter {
            model: self.model.name(),
            name: name.to_string(),
        })
    }

    /// The model at the fitted parameters.
    pub fn evaluate(&self, x: &[f64]) -> Result<Vec<f64>, FitError> {
        let popt = self.popt()?;
        Ok(self.model.evaluate(x, popt.values()))
    }

    /// `y - f(x; popt)` over the chosen subset.
    ///
    /// `Subset::Used` has one entry per used observation; `Subset::All` one per
    /// original observation, including points excluded from the fit.
    pub fn residuals(&self, subset: Subset) -> Result<Vec<f64>, FitError> {
        let (x, y) = self.subset_columns(subset);
        let fitted = self.evaluate(x)?;
        Ok(y.iter().zip(fitted.iter()).map(|(yi, fi)| yi - fi).collect())
    }

    /// Residuals as a percentage of the fitted value, `100·(y - f)/f`.
    pub fn residuals_pct(&self, subset: Subset) -> Result<Vec<f64>, FitError> {
        let (x, y) = self.subset_columns(subset);
        let fitted = self.evaluate(x)?;
        Ok(y.iter().zip(fitted.iter()).map(|(yi, fi)| 100.0 * (yi - fi) / fi).collect())
    }

    fn subset_columns(&self, subset: Subset) -> (&[f64], &[f64]) {
        match subset {
            Subset::Used => (&self.observations.used().x, &self.observations.used().y),
            Subset::All => (self.observations.raw_x(), self.observations.raw_y()),
        }
    }

    /// `n` points of the fitted model on `[x_min, x_max]`, for plotting.
    pub fn curve(&self, x_min: f64, x_max: f64, n: usize) -> Result<Curve, FitError> {
        if !(x_min.is_finite() && x_max.is_finite() && x_max > x_min) || n < 2 {
            return Err(FitError::InvalidConfig(format!(
                "curve needs a finite range with x_max > x_min and n >= 2 (got [{x_min}, {x_max}], n={n})"
            )));
        }
        let x = linspace(x_min, x_max, n);
        let y = self.evaluate(&x)?;
        Ok(Curve { x, y })
    }

    /// Curve over the x range of the used observations.
    pub fn smooth_curve(&self, n: usize) -> Result<Curve, FitError> {
        let Some((lo, hi)) = self.observations.used().x_range() else {
            return Err(FitError::NotFitted);
        };
        self.curve(lo, hi, n)
    }

    /// Label for the fitted model.
    pub fn tex_info(&self) -> Result<TexInfo, FitError> {
        let stats = self.statistics()?;
        Ok(TexInfo::new(
            self.model.tex_function(),
            self.model.tex_arg_names(),
            &stats.popt,
            &stats.psigma,
        )?
        .with_chisq_dof(stats.chisq_dof)
        .with_rsq(stats.rsq)
        .with_npts(stats.n_used, self.observations.len()))
    }

    pub fn summary(&self) -> FitSummary {
        let stats = self.statistics().ok();
        let error = match &self.outcome {
            Some(FitOutcome::Failed(err)) => Some(err.to_string()),
            _ => None,
        };
        FitSummary {
            model: self.model.name(),
            state: self.state(),
            parameters: self.model.param_names().to_vec(),
            popt: stats.map(|s| s.popt.values().to_vec()),
            psigma: stats.map(|s| s.psigma.values().to_vec()),
            chisq: stats.map(|s| s.chisq),
            chisq_dof: stats.map(|s| s.chisq_dof),
            rsq: stats.map(|s| s.rsq),
            nfev: stats.map(|s| s.nfev),
            n_used: self.observations.n_used(),
            n_total: self.observations.len(),
            error,
        }
    }
}

/// Flip negative values of sign-symmetric parameters, with their Jacobian
/// columns, unless the flipped value would leave the bounds.
fn fold_even_params(even: &[usize], bounds: Option<&Bounds>, params: &mut [f64], jac: &mut DMatrix<f64>) {
    for &j in even {
        let flipped = -params[j];
        let allowed = bounds.is_none_or(|b| b.lower[j] <= flipped && flipped <= b.upper[j]);
        if params[j] < 0.0 && allowed {
            params[j] = flipped;
            for i in 0..jac.nrows() {
                jac[(i, j)] = -jac[(i, j)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, UsedObservations};
    use crate::models::{Gaussian, Line};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn line_fit(x: Vec<f64>, y: Vec<f64>) -> FitFunction<Line> {
        FitFunction::new(Line, x, y, None, FitConfig::default()).unwrap()
    }

    #[test]
    fn exact_line_recovery() {
        let mut fit = line_fit(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0]);
        assert_eq!(fit.state(), FitState::Unfit);
        fit.make_fit(FailurePolicy::Raise).unwrap();
        assert_eq!(fit.state(), FitState::Fitted);

        let popt = fit.popt().unwrap();
        assert!((popt.get("m").unwrap() - 2.0).abs() < 1e-6);
        assert!((popt.get("b").unwrap() - 1.0).abs() < 1e-6);
        assert!(fit.chisq_dof().unwrap() < 1e-12);
    }

    #[test]
    fn noisy_gaussian_recovers_center_within_two_sigma() {
        // Independent N(0, 0.3) noise per seed; a 2-sigma interval should miss
        // the true centre only occasionally.
        let x = linspace(0.0, 10.0, 50);
        let normal = Normal::new(0.0, 0.3).unwrap();
        let mut covered = 0;
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let y: Vec<f64> = x
                .iter()
                .map(|&xi| Gaussian.function(xi, &[5.0, 1.0, 10.0]) + normal.sample(&mut rng))
                .collect();

            let mut fit = FitFunction::new(Gaussian, x.clone(), y, None, FitConfig::default()).unwrap();
            fit.make_fit(FailurePolicy::Raise).unwrap();

            let mu = fit.param("mu").unwrap();
            let sigma_mu = fit.psigma().unwrap().get("mu").unwrap();
            assert!(sigma_mu.is_finite() && sigma_mu > 0.0, "seed {seed}");
            assert!((mu - 5.0).abs() < 0.2, "seed {seed}: mu = {mu}");
            assert!((fit.param("sigma").unwrap() - 1.0).abs() < 0.2, "seed {seed}");
            assert!((fit.param("A").unwrap() - 10.0).abs() < 0.5, "seed {seed}");
            if (mu - 5.0).abs() <= 2.0 * sigma_mu {
                covered += 1;
            }
        }
        assert!(covered >= 17, "mu within 2 sigma for {covered} of 20 seeds");
    }

    #[test]
    fn even_parameters_are_reported_non_negative() {
        let mut params = vec![5.0, -1.2, 10.0];
        let mut jac = DMatrix::from_row_slice(2, 3, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        fold_even_params(&[1], None, &mut params, &mut jac);
        assert_eq!(params, vec![5.0, 1.2, 10.0]);
        assert_eq!(jac.column(1).iter().copied().collect::<Vec<_>>(), vec![-0.2, -0.5]);
        assert_eq!(jac[(0, 0)], 0.1);

        // A box that excludes the positive value keeps the fitted sign.
        let bounds = Bounds::from_pairs(&[(0.0, 10.0), (-3.0, -0.1), (0.0, 20.0)]);
        let mut params = vec![5.0, -1.2, 10.0];
        fold_even_params(&[1], Some(&bounds), &mut params, &mut jac);
        assert_eq!(params[1], -1.2);
    }

    #[test]
    fn gaussian_fit_from_negative_width_guess() {
        #[derive(Debug, Clone)]
        struct NegativeWidth;
        impl FitModel for NegativeWidth {
            fn name(&self) -> &'static str {
                Gaussian.name()
            }
            fn param_names(&self) -> &'static [&'static str] {
                Gaussian.param_names()
            }
            fn function(&self, x: f64, params: &[f64]) -> f64 {
                Gaussian.function(x, params)
            }
            fn p0(&self, _used: &UsedObservations) -> Result<Vec<f64>, FitError> {
                Ok(vec![4.8, -1.3, 9.0])
            }
            fn tex_function(&self) -> &'static str {
                Gaussian.tex_function()
            }
            fn tex_arg_names(&self) -> &'static [&'static str] {
                Gaussian.tex_arg_names()
            }
            fn even_params(&self) -> &'static [usize] {
                Gaussian.even_params()
            }
        }

        let x = linspace(0.0, 10.0, 41);
        let y = Gaussian.evaluate(&x, &[5.0, 1.0, 10.0]);
        let mut fit = FitFunction::new(NegativeWidth, x, y, None, FitConfig::default()).unwrap();
        fit.make_fit(FailurePolicy::Raise).unwrap();

        assert!((fit.param("sigma").unwrap() - 1.0).abs() < 1e-6);
        let label = fit.tex_info().unwrap().build();
        assert!(label.contains(r"$\sigma = "), "{label}");
        assert!(!label.contains(r"\sigma = -"), "{label}");
    }

    #[test]
    fn residual_lengths_follow_subset() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 3.0, f64::NAN, 7.0, 9.0, 11.0];
        let mut fit = line_fit(x, y);
        fit.make_fit(FailurePolicy::Raise).unwrap();

        let used = fit.residuals(Subset::Used).unwrap();
        let all = fit.residuals(Subset::All).unwrap();
        assert_eq!(used.len(), 5);
        assert_eq!(all.len(), 6);
        assert!(all[2].is_nan());
        assert!(used.iter().all(|r| r.abs() < 1e-6));
    }

    #[test]
    fn residuals_include_points_outside_limits() {
        let config = FitConfig {
            limits: ObservationLimits {
                xmax: Some(3.5),
                ..Default::default()
            },
            ..Default::default()
        };
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y = vec![1.0, 3.0, 5.0, 7.0, 100.0];
        let mut fit = FitFunction::new(Line, x, y, None, config).unwrap();
        fit.make_fit(FailurePolicy::Raise).unwrap();

        let all = fit.residuals(Subset::All).unwrap();
        assert_eq!(all.len(), 5);
        assert!((all[4] - 91.0).abs() < 1e-5);
        assert_eq!(fit.residuals(Subset::Used).unwrap().len(), 4);
    }

    #[test]
    fn percent_residuals() {
        let mut fit = line_fit(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0, 4.0]);
        fit.make_fit(FailurePolicy::Raise).unwrap();
        let pct = fit.residuals_pct(Subset::Used).unwrap();
        assert!(pct.iter().all(|r| r.abs() < 1e-6));
    }

    #[test]
    fn insufficient_data_for_every_model() {
        for kind in ModelKind::ALL {
            let n = kind.n_params();
            // Exactly n usable points, plus one non-finite that must not count.
            let mut x: Vec<f64> = (1..=n).map(|i| i as f64).collect();
            let mut y: Vec<f64> = x.iter().map(|v| 1.0 + v * v).collect();
            x.push(f64::NAN);
            y.push(1.0);

            let mut fit = FitFunction::new(kind, x, y, None, FitConfig::default()).unwrap();
            assert!(!fit.sufficient_data(), "{kind:?}");
            let err = fit.make_fit(FailurePolicy::Record).unwrap_err();
            assert_eq!(err, FitError::InsufficientData { used: n, required: n }, "{kind:?}");
            assert_eq!(fit.state(), FitState::Failed);
        }
    }

    #[test]
    fn one_more_point_is_sufficient() {
        for kind in ModelKind::ALL {
            let n = kind.n_params() + 1;
            let x: Vec<f64> = (1..=n).map(|i| i as f64).collect();
            let y: Vec<f64> = x.iter().map(|v| 1.0 + v * v).collect();
            let fit = FitFunction::new(kind, x, y, None, FitConfig::default()).unwrap();
            assert!(fit.sufficient_data(), "{kind:?}");
        }
    }

    #[test]
    fn accessors_fail_before_and_after_failure() {
        let fit = line_fit(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
        assert_eq!(fit.popt().unwrap_err(), FitError::NotFitted);
        assert!(matches!(fit.residuals(Subset::Used), Err(FitError::NotFitted)));

        let mut flat = FitFunction::new(
            Gaussian,
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![2.0; 5],
            None,
            FitConfig::default(),
        )
        .unwrap();
        flat.make_fit(FailurePolicy::Record).unwrap();
        assert_eq!(flat.state(), FitState::Failed);
        assert!(matches!(flat.psigma(), Err(FitError::FitUnavailable(_))));
    }

    #[test]
    fn raise_policy_returns_solver_failure() {
        let mut flat = FitFunction::new(
            Gaussian,
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![2.0; 5],
            None,
            FitConfig::default(),
        )
        .unwrap();
        let err = flat.make_fit(FailurePolicy::Raise).unwrap_err();
        assert!(matches!(err, FitError::FitFailed(FailureReason::DegenerateData(_))));
        assert_eq!(flat.state(), FitState::Failed);
    }

    #[test]
    fn refit_is_rejected() {
        let mut fit = line_fit(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
        fit.make_fit(FailurePolicy::Raise).unwrap();
        assert_eq!(fit.make_fit(FailurePolicy::Raise).unwrap_err(), FitError::AlreadyFit);
    }

    #[derive(Debug, Clone)]
    struct BrokenGuess;

    impl FitModel for BrokenGuess {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn param_names(&self) -> &'static [&'static str] {
            &["a", "b"]
        }
        fn function(&self, x: f64, params: &[f64]) -> f64 {
            params[0] * x + params[1]
        }
        fn p0(&self, _used: &UsedObservations) -> Result<Vec<f64>, FitError> {
            Ok(vec![1.0])
        }
        fn tex_function(&self) -> &'static str {
            "{{a}} x + {{b}}"
        }
    }

    #[test]
    fn malformed_guess_is_fatal_under_record() {
        let mut fit = FitFunction::new(BrokenGuess, vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0], None, FitConfig::default())
            .unwrap();
        let err = fit.make_fit(FailurePolicy::Record).unwrap_err();
        assert!(matches!(err, FitError::InvalidParameter { model: "broken", .. }));
    }

    #[test]
    fn bounds_are_respected() {
        let config = FitConfig {
            bounds: Some(Bounds::from_pairs(&[(0.0, 1.5), (-10.0, 10.0)])),
            ..Default::default()
        };
        let mut fit = FitFunction::new(Line, vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0], None, config).unwrap();
        fit.make_fit(FailurePolicy::Raise).unwrap();
        let m = fit.param("m").unwrap();
        assert!(m <= 1.5 + 1e-12, "m = {m}");
    }

    #[test]
    fn bounds_shape_is_checked_at_construction() {
        let config = FitConfig {
            bounds: Some(Bounds::from_pairs(&[(0.0, 1.0)])),
            ..Default::default()
        };
        let err = FitFunction::new(Line, vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0], None, config).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfig(_)));
    }

    #[test]
    fn fitted_state_has_finite_parameters() {
        for kind in ModelKind::ALL {
            let x: Vec<f64> = (1..=30).map(|i| i as f64 * 0.3).collect();
            let y: Vec<f64> = x.iter().map(|v| 2.0 + (v * 1.7).sin()).collect();
            let mut fit = FitFunction::new(kind, x, y, None, FitConfig::default()).unwrap();
            match fit.make_fit(FailurePolicy::Record) {
                Ok(()) => match fit.state() {
                    FitState::Fitted => assert!(fit.popt().unwrap().values().iter().all(|v| v.is_finite())),
                    FitState::Failed => assert!(fit.popt().is_err()),
                    FitState::Unfit => panic!("{kind:?} still unfit after make_fit"),
                },
                Err(err) => panic!("{kind:?} returned {err}"),
            }
        }
    }

    #[test]
    fn curve_and_label_for_plotting() {
        let mut fit = line_fit(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0]);
        fit.make_fit(FailurePolicy::Raise).unwrap();

        let curve = fit.curve(0.0, 10.0, 11).unwrap();
        assert_eq!(curve.x.len(), 11);
        assert!((curve.y[10] - 21.0).abs() < 1e-5);
        assert!(fit.curve(1.0, 1.0, 5).is_err());

        let label = fit.tex_info().unwrap().build();
        assert!(label.starts_with(r"$f(x) = m \cdot x + b$"));
        assert!(label.contains("$N = 4$"));
    }

    #[test]
    fn summary_serializes() {
        let mut fit = line_fit(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 3.0, 5.0, 7.0]);
        fit.make_fit(FailurePolicy::Raise).unwrap();
        let json = serde_json::to_string(&fit.summary()).unwrap();
        assert!(json.contains("\"state\":\"fitted\""));
        assert!(json.contains("\"model\":\"line\""));
    }
}
