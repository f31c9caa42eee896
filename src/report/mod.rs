//! Reporting utilities: TeX labels and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

pub mod format;
pub mod tex;

pub use format::{Rounded, escape_tex, format_sig, round_with_uncertainty};
pub use tex::TexInfo;

use crate::domain::FitState;
use crate::fit::{BatchReport, FitFunction, FitOutcome, TrendFit};
use crate::models::FitModel;

/// Parameters, uncertainties and fit quality of a single fit.
pub fn format_fit_summary<M: FitModel>(fit: &FitFunction<M>) -> String {
    let mut out = String::new();
    let obs = fit.observations();

    out.push_str(&format!("=== fitfn - {} ===\n", fit.model().name()));
    out.push_str(&format!("Points: used={} | total={}\n", obs.n_used(), obs.len()));

    match fit.outcome() {
        None => out.push_str("State: unfit\n"),
        Some(FitOutcome::Failed(err)) => out.push_str(&format!("State: failed ({err})\n")),
        Some(FitOutcome::Fitted(stats)) => {
            out.push_str(&format!(
                "chi2={:.4} chi2_nu={:.4} R2={:.5} dof={} nfev={}\n",
                stats.chisq, stats.chisq_dof, stats.rsq, stats.dof, stats.nfev
            ));
            out.push_str("\nParameters:\n");
            for ((name, value), (_, sigma)) in stats.popt.iter().zip(stats.psigma.iter()) {
                out.push_str(&format!("  {name:<8} {value:>14.6} +/- {sigma:<12.6}\n"));
            }
        }
    }

    out
}

/// One row per series: centre, state, then every parameter as `value +/- sigma`.
pub fn format_batch_table<M>(batch: &TrendFit<M>, report: &BatchReport) -> String
where
    M: FitModel + Clone + Send + Sync,
{
    let mut out = String::new();
    let names = batch.model().param_names();

    let mut header = format!("{:>4} {:>10} {:<7}", "#", "center", "state");
    let mut rule = format!("{:-<4} {:-<10} {:-<7}", "", "", "");
    for name in names {
        header.push_str(&format!(" {name:>24}"));
        rule.push_str(&format!(" {:-<24}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    let Ok(fits) = batch.fits() else {
        out.push_str("(not fitted)\n");
        return out;
    };
    for (i, (fit, series)) in fits.iter().zip(batch.series().iter()).enumerate() {
        let state = match fit.state() {
            FitState::Fitted => "ok",
            FitState::Failed => "failed",
            FitState::Unfit => "unfit",
        };
        let mut row = format!("{i:>4} {:>10.4} {state:<7}", series.center);
        match (fit.popt(), fit.psigma()) {
            (Ok(popt), Ok(psigma)) => {
                for (v, s) in popt.values().iter().zip(psigma.values().iter()) {
                    row.push_str(&format!(" {:>24}", format!("{v:.4} +/- {s:.2e}")));
                }
            }
            _ => {
                for _ in names {
                    row.push_str(&format!(" {:>24}", "-"));
                }
            }
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out.push_str(&format!("\n{report}\n"));
    for (i, err) in &report.failures {
        out.push_str(&format!("  series {i}: {err}\n"));
    }
    out
}
