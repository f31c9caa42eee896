//! TeX labels for fitted models.
//!
//! [`TexInfo`] is a pure formatter: it receives the model's TeX template, the
//! fitted values and their uncertainties (plus optional fit statistics) and
//! produces a newline-separated block of `$...$` lines, e.g.
//!
//! ```text
//! $f(x) = m \cdot x + b$
//! $m = 2.000 \pm 0.012$
//! $b = 1.00 \pm 0.03$
//! $\chi^2_\nu = 1.04$
//! ```
//!
//! Templates reference parameters as `{{name}}`; the symbolic form replaces each
//! placeholder with the parameter's TeX symbol, the evaluated form with its
//! rounded value.

use std::fmt;

use crate::domain::ParameterSet;
use crate::error::FitError;
use crate::report::format::{Rounded, escape_tex, format_sig, round_with_uncertainty};

/// Default significant figures kept on uncertainties.
const DEFAULT_SIG_FIGS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct TexInfo {
    template: String,
    names: Vec<&'static str>,
    symbols: Vec<String>,
    popt: Vec<f64>,
    psigma: Vec<f64>,
    chisq_dof: Option<f64>,
    rsq: Option<f64>,
    npts: Option<(usize, usize)>,
    relative_error: bool,
    simplified: bool,
    sig_figs: usize,
    extra: Vec<String>,
}

impl TexInfo {
    /// `symbols` are the TeX names aligned with `popt`'s parameter order.
    ///
    /// Fails with `InvalidConfig` if `symbols`, `popt` and `psigma` disagree in length.
    pub fn new(template: &str, symbols: &[&str], popt: &ParameterSet, psigma: &ParameterSet) -> Result<Self, FitError> {
        if symbols.len() != popt.len() || psigma.len() != popt.len() {
            return Err(FitError::InvalidConfig(format!(
                "TeX label needs one symbol and one uncertainty per parameter (symbols={}, popt={}, psigma={})",
                symbols.len(),
                popt.len(),
                psigma.len()
            )));
        }
        Ok(Self {
            template: template.to_string(),
            names: popt.names().to_vec(),
            symbols: symbols.iter().map(|s| escape_tex(s)).collect(),
            popt: popt.values().to_vec(),
            psigma: psigma.values().to_vec(),
            chisq_dof: None,
            rsq: None,
            npts: None,
            relative_error: false,
            simplified: false,
            sig_figs: DEFAULT_SIG_FIGS,
            extra: Vec::new(),
        })
    }

    pub fn with_chisq_dof(mut self, chisq_dof: f64) -> Self {
        self.chisq_dof = Some(chisq_dof);
        self
    }

    pub fn with_rsq(mut self, rsq: f64) -> Self {
        self.rsq = Some(rsq);
        self
    }

    /// Number of observations used, and originally supplied.
    pub fn with_npts(mut self, used: usize, total: usize) -> Self {
        self.npts = Some((used, total));
        self
    }

    /// Show uncertainties as a percentage of the value.
    pub fn relative_error(mut self, on: bool) -> Self {
        self.relative_error = on;
        self
    }

    /// Drop statistics and extra lines, keeping the function and parameters.
    pub fn simplified(mut self, on: bool) -> Self {
        self.simplified = on;
        self
    }

    pub fn sig_figs(mut self, n: usize) -> Self {
        self.sig_figs = n.max(1);
        self
    }

    /// Append a free-form line (reserved characters are escaped).
    pub fn add_line(mut self, line: impl AsRef<str>) -> Self {
        self.extra.push(escape_tex(line.as_ref()));
        self
    }

    /// Template with each placeholder replaced by its TeX symbol.
    pub fn function_tex(&self) -> String {
        self.substitute(|i| self.symbols[i].clone())
    }

    /// Template with each placeholder replaced by its rounded fitted value.
    pub fn evaluated_function(&self) -> String {
        self.substitute(|i| self.rounded(i).value_tex())
    }

    /// One `symbol = value \pm sigma` line per parameter, without `$` delimiters.
    pub fn parameter_lines(&self) -> Vec<String> {
        (0..self.popt.len())
            .map(|i| format!("{} = {}", self.symbols[i], self.value_with_error(i)))
            .collect()
    }

    /// The full label.
    pub fn build(&self) -> String {
        let mut lines = vec![math(&self.function_tex())];
        lines.extend(self.parameter_lines().iter().map(|l| math(l)));

        if !self.simplified {
            if let Some(chi) = self.chisq_dof {
                lines.push(math(&format!(r"\chi^2_\nu = {}", format_sig(chi, 3))));
            }
            if let Some(rsq) = self.rsq {
                lines.push(math(&format!("R^2 = {}", format_sig(rsq, 3))));
            }
            if let Some((used, total)) = self.npts {
                if used == total {
                    lines.push(math(&format!("N = {used}")));
                } else {
                    lines.push(math(&format!("N = {used} / {total}")));
                }
            }
            lines.extend(self.extra.iter().cloned());
        }

        lines.join("\n")
    }

    fn rounded(&self, i: usize) -> Rounded {
        round_with_uncertainty(self.popt[i], self.psigma[i], self.sig_figs)
    }

    fn value_with_error(&self, i: usize) -> String {
        let r = self.rounded(i);
        if !self.relative_error {
            return r.to_tex();
        }
        let value = self.popt[i];
        let sigma = self.psigma[i];
        let pct = if value != 0.0 && sigma.is_finite() {
            format!(r"{}\%", format_sig(100.0 * sigma / value.abs(), self.sig_figs))
        } else {
            r"\mathrm{NaN}\%".to_string()
        };
        let value_part = match r.exponent {
            Some(e) => format!(r"{} \times 10^{{{e}}}", r.value),
            None => r.value,
        };
        format!(r"{value_part} \pm {pct}")
    }

    fn substitute<F>(&self, replacement: F) -> String
    where
        F: Fn(usize) -> String,
    {
        let mut out = self.template.clone();
        for (i, name) in self.names.iter().enumerate() {
            out = out.replace(&format!("{{{{{name}}}}}"), &replacement(i));
        }
        out
    }
}

impl fmt::Display for TexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

fn math(body: &str) -> String {
    format!("${body}$")
}
