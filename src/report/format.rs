//! Number formatting for labels and terminal tables.
//!
//! The rounding rule for a measured value is tied to its uncertainty: the
//! uncertainty keeps `sig_figs` significant figures and the value is rounded to
//! the same decimal place. Very large or very small magnitudes switch to a shared
//! power-of-ten exponent.

/// Magnitudes at or above `10^SCI_HIGH` use scientific notation.
const SCI_HIGH: i32 = 5;
/// Magnitudes below `10^SCI_LOW` use scientific notation.
const SCI_LOW: i32 = -3;

/// A value/uncertainty pair rounded for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Rounded {
    pub value: String,
    pub sigma: String,
    /// Shared power of ten, when scientific notation applies.
    pub exponent: Option<i32>,
}

impl Rounded {
    /// `v \pm s`, or `\left(v \pm s\right) \times 10^{e}`.
    pub fn to_tex(&self) -> String {
        match self.exponent {
            Some(e) => format!(r"\left({} \pm {}\right) \times 10^{{{e}}}", self.value, self.sigma),
            None => format!(r"{} \pm {}", self.value, self.sigma),
        }
    }

    /// Value only, parenthesised when it would not read as a single factor.
    pub fn value_tex(&self) -> String {
        match self.exponent {
            Some(e) => format!(r"\left({} \times 10^{{{e}}}\right)", self.value),
            None if self.value.starts_with('-') => format!(r"\left({}\right)", self.value),
            None => self.value.clone(),
        }
    }
}

/// Round `value` to the decimal place set by `sigma`.
///
/// Non-finite or zero `sigma` falls back to three significant figures for the value.
pub fn round_with_uncertainty(value: f64, sigma: f64, sig_figs: usize) -> Rounded {
    let sig_figs = sig_figs.max(1) as i32;

    if !value.is_finite() {
        return Rounded {
            value: non_finite_tex(value),
            sigma: sigma_fallback(sigma),
            exponent: None,
        };
    }

    if !(sigma.is_finite() && sigma > 0.0) {
        let e_v = exponent_of(value);
        let decimals = 2 - e_v;
        return if needs_scientific(e_v) {
            let scale = 10f64.powi(e_v);
            Rounded {
                value: fixed(value / scale, 2),
                sigma: sigma_fallback(sigma),
                exponent: Some(e_v),
            }
        } else {
            Rounded {
                value: fixed_or_integer(value, decimals),
                sigma: sigma_fallback(sigma),
                exponent: None,
            }
        };
    }

    let e_s = exponent_of(sigma);
    let mut decimals = sig_figs - 1 - e_s;
    // Rounding may carry into the next decade (0.0996 -> 0.10).
    if exponent_of(round_at(sigma, decimals)) > e_s {
        decimals -= 1;
    }

    let e_v = exponent_of(value.abs().max(sigma));
    if needs_scientific(e_v) {
        let scale = 10f64.powi(e_v);
        let d = (decimals + e_v).max(0);
        return Rounded {
            value: fixed(value / scale, d as usize),
            sigma: fixed(sigma / scale, d as usize),
            exponent: Some(e_v),
        };
    }

    Rounded {
        value: fixed_or_integer(value, decimals),
        sigma: fixed_or_integer(sigma, decimals),
        exponent: None,
    }
}

/// Format with `n` significant figures (scientific outside the display window).
pub fn format_sig(value: f64, n: usize) -> String {
    if !value.is_finite() {
        return non_finite_tex(value);
    }
    let n = n.max(1) as i32;
    let e_v = exponent_of(value);
    if needs_scientific(e_v) {
        let scale = 10f64.powi(e_v);
        return format!(r"{} \times 10^{{{e_v}}}", fixed(value / scale, (n - 1) as usize));
    }
    fixed_or_integer(value, n - 1 - e_v)
}

/// Escape characters that end or break TeX math mode: `# $ % &`.
///
/// Already escaped characters are left alone.
pub fn escape_tex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = '\0';
    for ch in s.chars() {
        if matches!(ch, '#' | '$' | '%' | '&') && prev != '\\' {
            out.push('\\');
        }
        out.push(ch);
        prev = ch;
    }
    out
}

fn needs_scientific(exponent: i32) -> bool {
    exponent >= SCI_HIGH || exponent < SCI_LOW
}

/// Decade of `v`; zero maps to 0.
fn exponent_of(v: f64) -> i32 {
    if v == 0.0 {
        return 0;
    }
    let a = v.abs();
    let mut e = a.log10().floor() as i32;
    // log10 can land one ulp off at exact powers of ten.
    if 10f64.powi(e + 1) <= a {
        e += 1;
    } else if 10f64.powi(e) > a {
        e -= 1;
    }
    e
}

fn round_at(v: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (v * scale).round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (v / scale).round() * scale
    }
}

fn fixed_or_integer(v: f64, decimals: i32) -> String {
    if decimals >= 0 {
        fixed(v, decimals as usize)
    } else {
        fixed(round_at(v, decimals), 0)
    }
}

fn fixed(v: f64, decimals: usize) -> String {
    let s = format!("{v:.decimals$}");
    // Avoid "-0.00".
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

fn non_finite_tex(v: f64) -> String {
    if v.is_nan() {
        r"\mathrm{NaN}".to_string()
    } else if v > 0.0 {
        r"\infty".to_string()
    } else {
        r"-\infty".to_string()
    }
}

fn sigma_fallback(sigma: f64) -> String {
    if sigma == 0.0 { "0".to_string() } else { non_finite_tex(sigma) }
}
