use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::trace;

use crate::types::InfoCriteria;

/// Gaussian log-likelihood of an OLS fit evaluated at the ML variance.
pub fn log_likelihood(ssr: f64, nobs: usize) -> f64 {
    let n = nobs as f64;
    -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / n).ln() + 1.0)
}

pub fn info_criteria(ssr: f64, nobs: usize, k: usize) -> InfoCriteria {
    let ll = log_likelihood(ssr, nobs);
    let n = nobs as f64;
    let k = k as f64;
    let aic = -2.0 * ll + 2.0 * k;
    let bic = -2.0 * ll + k * n.ln();
    let hqic = -2.0 * ll + 2.0 * k * n.ln().ln();
    trace!("info_criteria: n={n}, k={k}, ll={ll}, aic={aic}, bic={bic}, hqic={hqic}");
    InfoCriteria { ll, aic, bic, hqic }
}

/// Two-sided p-values of t statistics against Student's t with `df` degrees
/// of freedom. Non-positive `df` or non-finite statistics give NaN.
pub fn t_pvalues(t: &[f64], df: f64) -> Vec<f64> {
    let dist = if df > 0.0 {
        StudentsT::new(0.0, 1.0, df).ok()
    } else {
        None
    };
    t.iter()
        .map(|&t| match &dist {
            Some(dist) if t.is_finite() => 2.0 * (1.0 - dist.cdf(t.abs())),
            _ => f64::NAN,
        })
        .collect()
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return f64::NAN;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    (sum / y_true.len() as f64).sqrt()
}
