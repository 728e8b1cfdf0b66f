use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use tracing::{debug, trace};

use crate::linalg::pinv_symmetric;
use crate::stats::{info_criteria, t_pvalues};
use crate::types::{Matrix, OlsFit, OlsStripped};

pub trait OlsEngine {
    fn fit(&self, y: &[f64], x: &Matrix) -> Result<OlsFit>;

    fn fit_stripped(&self, y: &[f64], x: &Matrix) -> Result<OlsStripped> {
        let fit = self.fit(y, x)?;
        Ok(OlsStripped { b: fit.b, p: fit.p })
    }
}

/// OLS through the pseudo-inverse of `X'X`, so rank-deficient designs still
/// return the minimum-norm solution.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinvOls;

struct Core {
    b: Array1<f64>,
    se: Vec<f64>,
    ssr: f64,
    tss: f64,
    rank: usize,
    nobs: usize,
}

impl PinvOls {
    fn solve(&self, y: &[f64], x: &Matrix) -> Result<Core> {
        let (xa, ya) = design(y, x)?;
        let n = xa.nrows();
        let xt = xa.t();
        let xtx = xt.dot(&xa);
        let (xtx_inv, rank) = pinv_symmetric(&xtx).context("pseudo-inverse of X'X")?;
        let b = xtx_inv.dot(&xt.dot(&ya));
        let resid = &ya - &xa.dot(&b);
        let ssr = resid.dot(&resid);
        let y_mean = ya.mean().unwrap_or(0.0);
        let tss = ya.iter().map(|v| (v - y_mean) * (v - y_mean)).sum::<f64>();
        let df_resid = n as f64 - rank as f64;
        let sigma2 = if df_resid > 0.0 {
            ssr / df_resid
        } else {
            f64::NAN
        };
        let se = (0..xa.ncols())
            .map(|i| (sigma2 * xtx_inv[(i, i)]).abs().sqrt())
            .collect();
        trace!("ols solve: n={n}, p={}, rank={rank}, ssr={ssr}", xa.ncols());
        Ok(Core {
            b,
            se,
            ssr,
            tss,
            rank,
            nobs: n,
        })
    }
}

impl OlsEngine for PinvOls {
    fn fit(&self, y: &[f64], x: &Matrix) -> Result<OlsFit> {
        let core = self.solve(y, x)?;
        let df_resid = core.nobs as f64 - core.rank as f64;
        let b = core.b.to_vec();
        let t = t_stats(&b, &core.se);
        let p = t_pvalues(&t, df_resid);
        let ic = info_criteria(core.ssr, core.nobs, core.rank);
        let rsquared = if core.tss > 0.0 {
            1.0 - core.ssr / core.tss
        } else {
            f64::NAN
        };
        debug!(
            "ols fit: nobs={}, rank={}, ll={}, bic={}",
            core.nobs, core.rank, ic.ll, ic.bic
        );
        Ok(OlsFit {
            b,
            se: core.se,
            t,
            p,
            nobs: core.nobs,
            rank: core.rank,
            df_resid,
            ssr: core.ssr,
            rsquared,
            ic,
        })
    }

    fn fit_stripped(&self, y: &[f64], x: &Matrix) -> Result<OlsStripped> {
        let core = self.solve(y, x)?;
        let df_resid = core.nobs as f64 - core.rank as f64;
        let b = core.b.to_vec();
        let t = t_stats(&b, &core.se);
        let p = t_pvalues(&t, df_resid);
        Ok(OlsStripped { b, p })
    }
}

pub fn simple_ols(y: &[f64], x: &Matrix) -> Result<OlsFit> {
    PinvOls.fit(y, x)
}

pub fn stripped_ols(y: &[f64], x: &Matrix) -> Result<OlsStripped> {
    PinvOls.fit_stripped(y, x)
}

pub fn predict(x: &Matrix, b: &[f64]) -> Result<Vec<f64>> {
    x.iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() != b.len() {
                return Err(anyhow::anyhow!(
                    "row {i} has {} columns but {} coefficients were given",
                    row.len(),
                    b.len()
                ));
            }
            Ok(row.iter().zip(b).map(|(x, b)| x * b).sum())
        })
        .collect()
}

fn t_stats(b: &[f64], se: &[f64]) -> Vec<f64> {
    b.iter()
        .zip(se)
        .map(|(b, se)| if *se > 0.0 { b / se } else { f64::NAN })
        .collect()
}

fn design(y: &[f64], x: &Matrix) -> Result<(Array2<f64>, Array1<f64>)> {
    if y.is_empty() {
        return Err(anyhow::anyhow!("y must not be empty"));
    }
    if x.len() != y.len() {
        return Err(anyhow::anyhow!(
            "X rows ({}) must match y length ({})",
            x.len(),
            y.len()
        ));
    }
    let p = x.first().map(|row| row.len()).unwrap_or(0);
    if p == 0 {
        return Err(anyhow::anyhow!("X must have at least one column"));
    }
    let mut data = Vec::with_capacity(x.len() * p);
    for (i, row) in x.iter().enumerate() {
        if row.len() != p {
            return Err(anyhow::anyhow!(
                "X row {i} length {} does not match {p}",
                row.len()
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(anyhow::anyhow!("X row {i} contains non-finite values"));
        }
        data.extend_from_slice(row);
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(anyhow::anyhow!("y contains non-finite values"));
    }
    let xa = Array2::from_shape_vec((x.len(), p), data).context("X shape")?;
    Ok((xa, Array1::from_vec(y.to_vec())))
}
