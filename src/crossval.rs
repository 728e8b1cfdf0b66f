use anyhow::Result;
use olsfit::stats::rmse;
use olsfit::{OlsEngine, PinvOls, predict};
use tracing::debug;

use crate::frame::Design;
use crate::qc::check_kfold;

/// Contiguous, unshuffled folds; the first `n % k` folds take one extra row.
pub fn kfold_splits(n: usize, k: usize) -> Vec<std::ops::Range<usize>> {
    let base = n / k;
    let extra = n % k;
    let mut out = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let len = base + usize::from(fold < extra);
        out.push(start..start + len);
        start += len;
    }
    out
}

/// Mean out-of-fold RMSE of the specification.
pub fn kfold_rmse(design: &Design, k: usize) -> Result<f64> {
    let n = design.nobs();
    check_kfold(k, n)?;
    let mut metrics = Vec::with_capacity(k);
    for test in kfold_splits(n, k) {
        let train: Vec<usize> = (0..n).filter(|i| !test.contains(i)).collect();
        let test: Vec<usize> = test.collect();
        let train = design.subset(&train);
        let held_out = design.subset(&test);
        let fit = PinvOls.fit(&train.y, &train.x)?;
        let y_pred = predict(&held_out.x, &fit.b)?;
        metrics.push(rmse(&held_out.y, &y_pred));
    }
    let mean = metrics.iter().sum::<f64>() / metrics.len() as f64;
    debug!("kfold: k={k}, n={n}, rmse={mean}");
    Ok(mean)
}
