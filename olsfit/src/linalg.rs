use anyhow::Result;
use ndarray::{Array1, Array2};
use ndarray_linalg::{Eigh, UPLO};

pub fn inverse_from_eigh(
    eigvals: &Array1<f64>,
    eigvecs: &Array2<f64>,
    threshold: Option<f64>,
) -> Array2<f64> {
    let mut inv_vals = eigvals.to_vec();
    for v in &mut inv_vals {
        *v = match threshold {
            Some(t) if *v <= t => 0.0,
            _ => 1.0 / *v,
        };
    }
    let inv_diag = Array2::from_diag(&Array1::from_vec(inv_vals));
    eigvecs.dot(&inv_diag).dot(&eigvecs.t())
}

/// Pseudo-inverse of a symmetric positive semi-definite matrix along with its
/// numerical rank.
pub fn pinv_symmetric(matrix: &Array2<f64>) -> Result<(Array2<f64>, usize)> {
    let (eigvals, eigvecs) = matrix.eigh(UPLO::Lower)?;
    let max_eig = eigvals.iter().cloned().fold(0.0_f64, f64::max);
    let threshold = max_eig * (matrix.nrows().max(1) as f64) * f64::EPSILON;
    let rank = eigvals.iter().filter(|v| **v > threshold).count();
    Ok((inverse_from_eigh(&eigvals, &eigvecs, Some(threshold)), rank))
}
