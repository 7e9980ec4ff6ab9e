//! Least squares helpers for local polynomial fits.
//!
//! The detrending filter repeatedly fits low-order polynomials to windows of a
//! light curve:
//!
//! ```text
//! minimize Σ (y_i - Σ_j β_j x_i^j)^2
//! ```
//!
//! Implementation choices:
//! - Abscissae are rescaled to `[-1, 1]` before building the Vandermonde
//!   matrix so that wide windows (hundreds of cadences) stay well conditioned.
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Vandermonde design matrix: row `i` is `[1, x_i, x_i^2, ..., x_i^order]`.
pub fn polynomial_design(xs: &[f64], order: usize) -> DMatrix<f64> {
    DMatrix::from_fn(xs.len(), order + 1, |i, j| xs[i].powi(j as i32))
}

/// Evaluate `Σ β_j x^j` (Horner).
pub fn polynomial_eval(beta: &DVector<f64>, x: f64) -> f64 {
    beta.iter().rev().fold(0.0, |acc, &b| acc * x + b)
}

/// Least-squares polynomial fit of `ys` against `xs`.
pub fn polyfit(xs: &[f64], ys: &[f64], order: usize) -> Option<DVector<f64>> {
    if xs.len() != ys.len() || xs.len() <= order {
        return None;
    }
    let design = polynomial_design(xs, order);
    let y = DVector::from_column_slice(ys);
    solve_least_squares(&design, &y)
}
