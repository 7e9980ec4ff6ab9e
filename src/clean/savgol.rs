//! Savitzky-Golay smoothing.
//!
//! Interior samples use the fixed convolution coefficients of a least-squares
//! polynomial of order `polyorder` over `window` samples. The first and last
//! `window / 2` samples are taken from a polynomial fitted to the first/last
//! full window and evaluated at their positions (scipy's `mode="interp"`).

use nalgebra::DVector;

use crate::error::CleanError;
use crate::math::{polyfit, polynomial_design, polynomial_eval};

const PINV_EPS: f64 = 1e-12;

/// Smoothed copy of `y`, treating samples as evenly spaced.
pub fn savgol_filter(y: &[f64], window: usize, polyorder: usize) -> Result<Vec<f64>, CleanError> {
    let n = y.len();
    if window % 2 == 0 {
        return Err(CleanError::InvalidParameter(format!(
            "window length must be odd (got {window})"
        )));
    }
    if window > n {
        return Err(CleanError::InvalidParameter(format!(
            "window length {window} exceeds the {n} available samples"
        )));
    }
    if polyorder >= window {
        return Err(CleanError::InvalidParameter(format!(
            "polyorder {polyorder} must be less than window length {window}"
        )));
    }
    if window == 1 {
        return Ok(y.to_vec());
    }

    let half = window / 2;
    let xs: Vec<f64> = (0..window)
        .map(|j| (j as f64 - half as f64) / half as f64)
        .collect();

    let coeffs = center_coefficients(&xs, polyorder)?;

    let mut out = vec![0.0; n];
    for i in half..n - half {
        let start = i - half;
        out[i] = coeffs
            .iter()
            .zip(&y[start..start + window])
            .map(|(c, v)| c * v)
            .sum();
    }

    fit_edge(&xs, &y[..window], polyorder, 0..half, 0, &mut out)?;
    let tail = n - window;
    fit_edge(&xs, &y[tail..], polyorder, half + 1..window, tail, &mut out)?;

    Ok(out)
}

/// Weights that evaluate the local fit at the window center (row 0 of the
/// design pseudo-inverse, i.e. the constant term).
fn center_coefficients(xs: &[f64], polyorder: usize) -> Result<DVector<f64>, CleanError> {
    let design = polynomial_design(xs, polyorder);
    let pinv = design
        .pseudo_inverse(PINV_EPS)
        .map_err(|e| CleanError::InvalidParameter(format!("savgol coefficients: {e}")))?;
    Ok(pinv.row(0).transpose())
}

fn fit_edge(
    xs: &[f64],
    ys: &[f64],
    polyorder: usize,
    positions: std::ops::Range<usize>,
    offset: usize,
    out: &mut [f64],
) -> Result<(), CleanError> {
    let beta = polyfit(xs, ys, polyorder).ok_or_else(|| {
        CleanError::InvalidParameter("savgol edge fit is ill-conditioned".to_string())
    })?;
    for j in positions {
        out[offset + j] = polynomial_eval(&beta, xs[j]);
    }
    Ok(())
}
