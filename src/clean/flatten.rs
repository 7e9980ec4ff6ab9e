//! Trend removal.
//!
//! The series is split into continuous segments at gaps. Each segment gets an
//! iteratively re-fitted Savitzky-Golay trend: after every pass, samples whose
//! residual exceeds `flatten_sigma` standard deviations (transits, flares) are
//! masked, the trend is re-fitted on the rest, and masked samples receive a
//! linearly interpolated trend value.

use tracing::debug;

use crate::clean::savgol::savgol_filter;
use crate::domain::{CleanConfig, TimeSeries};
use crate::error::CleanError;
use crate::math::{interp_linear, median, std_dev};

/// Flattened series (flux and errors divided by the trend) plus the trend.
pub fn flatten(series: &TimeSeries, config: &CleanConfig) -> Result<(TimeSeries, Vec<f64>), CleanError> {
    if config.polyorder >= config.window_length {
        return Err(CleanError::InvalidParameter(format!(
            "polyorder {} must be less than window length {}",
            config.polyorder, config.window_length
        )));
    }
    if !(config.break_tolerance.is_finite() && config.break_tolerance > 0.0) {
        return Err(CleanError::InvalidParameter(format!(
            "break tolerance must be > 0 (got {})",
            config.break_tolerance
        )));
    }

    let mut trend = Vec::with_capacity(series.len());
    let segments = split_at_gaps(&series.time, config.break_tolerance);
    debug!(segments = segments.len(), "flattening");
    for range in segments {
        let t = &series.time[range.clone()];
        let y = &series.flux[range];
        trend.extend(segment_trend(t, y, config)?);
    }

    let mut out = series.clone();
    for (f, tr) in out.flux.iter_mut().zip(trend.iter()) {
        *f /= tr;
    }
    if let Some(err) = out.flux_err.as_mut() {
        for (e, tr) in err.iter_mut().zip(trend.iter()) {
            *e /= tr;
        }
    }
    Ok((out, trend))
}

/// Index ranges of continuous stretches; a step larger than
/// `tolerance × median cadence` starts a new one.
pub fn split_at_gaps(time: &[f64], tolerance: f64) -> Vec<std::ops::Range<usize>> {
    if time.is_empty() {
        return Vec::new();
    }
    let steps: Vec<f64> = time.windows(2).map(|w| w[1] - w[0]).collect();
    let Some(cadence) = median(&steps) else {
        return vec![0..time.len()];
    };
    let limit = tolerance * cadence;

    let mut out = Vec::new();
    let mut start = 0;
    for (i, dt) in steps.iter().enumerate() {
        if *dt > limit {
            out.push(start..i + 1);
            start = i + 1;
        }
    }
    out.push(start..time.len());
    out
}

fn segment_trend(t: &[f64], y: &[f64], config: &CleanConfig) -> Result<Vec<f64>, CleanError> {
    let n = y.len();
    let level = median(y).unwrap_or(1.0);

    let mut keep = vec![true; n];
    let mut trend = vec![level; n];
    for pass in 0..config.flatten_iters.max(1) {
        let kept_t: Vec<f64> = t.iter().zip(&keep).filter(|(_, k)| **k).map(|(v, _)| *v).collect();
        let kept_y: Vec<f64> = y.iter().zip(&keep).filter(|(_, k)| **k).map(|(v, _)| *v).collect();

        let mut window = config.window_length.min(kept_y.len());
        if window % 2 == 0 {
            window = window.saturating_sub(1);
        }
        if window <= config.polyorder {
            // Too short for a polynomial trend.
            return Ok(vec![level; n]);
        }

        let smooth = savgol_filter(&kept_y, window, config.polyorder)?;
        for (i, &ti) in t.iter().enumerate() {
            trend[i] = interp_linear(&kept_t, &smooth, ti).unwrap_or(level);
        }

        let residuals: Vec<f64> = y.iter().zip(&trend).map(|(v, tr)| v - tr).collect();
        let kept_res: Vec<f64> = residuals
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(r, _)| *r)
            .collect();
        let spread = std_dev(&kept_res).unwrap_or(0.0);
        if !(spread > 0.0) {
            break;
        }
        let next: Vec<bool> = residuals
            .iter()
            .map(|r| r.abs() <= config.flatten_sigma * spread)
            .collect();
        if next == keep || next.iter().filter(|k| **k).count() <= config.polyorder + 1 {
            break;
        }
        debug!(pass, masked = next.iter().filter(|k| !**k).count(), "trend mask updated");
        keep = next;
    }

    for tr in trend.iter_mut() {
        if !(tr.is_finite() && *tr > 0.0) {
            *tr = level;
        }
    }
    Ok(trend)
}
