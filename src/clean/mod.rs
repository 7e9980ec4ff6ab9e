//! Light-curve cleaning and detrending.
//!
//! Stages, in order:
//!
//! - drop samples with non-finite time/flux (or unusable errors)
//! - sort by time and drop repeated timestamps
//! - keep only samples with quality flag `0`
//! - iterative sigma clipping about the median
//! - Savitzky-Golay flattening per continuous segment
//!
//! Every stage is also exported on its own so callers (and tests) can run a
//! partial pipeline.

pub mod flatten;
pub mod savgol;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{CleanConfig, TimeSeries};
use crate::error::CleanError;
use crate::math::{median, std_dev};

pub use flatten::{flatten, split_at_gaps};
pub use savgol::savgol_filter;

/// Fewest samples any later stage can work with.
pub const MIN_CLEAN_SAMPLES: usize = 3;

/// Sigma-clipping iteration cap.
const MAX_CLIP_ITERS: usize = 5;

/// How many samples each stage removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub input: usize,
    pub non_finite: usize,
    pub duplicate_times: usize,
    pub bad_quality: usize,
    pub clipped: usize,
    pub output: usize,
}

#[derive(Debug, Clone)]
pub struct CleanOutput {
    /// Flattened series, ready for the search.
    pub series: TimeSeries,
    /// Trend that was divided out, aligned with `series`.
    pub trend: Vec<f64>,
    pub report: CleanReport,
}

pub fn clean_and_flatten(series: &TimeSeries, config: &CleanConfig) -> Result<CleanOutput, CleanError> {
    if !(config.sigma_clip.is_finite() && config.sigma_clip > 0.0) {
        return Err(CleanError::InvalidParameter(format!(
            "sigma clip must be > 0 (got {})",
            config.sigma_clip
        )));
    }

    let mut report = CleanReport {
        input: series.len(),
        ..CleanReport::default()
    };

    let finite = remove_non_finite(series);
    report.non_finite = series.len() - finite.len();
    ensure_enough("non-finite removal", finite.len())?;

    let sorted = sort_and_dedupe(&finite);
    report.duplicate_times = finite.len() - sorted.len();

    let good = apply_quality_mask(&sorted);
    report.bad_quality = sorted.len() - good.len();
    ensure_enough("quality masking", good.len())?;

    let keep = sigma_clip_mask(&good.flux, config.sigma_clip, MAX_CLIP_ITERS);
    let clipped = good.select(&keep);
    report.clipped = good.len() - clipped.len();
    ensure_enough("sigma clipping", clipped.len())?;

    let (flat, trend) = flatten(&clipped, config)?;
    report.output = flat.len();

    info!(
        input = report.input,
        output = report.output,
        clipped = report.clipped,
        bad_quality = report.bad_quality,
        "cleaned light curve"
    );
    debug!(?report, "cleaning report");

    Ok(CleanOutput {
        series: flat,
        trend,
        report,
    })
}

fn ensure_enough(stage: &'static str, remaining: usize) -> Result<(), CleanError> {
    if remaining < MIN_CLEAN_SAMPLES {
        return Err(CleanError::TooFewSamples {
            stage,
            remaining,
            required: MIN_CLEAN_SAMPLES,
        });
    }
    Ok(())
}

/// Drop samples with NaN/inf time or flux, and (when errors are present)
/// samples whose error is not finite and positive.
pub fn remove_non_finite(series: &TimeSeries) -> TimeSeries {
    let keep: Vec<bool> = (0..series.len())
        .map(|i| {
            let ok = series.time[i].is_finite() && series.flux[i].is_finite();
            let err_ok = series
                .flux_err
                .as_ref()
                .is_none_or(|e| e[i].is_finite() && e[i] > 0.0);
            ok && err_ok
        })
        .collect();
    series.select(&keep)
}

/// Sort by time, keeping the first of any run of equal timestamps.
pub fn sort_and_dedupe(series: &TimeSeries) -> TimeSeries {
    let sorted = series.sorted_by_time();
    let keep: Vec<bool> = (0..sorted.len())
        .map(|i| i == 0 || sorted.time[i] > sorted.time[i - 1])
        .collect();
    sorted.select(&keep)
}

/// Keep samples with quality flag `0`; series without flags pass through.
pub fn apply_quality_mask(series: &TimeSeries) -> TimeSeries {
    match &series.quality {
        Some(q) => {
            let keep: Vec<bool> = q.iter().map(|&flag| flag == 0).collect();
            series.select(&keep)
        }
        None => series.clone(),
    }
}

/// Iterative two-sided clipping about the median.
///
/// Returns the keep mask. Stops early when nothing changes or the spread
/// collapses to zero.
pub fn sigma_clip_mask(values: &[f64], sigma: f64, max_iters: usize) -> Vec<bool> {
    let mut keep = vec![true; values.len()];
    for _ in 0..max_iters {
        let kept: Vec<f64> = values
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| *v)
            .collect();
        let (Some(center), Some(spread)) = (median(&kept), std_dev(&kept)) else {
            break;
        };
        if !(spread > 0.0) {
            break;
        }

        let mut changed = false;
        for (k, v) in keep.iter_mut().zip(values) {
            if *k && (v - center).abs() > sigma * spread {
                *k = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_flat(n: usize) -> TimeSeries {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
        let flux: Vec<f64> = (0..n)
            .map(|i| 1.0 + 1e-4 * (((i * 37) % 17) as f64 - 8.0) / 8.0)
            .collect();
        TimeSeries::new(time, flux, None, None).unwrap()
    }

    #[test]
    fn removes_nans_and_bad_errors() {
        let ts = TimeSeries::new(
            vec![0.0, 1.0, f64::NAN, 3.0, 4.0],
            vec![1.0, f64::NAN, 1.0, 1.0, 1.0],
            Some(vec![0.1, 0.1, 0.1, 0.0, 0.1]),
            None,
        )
        .unwrap();
        let out = remove_non_finite(&ts);
        assert_eq!(out.time, vec![0.0, 4.0]);
    }

    #[test]
    fn sort_and_dedupe_keeps_first_of_equal_times() {
        let ts = TimeSeries::new(vec![2.0, 1.0, 2.0, 3.0], vec![20.0, 10.0, 21.0, 30.0], None, None).unwrap();
        let out = sort_and_dedupe(&ts);
        assert_eq!(out.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(out.flux, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn quality_mask_keeps_zero_flags() {
        let ts = TimeSeries::new(vec![0.0, 1.0, 2.0], vec![1.0; 3], None, Some(vec![0, 128, 0])).unwrap();
        assert_eq!(apply_quality_mask(&ts).time, vec![0.0, 2.0]);
    }

    #[test]
    fn sigma_clip_rejects_outliers_on_both_tails() {
        let mut values: Vec<f64> = (0..100).map(|i| 1.0 + 0.001 * ((i % 5) as f64 - 2.0)).collect();
        values[10] = 2.0;
        values[50] = 0.0;
        let keep = sigma_clip_mask(&values, 5.0, 5);
        assert!(!keep[10]);
        assert!(!keep[50]);
        assert_eq!(keep.iter().filter(|k| **k).count(), 98);
    }

    #[test]
    fn full_pipeline_reports_stage_counts() {
        let mut ts = noisy_flat(1000);
        ts.flux[3] = f64::NAN;
        ts.flux[500] = 5.0;
        ts.quality = Some((0..1000).map(|i| if i == 700 { 1 } else { 0 }).collect());

        let out = clean_and_flatten(&ts, &CleanConfig::default()).unwrap();
        assert_eq!(out.report.input, 1000);
        assert_eq!(out.report.non_finite, 1);
        assert_eq!(out.report.bad_quality, 1);
        assert_eq!(out.report.clipped, 1);
        assert_eq!(out.report.output, 997);
        assert_eq!(out.series.len(), 997);
        assert!(out.series.flux.iter().all(|f| (f - 1.0).abs() < 1e-3));
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let ts = TimeSeries::new(vec![0.0, 1.0, 2.0], vec![1.0, f64::NAN, 1.0], None, None).unwrap();
        let err = clean_and_flatten(&ts, &CleanConfig::default()).unwrap_err();
        assert_eq!(
            err,
            CleanError::TooFewSamples {
                stage: "non-finite removal",
                remaining: 2,
                required: 3
            }
        );
    }
}
