//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during cleaning and the period search
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column length mismatch when assembling a [`TimeSeries`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column length mismatch: time has {expected} samples, {column} has {actual}")]
pub struct ColumnLengthError {
    pub column: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// A light curve: ordered `(t, flux, flux_err?)` samples.
///
/// Columns are stored separately (struct-of-arrays) because every consumer
/// (cleaning, folding, plotting) walks one or two columns at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    /// Per-sample flux uncertainty. `None` means uniform weighting.
    pub flux_err: Option<Vec<f64>>,
    /// Pipeline quality flags (`0` = good). `None` means all samples are good.
    pub quality: Option<Vec<i32>>,
}

impl TimeSeries {
    pub fn new(
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Option<Vec<f64>>,
        quality: Option<Vec<i32>>,
    ) -> Result<Self, ColumnLengthError> {
        let n = time.len();
        check_len("flux", n, flux.len())?;
        if let Some(err) = &flux_err {
            check_len("flux_err", n, err.len())?;
        }
        if let Some(q) = &quality {
            check_len("quality", n, q.len())?;
        }
        Ok(Self {
            time,
            flux,
            flux_err,
            quality,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time span `last - first` (0 for fewer than two samples).
    pub fn baseline(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }

    /// Keep only the samples where `keep[i]` is true.
    pub fn select(&self, keep: &[bool]) -> TimeSeries {
        fn pick<T: Copy>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep.iter())
                .filter_map(|(v, &k)| if k { Some(*v) } else { None })
                .collect()
        }

        TimeSeries {
            time: pick(&self.time, keep),
            flux: pick(&self.flux, keep),
            flux_err: self.flux_err.as_ref().map(|e| pick(e, keep)),
            quality: self.quality.as_ref().map(|q| pick(q, keep)),
        }
    }

    /// Reorder samples by ascending time (stable for equal timestamps).
    pub fn sorted_by_time(&self) -> TimeSeries {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            self.time[a]
                .partial_cmp(&self.time[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        TimeSeries {
            time: order.iter().map(|&i| self.time[i]).collect(),
            flux: order.iter().map(|&i| self.flux[i]).collect(),
            flux_err: self
                .flux_err
                .as_ref()
                .map(|e| order.iter().map(|&i| e[i]).collect()),
            quality: self
                .quality
                .as_ref()
                .map(|q| order.iter().map(|&i| q[i]).collect()),
        }
    }

    /// Median spacing between consecutive samples.
    pub fn median_cadence(&self) -> Option<f64> {
        let mut dt: Vec<f64> = self
            .time
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| d.is_finite() && *d > 0.0)
            .collect();
        crate::math::median_mut(&mut dt)
    }
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<(), ColumnLengthError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ColumnLengthError {
            column,
            expected,
            actual,
        })
    }
}

/// One observation segment (e.g. one TESS sector) as delivered by a source.
#[derive(Debug, Clone)]
pub struct LightCurveSegment {
    pub sector: Option<u32>,
    /// File name or other human-readable origin.
    pub origin: String,
    pub series: TimeSeries,
}

/// What to acquire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetQuery {
    /// Target identifier (e.g. `TIC 261136679` or `Pi Men`).
    pub target: String,
    pub sector: Option<u32>,
}

/// Bounds and resolution of the period search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub min_period: f64,
    pub max_period: f64,
    /// Absolute duration bounds (days), not phase fractions.
    pub min_duration: f64,
    pub max_duration: f64,
    pub duration_steps: usize,
    /// Phase bins per minimum duration.
    pub oversample: usize,
    /// Multiplier on the frequency step (`< 1` makes the period grid denser).
    pub frequency_factor: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_period: 0.5,
            max_period: 30.0,
            min_duration: 0.05,
            max_duration: 0.3,
            duration_steps: 10,
            oversample: 10,
            frequency_factor: 1.0,
        }
    }
}

/// Parameters of the cleaning/flattening stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Outlier rejection threshold (standard deviations).
    pub sigma_clip: f64,
    /// Savitzky-Golay window (cadences, forced odd).
    pub window_length: usize,
    pub polyorder: usize,
    /// Gaps larger than this multiple of the median cadence split the trend fit.
    pub break_tolerance: f64,
    /// Trend re-fits with residual masking.
    pub flatten_iters: usize,
    /// Residual clip used while fitting the trend.
    pub flatten_sigma: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            sigma_clip: 5.0,
            window_length: 401,
            polyorder: 2,
            break_tolerance: 5.0,
            flatten_iters: 3,
            flatten_sigma: 3.0,
        }
    }
}

/// The best window found at one trial period.
///
/// Unscored periods (no window with in-transit samples and a positive depth)
/// carry NaN in every field except `period`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub period: f64,
    pub power: f64,
    pub snr: f64,
    pub depth: f64,
    pub depth_err: f64,
    pub transit_time: f64,
    pub duration: f64,
}

impl ScoreRecord {
    pub fn unscored(period: f64) -> Self {
        Self {
            period,
            power: f64::NAN,
            snr: f64::NAN,
            depth: f64::NAN,
            depth_err: f64::NAN,
            transit_time: f64::NAN,
            duration: f64::NAN,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.snr.is_finite()
    }
}

/// Per-period search output, one entry per trial period (ascending).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreCurve {
    pub period: Vec<f64>,
    pub power: Vec<f64>,
    pub snr: Vec<f64>,
    pub depth: Vec<f64>,
    pub depth_err: Vec<f64>,
    pub transit_time: Vec<f64>,
    pub duration: Vec<f64>,
}

impl ScoreCurve {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            period: Vec::with_capacity(n),
            power: Vec::with_capacity(n),
            snr: Vec::with_capacity(n),
            depth: Vec::with_capacity(n),
            depth_err: Vec::with_capacity(n),
            transit_time: Vec::with_capacity(n),
            duration: Vec::with_capacity(n),
        }
    }

    pub fn from_records(records: &[ScoreRecord]) -> Self {
        let mut curve = Self::with_capacity(records.len());
        for r in records {
            curve.push(*r);
        }
        curve
    }

    pub fn push(&mut self, r: ScoreRecord) {
        self.period.push(r.period);
        self.power.push(r.power);
        self.snr.push(r.snr);
        self.depth.push(r.depth);
        self.depth_err.push(r.depth_err);
        self.transit_time.push(r.transit_time);
        self.duration.push(r.duration);
    }

    pub fn len(&self) -> usize {
        self.period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_empty()
    }

    pub fn record(&self, i: usize) -> ScoreRecord {
        ScoreRecord {
            period: self.period[i],
            power: self.power[i],
            snr: self.snr[i],
            depth: self.depth[i],
            depth_err: self.depth_err[i],
            transit_time: self.transit_time[i],
            duration: self.duration[i],
        }
    }

    /// Copy without the unscored (NaN) entries.
    pub fn scored_only(&self) -> ScoreCurve {
        let mut out = ScoreCurve::with_capacity(self.len());
        for i in 0..self.len() {
            let r = self.record(i);
            if r.is_scored() {
                out.push(r);
            }
        }
        out
    }

    /// `(period, snr)` pairs for scored periods only.
    pub fn snr_points(&self) -> Vec<(f64, f64)> {
        self.period
            .iter()
            .zip(self.snr.iter())
            .filter(|(_, s)| s.is_finite())
            .map(|(&p, &s)| (p, s))
            .collect()
    }
}

/// Terminal output of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    pub period: f64,
    /// Mid-transit reference epoch, in the time system of the input series.
    pub transit_time: f64,
    pub duration: f64,
    pub depth: f64,
    pub depth_err: f64,
    pub snr: f64,
    pub power: f64,
    pub score_curve: ScoreCurve,
}

impl BestFit {
    pub fn from_record(r: ScoreRecord, score_curve: ScoreCurve) -> Self {
        Self {
            period: r.period,
            transit_time: r.transit_time,
            duration: r.duration,
            depth: r.depth,
            depth_err: r.depth_err,
            snr: r.snr,
            power: r.power,
            score_curve,
        }
    }

    pub fn record(&self) -> ScoreRecord {
        ScoreRecord {
            period: self.period,
            power: self.power,
            snr: self.snr,
            depth: self.depth,
            depth_err: self.depth_err,
            transit_time: self.transit_time,
            duration: self.duration,
        }
    }

    /// Signed offset from the nearest mid-transit, in `[-period/2, period/2)`.
    pub fn phase_offset(&self, t: f64) -> f64 {
        fold_centered(t, self.transit_time, self.period)
    }
}

/// Fold `t` about `epoch` so that mid-transit sits at 0.
pub fn fold_centered(t: f64, epoch: f64, period: f64) -> f64 {
    (t - epoch + 0.5 * period).rem_euclid(period) - 0.5 * period
}

/// Folded flux averaged in equal-width phase bins (empty bins omitted).
///
/// `phase` is the bin center in days relative to mid-transit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseFoldGrid {
    pub phase: Vec<f64>,
    pub flux: Vec<f64>,
    pub count: Vec<usize>,
}

impl PhaseFoldGrid {
    pub fn build(series: &TimeSeries, period: f64, epoch: f64, bins: usize) -> Self {
        let bins = bins.max(1);
        if !(period.is_finite() && period > 0.0 && epoch.is_finite()) {
            return Self::default();
        }
        let width = period / bins as f64;
        let mut sum = vec![0.0; bins];
        let mut count = vec![0usize; bins];
        for (&t, &f) in series.time.iter().zip(series.flux.iter()) {
            if !(t.is_finite() && f.is_finite()) {
                continue;
            }
            let phase = fold_centered(t, epoch, period) + 0.5 * period;
            let idx = ((phase / width) as usize).min(bins - 1);
            sum[idx] += f;
            count[idx] += 1;
        }

        let mut out = Self::default();
        for i in 0..bins {
            if count[i] > 0 {
                out.phase.push((i as f64 + 0.5) * width - 0.5 * period);
                out.flux.push(sum[i] / count[i] as f64);
                out.count.push(count[i]);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.phase.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phase.is_empty()
    }
}

/// Everything a finished run persists to `result.json`.
///
/// NaNs do not survive JSON, so the score curve holds scored periods only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub target: String,
    pub sector: Option<u32>,
    pub samples: usize,
    pub search: SearchConfig,
    pub clean: CleanConfig,
    pub best: ScoreRecord,
    pub peaks: Vec<ScoreRecord>,
    pub score_curve: ScoreCurve,
    pub phase_fold: PhaseFoldGrid,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target identifier; also used as the report label for local inputs.
    pub target: String,
    pub sector: Option<u32>,
    /// Read a local CSV light curve instead of querying the archive.
    pub input: Option<PathBuf>,
    pub out_dir: PathBuf,

    pub search: SearchConfig,
    pub clean: CleanConfig,

    pub top_n: usize,
    pub plot: bool,
    pub animation: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_columns() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![1.0], None, None).unwrap_err();
        assert_eq!(err.column, "flux");
        assert_eq!(err.actual, 1);
    }

    #[test]
    fn select_and_sort_keep_columns_aligned() {
        let ts = TimeSeries::new(
            vec![3.0, 1.0, 2.0],
            vec![30.0, 10.0, 20.0],
            Some(vec![0.3, 0.1, 0.2]),
            Some(vec![3, 1, 2]),
        )
        .unwrap();

        let sorted = ts.sorted_by_time();
        assert_eq!(sorted.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(sorted.flux, vec![10.0, 20.0, 30.0]);
        assert_eq!(sorted.flux_err, Some(vec![0.1, 0.2, 0.3]));
        assert_eq!(sorted.quality, Some(vec![1, 2, 3]));

        let picked = sorted.select(&[true, false, true]);
        assert_eq!(picked.time, vec![1.0, 3.0]);
        assert_eq!(picked.quality, Some(vec![1, 3]));
        assert!((picked.baseline() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn phase_fold_grid_centers_transit() {
        let time: Vec<f64> = (0..400).map(|i| i as f64 * 0.025).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|&t| if fold_centered(t, 0.5, 2.0).abs() < 0.1 { 0.99 } else { 1.0 })
            .collect();
        let ts = TimeSeries::new(time, flux, None, None).unwrap();

        let grid = PhaseFoldGrid::build(&ts, 2.0, 0.5, 20);
        assert_eq!(grid.len(), 20);
        assert_eq!(grid.count.iter().sum::<usize>(), 400);
        // Bins 9 and 10 straddle phase 0.
        assert!(grid.flux[9] < 1.0 && grid.flux[10] < 1.0);
        assert_eq!(grid.flux[0], 1.0);
        assert!(PhaseFoldGrid::build(&ts, f64::NAN, 0.5, 20).is_empty());
    }

    #[test]
    fn scored_only_drops_nan_entries() {
        let mut curve = ScoreCurve::default();
        curve.push(ScoreRecord::unscored(1.0));
        curve.push(ScoreRecord {
            period: 2.0,
            power: 8.0,
            snr: 4.0,
            depth: 0.01,
            depth_err: 0.0025,
            transit_time: 0.3,
            duration: 0.1,
        });
        let scored = curve.scored_only();
        assert_eq!(scored.period, vec![2.0]);
    }

    #[test]
    fn fold_centered_puts_epoch_at_zero() {
        assert!(fold_centered(1.0, 1.0, 3.5).abs() < 1e-12);
        assert!((fold_centered(4.6, 1.0, 3.5) - 0.1).abs() < 1e-12);
        assert!((fold_centered(4.4, 1.0, 3.5) + 0.1).abs() < 1e-12);
    }
}
