//! Box-transit scoring for a single trial period.
//!
//! For each trial period we:
//!
//! 1. fold every sample into phase `(t - t_ref) mod period`
//! 2. accumulate per-bin sums (count, Σw, Σw·y, Σw·y²) on a phase grid of
//!    about `shortest resolved duration / oversample`, shrunk so a whole
//!    number of bins spans the period
//! 3. slide a window of each trial duration across the bins (wrapping at the
//!    period boundary) and score the in-window vs out-of-window split
//!
//! The score is the depth signal-to-noise ratio:
//!
//! ```text
//! depth     = mean_out - mean_in
//! depth_err = sqrt(1/W_in + 1/W_out)              (weights 1/σ²)
//!           = s * sqrt(1/n_in + 1/n_out)          (uniform weights)
//! snr       = depth / depth_err
//! power     = snr² / 2
//! ```
//!
//! where `s²` is the pooled residual variance of the two-level box model, so
//! an unweighted search still reports a noise-normalized SNR.

use crate::domain::{ScoreRecord, TimeSeries};
use crate::error::SearchError;

/// Smallest series the scorer accepts (the pooled variance needs `n - 2 > 0`).
pub const MIN_SAMPLES: usize = 3;

/// Floor on the pooled residual variance (noise-free synthetic data).
const MIN_VARIANCE: f64 = 1e-24;

/// Immutable, validated view of a cleaned series.
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    time: Vec<f64>,
    /// Flux minus its weighted mean; depth is invariant to the shift and the
    /// per-bin Σw·y² sums keep more precision.
    flux: Vec<f64>,
    weights: Vec<f64>,
    weighted: bool,
    t_ref: f64,
    cadence: f64,
}

impl PreparedSeries {
    pub fn new(series: &TimeSeries) -> Result<Self, SearchError> {
        let n = series.len();
        if n < MIN_SAMPLES {
            return Err(SearchError::InvalidSeries(format!(
                "need at least {MIN_SAMPLES} samples, got {n}"
            )));
        }
        if series.flux.len() != n {
            return Err(SearchError::InvalidSeries("flux length mismatch".to_string()));
        }
        if series.time.iter().chain(series.flux.iter()).any(|v| !v.is_finite()) {
            return Err(SearchError::InvalidSeries(
                "time/flux contain non-finite values; clean the series first".to_string(),
            ));
        }
        if series.time.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SearchError::InvalidSeries(
                "time must be strictly increasing".to_string(),
            ));
        }

        let (weights, weighted) = match &series.flux_err {
            Some(err) => {
                if err.len() != n {
                    return Err(SearchError::InvalidSeries(
                        "flux_err length mismatch".to_string(),
                    ));
                }
                if err.iter().any(|e| !(e.is_finite() && *e > 0.0)) {
                    return Err(SearchError::InvalidSeries(
                        "flux_err must be finite and > 0".to_string(),
                    ));
                }
                (err.iter().map(|e| 1.0 / (e * e)).collect::<Vec<_>>(), true)
            }
            None => (vec![1.0; n], false),
        };

        let w_sum: f64 = weights.iter().sum();
        let level = weights
            .iter()
            .zip(series.flux.iter())
            .map(|(w, y)| w * y)
            .sum::<f64>()
            / w_sum;

        let cadence = series.median_cadence().unwrap_or(0.0);

        Ok(Self {
            time: series.time.clone(),
            flux: series.flux.iter().map(|y| y - level).collect(),
            weights,
            weighted,
            t_ref: series.time[0],
            cadence,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn baseline(&self) -> f64 {
        self.time[self.time.len() - 1] - self.t_ref
    }

    /// Median sampling interval.
    pub fn cadence(&self) -> f64 {
        self.cadence
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }
}

/// Scores trial periods against a fixed duration grid.
#[derive(Debug, Clone)]
pub struct BoxScorer<'a> {
    series: &'a PreparedSeries,
    durations: &'a [f64],
    /// Nominal phase-bin width; the per-period width never exceeds it.
    bin_width: f64,
    /// `false` when the duration is shorter than the sampling cadence.
    resolved: Vec<bool>,
    totals: BinSums,
}

#[derive(Debug, Clone, Copy, Default)]
struct BinSums {
    n: usize,
    w: f64,
    wy: f64,
    wyy: f64,
}

impl BinSums {
    fn add(&mut self, w: f64, y: f64) {
        self.n += 1;
        self.w += w;
        self.wy += w * y;
        self.wyy += w * y * y;
    }

    fn sub(&self, other: &BinSums) -> BinSums {
        BinSums {
            n: self.n - other.n,
            w: self.w - other.w,
            wy: self.wy - other.wy,
            wyy: self.wyy - other.wyy,
        }
    }

    fn plus(&self, other: &BinSums) -> BinSums {
        BinSums {
            n: self.n + other.n,
            w: self.w + other.w,
            wy: self.wy + other.wy,
            wyy: self.wyy + other.wyy,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowScore {
    snr: f64,
    depth: f64,
    depth_err: f64,
    start_bin: usize,
    bins: usize,
    duration_idx: usize,
}

impl<'a> BoxScorer<'a> {
    pub fn new(
        series: &'a PreparedSeries,
        durations: &'a [f64],
        oversample: usize,
    ) -> Result<Self, SearchError> {
        if durations.is_empty() {
            return Err(SearchError::InvalidRange(
                "duration candidates are empty".to_string(),
            ));
        }
        if oversample == 0 {
            return Err(SearchError::InvalidRange("oversample must be >= 1".to_string()));
        }

        let resolved: Vec<bool> = durations.iter().map(|&d| d >= series.cadence).collect();
        let shortest = durations
            .iter()
            .zip(resolved.iter())
            .filter(|(_, ok)| **ok)
            .map(|(&d, _)| d)
            .fold(f64::INFINITY, f64::min);
        // With nothing resolvable the width only has to be positive.
        let shortest = if shortest.is_finite() {
            shortest
        } else {
            durations.iter().copied().fold(f64::INFINITY, f64::min)
        };
        let bin_width = shortest / oversample as f64;

        let mut totals = BinSums::default();
        for (&w, &y) in series.weights.iter().zip(series.flux.iter()) {
            totals.add(w, y);
        }

        Ok(Self {
            series,
            durations,
            bin_width,
            resolved,
            totals,
        })
    }

    /// Durations that can never be scored at any period.
    pub fn unresolved_durations(&self) -> Vec<f64> {
        self.durations
            .iter()
            .zip(self.resolved.iter())
            .filter(|(_, ok)| !**ok)
            .map(|(&d, _)| d)
            .collect()
    }

    /// Best window over all durations and phase offsets at `period`.
    pub fn score_period(&self, period: f64) -> ScoreRecord {
        if !(period.is_finite() && period > 0.0) {
            return ScoreRecord::unscored(period);
        }

        let (n_bins, bin_width) = self.phase_bins(period);
        let bins = self.fold(period, n_bins, bin_width);

        // prefix[i] = sum of bins[0..i]
        let mut prefix = Vec::with_capacity(n_bins + 1);
        prefix.push(BinSums::default());
        for b in &bins {
            let last = prefix[prefix.len() - 1];
            prefix.push(last.plus(b));
        }

        let mut best: Option<WindowScore> = None;
        for (duration_idx, (&duration, &ok)) in self.durations.iter().zip(self.resolved.iter()).enumerate() {
            if !ok {
                continue;
            }
            let k = ((duration / bin_width).round() as usize).max(1);
            if k >= n_bins {
                continue;
            }
            for start in 0..n_bins {
                let inside = window_sum(&prefix, n_bins, start, k);
                let Some((snr, depth, depth_err)) = self.score_split(&inside) else {
                    continue;
                };
                let better = match &best {
                    None => true,
                    Some(b) => snr > b.snr,
                };
                if better {
                    best = Some(WindowScore {
                        snr,
                        depth,
                        depth_err,
                        start_bin: start,
                        bins: k,
                        duration_idx,
                    });
                }
            }
        }

        let Some(best) = best else {
            return ScoreRecord::unscored(period);
        };

        let mid_phase = (best.start_bin as f64 + best.bins as f64 / 2.0) * bin_width;
        ScoreRecord {
            period,
            power: 0.5 * best.snr * best.snr,
            snr: best.snr,
            depth: best.depth,
            depth_err: best.depth_err,
            transit_time: self.series.t_ref + mid_phase.rem_euclid(period),
            duration: self.durations[best.duration_idx],
        }
    }

    /// Bin count and width at `period`: the nominal width rounded down so
    /// that `n_bins * width == period` and every bin covers the same phase.
    fn phase_bins(&self, period: f64) -> (usize, f64) {
        let n_bins = ((period / self.bin_width).ceil() as usize).max(1);
        (n_bins, period / n_bins as f64)
    }

    fn fold(&self, period: f64, n_bins: usize, bin_width: f64) -> Vec<BinSums> {
        let mut bins = vec![BinSums::default(); n_bins];
        let t_ref = self.series.t_ref;
        for ((&t, &y), &w) in self
            .series
            .time
            .iter()
            .zip(self.series.flux.iter())
            .zip(self.series.weights.iter())
        {
            let phase = (t - t_ref).rem_euclid(period);
            let idx = ((phase / bin_width) as usize).min(n_bins - 1);
            bins[idx].add(w, y);
        }
        bins
    }

    /// `(snr, depth, depth_err)` for one in/out split, if scorable.
    fn score_split(&self, inside: &BinSums) -> Option<(f64, f64, f64)> {
        let outside = self.totals.sub(inside);
        if inside.n == 0 || outside.n == 0 || inside.w <= 0.0 || outside.w <= 0.0 {
            return None;
        }

        let mean_in = inside.wy / inside.w;
        let mean_out = outside.wy / outside.w;
        let depth = mean_out - mean_in;
        if !(depth > 0.0) {
            return None;
        }

        let depth_err = if self.series.weighted {
            (1.0 / inside.w + 1.0 / outside.w).sqrt()
        } else {
            let ss_in = (inside.wyy - inside.wy * mean_in).max(0.0);
            let ss_out = (outside.wyy - outside.wy * mean_out).max(0.0);
            let dof = (self.totals.n - 2) as f64;
            let var = ((ss_in + ss_out) / dof).max(MIN_VARIANCE);
            (var * (1.0 / inside.n as f64 + 1.0 / outside.n as f64)).sqrt()
        };

        let snr = depth / depth_err;
        if snr.is_finite() {
            Some((snr, depth, depth_err))
        } else {
            None
        }
    }
}

/// Sum of `k` consecutive bins starting at `start`, wrapping past the end.
fn window_sum(prefix: &[BinSums], n_bins: usize, start: usize, k: usize) -> BinSums {
    let end = start + k;
    if end <= n_bins {
        prefix[end].sub(&prefix[start])
    } else {
        prefix[n_bins]
            .sub(&prefix[start])
            .plus(&prefix[end - n_bins])
    }
}
