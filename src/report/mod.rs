//! Reporting utilities: derived transit statistics and terminal formatting.

pub mod format;

pub use format::*;

use crate::clean::CleanReport;
use crate::domain::{BestFit, TimeSeries};

/// Quantities derived from the best fit and the searched series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitStats {
    /// Distinct transit epochs with at least one in-transit sample.
    pub transits_observed: usize,
    pub in_transit_samples: usize,
    /// `sqrt(depth)`, the planet-to-star radius ratio for a central transit.
    pub radius_ratio: f64,
    /// Fraction of the orbit spent in transit.
    pub duty_cycle: f64,
}

impl TransitStats {
    pub fn compute(series: &TimeSeries, best: &BestFit) -> Self {
        let half = 0.5 * best.duration;
        let mut epochs: Vec<i64> = Vec::new();
        let mut in_transit = 0;
        for &t in &series.time {
            if best.phase_offset(t).abs() < half {
                in_transit += 1;
                let n = ((t - best.transit_time) / best.period).round() as i64;
                if epochs.last() != Some(&n) {
                    epochs.push(n);
                }
            }
        }
        epochs.sort_unstable();
        epochs.dedup();

        Self {
            transits_observed: epochs.len(),
            in_transit_samples: in_transit,
            radius_ratio: best.depth.max(0.0).sqrt(),
            duty_cycle: best.duration / best.period,
        }
    }
}

/// Everything the terminal summary shows.
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub target: &'a str,
    pub sector: Option<u32>,
    pub segments: usize,
    pub clean: &'a CleanReport,
    pub best: &'a BestFit,
    pub stats: TransitStats,
}
