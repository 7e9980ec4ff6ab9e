//! Picking the winning trial period out of a score curve.
//!
//! Selection rules:
//!
//! 1. Unscored periods (non-finite SNR) are ignored.
//! 2. The highest SNR wins.
//! 3. Ties go to the earliest (shortest) period in grid order.

use crate::domain::{ScoreCurve, ScoreRecord};
use crate::error::SearchError;

/// The global SNR maximum of `curve`.
pub fn select_best(curve: &ScoreCurve) -> Result<ScoreRecord, SearchError> {
    if curve.is_empty() {
        return Err(SearchError::EmptyGrid);
    }

    let mut best: Option<usize> = None;
    for (i, &snr) in curve.snr.iter().enumerate() {
        if !snr.is_finite() {
            continue;
        }
        match best {
            Some(b) if snr <= curve.snr[b] => {}
            _ => best = Some(i),
        }
    }

    best.map(|i| curve.record(i))
        .ok_or(SearchError::NoScorableCandidate {
            periods: curve.len(),
        })
}

/// Up to `n` local SNR maxima, strongest first.
///
/// A peak is suppressed when it lies within `min_separation` (fractional,
/// `|p - q| / q`) of a stronger peak already taken, so aliases of one strong
/// signal do not crowd the list.
pub fn top_peaks(curve: &ScoreCurve, n: usize, min_separation: f64) -> Vec<ScoreRecord> {
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..curve.len())
        .filter(|&i| curve.snr[i].is_finite())
        .collect();
    // Stable sort keeps grid order among equal SNRs.
    order.sort_by(|&a, &b| curve.snr[b].total_cmp(&curve.snr[a]));

    let mut taken: Vec<ScoreRecord> = Vec::with_capacity(n);
    for i in order {
        let candidate = curve.record(i);
        let crowded = taken
            .iter()
            .any(|t| ((candidate.period - t.period) / t.period).abs() < min_separation);
        if crowded {
            continue;
        }
        taken.push(candidate);
        if taken.len() == n {
            break;
        }
    }
    taken
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(periods: &[f64], snrs: &[f64]) -> ScoreCurve {
        let records: Vec<ScoreRecord> = periods
            .iter()
            .zip(snrs.iter())
            .map(|(&p, &s)| {
                if s.is_finite() {
                    ScoreRecord {
                        period: p,
                        power: 0.5 * s * s,
                        snr: s,
                        depth: 1e-3,
                        depth_err: 1e-3 / s,
                        transit_time: 0.5,
                        duration: 0.1,
                    }
                } else {
                    ScoreRecord::unscored(p)
                }
            })
            .collect();
        ScoreCurve::from_records(&records)
    }

    #[test]
    fn empty_curve_is_an_empty_grid() {
        assert_eq!(select_best(&ScoreCurve::default()), Err(SearchError::EmptyGrid));
    }

    #[test]
    fn all_unscored_is_reported() {
        let c = curve(&[1.0, 2.0], &[f64::NAN, f64::NAN]);
        assert_eq!(
            select_best(&c),
            Err(SearchError::NoScorableCandidate { periods: 2 })
        );
    }

    #[test]
    fn nan_entries_are_skipped_and_ties_go_to_shorter_period() {
        let c = curve(&[1.0, 2.0, 3.0, 4.0], &[f64::NAN, 7.0, 3.0, 7.0]);
        let best = select_best(&c).unwrap();
        assert_eq!(best.period, 2.0);
        assert_eq!(best.snr, 7.0);
    }

    #[test]
    fn top_peaks_suppresses_neighbours() {
        let c = curve(
            &[1.0, 1.001, 2.0, 3.0, 3.002],
            &[10.0, 9.9, 5.0, 8.0, 7.9],
        );
        let peaks = top_peaks(&c, 3, 0.01);
        let periods: Vec<f64> = peaks.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![1.0, 3.0, 2.0]);
        assert!(top_peaks(&c, 0, 0.01).is_empty());
    }
}
