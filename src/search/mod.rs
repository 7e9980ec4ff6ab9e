//! Box-transit period search.
//!
//! Responsibilities:
//!
//! - build the trial duration and period grids
//! - score every trial period against the duration grid (parallel)
//! - pick the global best candidate deterministically
//!
//! The search is a pure function of its inputs: the same series and config
//! always produce the same score curve and best fit, independent of the
//! number of worker threads.

pub mod grid;
pub mod observer;
pub mod scorer;
pub mod selection;

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{BestFit, ScoreCurve, ScoreRecord, SearchConfig, TimeSeries};
use crate::error::SearchError;

pub use grid::{duration_grid, period_grid, validate_config, MAX_TRIAL_PERIODS};
pub use observer::{NoopObserver, SearchObserver, TracingObserver};
pub use scorer::{BoxScorer, PreparedSeries};
pub use selection::{select_best, top_peaks};

/// Run the search without progress reporting.
pub fn search(series: &TimeSeries, config: &SearchConfig) -> Result<BestFit, SearchError> {
    search_with_observer(series, config, &NoopObserver)
}

pub fn search_with_observer(
    series: &TimeSeries,
    config: &SearchConfig,
    observer: &dyn SearchObserver,
) -> Result<BestFit, SearchError> {
    validate_config(config)?;
    let durations = duration_grid(config.min_duration, config.max_duration, config.duration_steps)?;
    let prepared = PreparedSeries::new(series)?;
    let periods = period_grid(
        prepared.baseline(),
        config.min_period,
        config.max_period,
        &durations,
        config.frequency_factor,
    )?;

    let scorer = BoxScorer::new(&prepared, &durations, config.oversample)?;
    let unresolved = scorer.unresolved_durations();
    if !unresolved.is_empty() {
        warn!(
            cadence = prepared.cadence(),
            ?unresolved,
            "trial durations shorter than the sampling cadence are skipped"
        );
    }
    debug!(
        samples = prepared.len(),
        weighted = prepared.is_weighted(),
        baseline = prepared.baseline(),
        "prepared series for search"
    );
    observer.grid_built(periods.len(), durations.len());

    let total = periods.len();
    let stride = (total / 20).max(1);
    let done = AtomicUsize::new(0);

    // `collect` on an indexed parallel iterator preserves grid order.
    let records: Vec<ScoreRecord> = periods
        .par_iter()
        .map(|&period| {
            let record = scorer.score_period(period);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % stride == 0 || n == total {
                observer.progress(n, total);
            }
            record
        })
        .collect();

    let curve = ScoreCurve::from_records(&records);
    let best = select_best(&curve)?;
    observer.best_selected(&best);

    Ok(BestFit::from_record(best, curve))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    use super::*;
    use crate::domain::fold_centered;

    fn injected(seed: u64, sigma: f64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, sigma).unwrap();
        let time: Vec<f64> = (0..1000).map(|i| 30.0 * i as f64 / 999.0).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|&t| {
                let dip = if fold_centered(t, 1.0, 3.5).abs() < 0.05 { 0.01 } else { 0.0 };
                1.0 - dip + noise.sample(&mut rng)
            })
            .collect();
        TimeSeries::new(time, flux, None, None).unwrap()
    }

    fn narrow_config() -> SearchConfig {
        SearchConfig {
            min_period: 3.0,
            max_period: 4.0,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn recovers_injected_transit() {
        let ts = injected(7, 1e-4);
        let best = search(&ts, &narrow_config()).unwrap();

        assert!((best.period - 3.5).abs() <= 0.01, "period={}", best.period);
        assert!(best.snr > 5.0);
        assert!((best.depth - 0.01).abs() < 2e-3, "depth={}", best.depth);
        assert!(fold_centered(best.transit_time, 1.0, best.period).abs() < 0.05);
        assert!(best.duration >= 0.05 && best.duration <= 0.3);
        assert!(!best.score_curve.is_empty());
    }

    #[test]
    fn search_is_deterministic() {
        let ts = injected(11, 1e-3);
        let a = search(&ts, &narrow_config()).unwrap();
        let b = search(&ts, &narrow_config()).unwrap();
        assert_eq!(a.period, b.period);
        assert_eq!(a.transit_time, b.transit_time);
        assert_eq!(a.score_curve.period, b.score_curve.period);
        assert_eq!(a.score_curve.snr.len(), b.score_curve.snr.len());
        for (x, y) in a.score_curve.snr.iter().zip(b.score_curve.snr.iter()) {
            assert!(x == y || (x.is_nan() && y.is_nan()));
        }
    }

    #[test]
    fn best_fit_is_the_curve_maximum() {
        let ts = injected(3, 1e-3);
        let best = search(&ts, &narrow_config()).unwrap();
        let max = best
            .score_curve
            .snr
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.snr, max);
    }

    #[test]
    fn flat_series_has_bounded_score() {
        let mut ts = injected(5, 1e-3);
        let mut rng = StdRng::seed_from_u64(99);
        let noise = Normal::new(0.0, 1e-3).unwrap();
        for f in ts.flux.iter_mut() {
            *f = 1.0 + noise.sample(&mut rng);
        }
        let best = search(&ts, &narrow_config()).unwrap();
        // Pure noise: the best box is a fluctuation, well below the injected case.
        assert!(best.snr < 8.0, "snr={}", best.snr);
    }

    #[test]
    fn rejects_bad_inputs() {
        let ts = injected(1, 1e-3);
        let bad = SearchConfig {
            min_period: 4.0,
            max_period: 3.0,
            ..SearchConfig::default()
        };
        assert!(matches!(search(&ts, &bad), Err(SearchError::InvalidRange(_))));

        let short = TimeSeries::new(vec![0.0, 1.0], vec![1.0, 1.0], None, None).unwrap();
        assert!(matches!(
            search(&short, &narrow_config()),
            Err(SearchError::InvalidSeries(_))
        ));
    }

    #[test]
    fn durations_below_cadence_leave_nothing_to_score() {
        // Daily sampling cannot resolve boxes of at most 0.3 days.
        let time: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let flux = vec![1.0; 60];
        let ts = TimeSeries::new(time, flux, None, None).unwrap();
        assert!(matches!(
            search(&ts, &narrow_config()),
            Err(SearchError::NoScorableCandidate { .. })
        ));
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SearchObserver for Recorder {
        fn grid_built(&self, n_periods: usize, n_durations: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("grid {n_periods} {n_durations}"));
        }

        fn progress(&self, done: usize, total: usize) {
            if done == total {
                self.events.lock().unwrap().push("done".to_string());
            }
        }

        fn best_selected(&self, _best: &ScoreRecord) {
            self.events.lock().unwrap().push("best".to_string());
        }
    }

    #[test]
    fn observer_sees_grid_completion_and_best() {
        let ts = injected(2, 1e-3);
        let recorder = Recorder::default();
        let best = search_with_observer(&ts, &narrow_config(), &recorder).unwrap();
        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0], format!("grid {} 10", best.score_curve.len()));
        assert!(events.contains(&"done".to_string()));
        assert_eq!(events[events.len() - 1], "best");
    }
}
