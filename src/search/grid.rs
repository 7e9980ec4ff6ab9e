//! Trial grid generation.
//!
//! Periods are laid out uniformly in *frequency*. With a step of
//!
//! ```text
//! df = frequency_factor * min_duration / baseline^2
//! ```
//!
//! a box of the shortest trial duration drifts by at most about one duration
//! across the full baseline between neighbouring trial periods. Uniform
//! frequency spacing gives fine period steps at short periods and coarser
//! steps at long periods (`Δperiod ≈ period² · df`).
//!
//! Long baselines would need more than [`MAX_TRIAL_PERIODS`] trials; the
//! step is then widened so the grid still spans the whole range.

use tracing::warn;

use crate::domain::SearchConfig;
use crate::error::SearchError;

/// Upper bound on trial periods.
pub const MAX_TRIAL_PERIODS: usize = 5_000_000;

/// Check the configuration-only constraints (no data needed).
pub fn validate_config(config: &SearchConfig) -> Result<(), SearchError> {
    let SearchConfig {
        min_period,
        max_period,
        ..
    } = *config;
    if !(min_period.is_finite() && max_period.is_finite()) {
        return Err(SearchError::InvalidRange(format!(
            "period bounds must be finite (min={min_period}, max={max_period})"
        )));
    }
    if min_period <= 0.0 {
        return Err(SearchError::InvalidRange(format!(
            "min_period must be > 0 (got {min_period})"
        )));
    }
    if min_period >= max_period {
        return Err(SearchError::InvalidRange(format!(
            "min_period ({min_period}) must be < max_period ({max_period})"
        )));
    }
    if config.oversample == 0 {
        return Err(SearchError::InvalidRange("oversample must be >= 1".to_string()));
    }
    if !(config.frequency_factor.is_finite() && config.frequency_factor > 0.0) {
        return Err(SearchError::InvalidRange(format!(
            "frequency_factor must be finite and > 0 (got {})",
            config.frequency_factor
        )));
    }
    Ok(())
}

/// `steps` evenly spaced durations in `[min_duration, max_duration]` (inclusive).
pub fn duration_grid(
    min_duration: f64,
    max_duration: f64,
    steps: usize,
) -> Result<Vec<f64>, SearchError> {
    if !(min_duration.is_finite() && max_duration.is_finite()) {
        return Err(SearchError::InvalidRange(format!(
            "duration bounds must be finite (min={min_duration}, max={max_duration})"
        )));
    }
    if min_duration <= 0.0 {
        return Err(SearchError::InvalidRange(format!(
            "min_duration must be > 0 (got {min_duration})"
        )));
    }
    if min_duration >= max_duration {
        return Err(SearchError::InvalidRange(format!(
            "min_duration ({min_duration}) must be < max_duration ({max_duration})"
        )));
    }
    if steps == 0 {
        return Err(SearchError::InvalidRange(
            "duration candidates are empty (steps = 0)".to_string(),
        ));
    }
    if steps == 1 {
        return Ok(vec![min_duration]);
    }

    let step = (max_duration - min_duration) / (steps as f64 - 1.0);
    let mut out: Vec<f64> = (0..steps).map(|i| min_duration + step * i as f64).collect();
    // Pin the end point exactly.
    out[steps - 1] = max_duration;
    Ok(out)
}

/// Trial periods covering `[min_period, max_period]`, strictly increasing.
///
/// `baseline` is the time span of the series being searched.
pub fn period_grid(
    baseline: f64,
    min_period: f64,
    max_period: f64,
    durations: &[f64],
    frequency_factor: f64,
) -> Result<Vec<f64>, SearchError> {
    if durations.is_empty() {
        return Err(SearchError::InvalidRange(
            "duration candidates are empty".to_string(),
        ));
    }
    if durations.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        return Err(SearchError::InvalidRange(
            "durations must be finite and > 0".to_string(),
        ));
    }
    validate_config(&SearchConfig {
        min_period,
        max_period,
        frequency_factor,
        ..SearchConfig::default()
    })?;
    if !(baseline.is_finite() && baseline > 0.0) {
        return Err(SearchError::InvalidSeries(format!(
            "time baseline must be finite and > 0 (got {baseline})"
        )));
    }

    let min_duration = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let mut df = frequency_factor * min_duration / (baseline * baseline);

    let f_max = 1.0 / min_period;
    let f_min = 1.0 / max_period;
    let mut steps = ((f_max - f_min) / df).floor();
    if !steps.is_finite() || steps >= MAX_TRIAL_PERIODS as f64 {
        let cap = (MAX_TRIAL_PERIODS - 1) as f64;
        warn!(
            baseline,
            min_duration,
            wanted = steps,
            cap = MAX_TRIAL_PERIODS,
            "period grid too dense; coarsening frequency step"
        );
        df = (f_max - f_min) / cap;
        steps = cap;
    }
    let n = 1 + steps as usize;

    let periods: Vec<f64> = (0..n)
        .map(|i| (1.0 / (f_max - df * i as f64)).clamp(min_period, max_period))
        .collect();

    if periods.is_empty() {
        return Err(SearchError::EmptyGrid);
    }
    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_grid_includes_endpoints() {
        let d = duration_grid(0.05, 0.3, 10).unwrap();
        assert_eq!(d.len(), 10);
        assert!((d[0] - 0.05).abs() < 1e-15);
        assert_eq!(d[9], 0.3);
        for w in d.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn duration_grid_rejects_bad_ranges() {
        assert!(matches!(duration_grid(0.0, 0.3, 10), Err(SearchError::InvalidRange(_))));
        assert!(matches!(duration_grid(0.3, 0.3, 10), Err(SearchError::InvalidRange(_))));
        assert!(matches!(duration_grid(0.05, 0.3, 0), Err(SearchError::InvalidRange(_))));
        assert_eq!(duration_grid(0.05, 0.3, 1).unwrap(), vec![0.05]);
    }

    #[test]
    fn period_grid_is_strictly_increasing_and_contained() {
        let durations = duration_grid(0.05, 0.3, 10).unwrap();
        let p = period_grid(27.0, 0.5, 30.0, &durations, 1.0).unwrap();
        assert!(p.len() > 1000);
        assert_eq!(p[0], 0.5);
        for w in p.windows(2) {
            assert!(w[1] > w[0], "not increasing: {} -> {}", w[0], w[1]);
        }
        assert!(p.iter().all(|&x| (0.5..=30.0).contains(&x)));
    }

    #[test]
    fn period_steps_grow_with_period() {
        let p = period_grid(30.0, 1.0, 10.0, &[0.1], 1.0).unwrap();
        let steps: Vec<f64> = p.windows(2).map(|w| w[1] - w[0]).collect();
        for w in steps.windows(2) {
            assert!(w[1] >= w[0] * (1.0 - 1e-9));
        }
        assert!(steps[steps.len() - 1] > 10.0 * steps[0]);
    }

    #[test]
    fn period_grid_is_deterministic() {
        let a = period_grid(30.0, 3.0, 4.0, &[0.05, 0.3], 1.0).unwrap();
        let b = period_grid(30.0, 3.0, 4.0, &[0.05, 0.3], 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn long_baselines_are_coarsened_to_the_cap() {
        let durations = duration_grid(0.05, 0.3, 10).unwrap();
        let p = period_grid(700.0, 0.5, 30.0, &durations, 1.0).unwrap();
        assert_eq!(p.len(), MAX_TRIAL_PERIODS);
        assert_eq!(p[0], 0.5);
        assert!((p[p.len() - 1] - 30.0).abs() < 1e-6);
        for w in p.windows(2) {
            assert!(w[1] > w[0], "not increasing: {} -> {}", w[0], w[1]);
        }
        assert!(p.iter().all(|&x| (0.5..=30.0).contains(&x)));
    }

    #[test]
    fn period_grid_rejects_invalid_ranges() {
        assert!(matches!(
            period_grid(30.0, 4.0, 3.0, &[0.1], 1.0),
            Err(SearchError::InvalidRange(_))
        ));
        assert!(matches!(
            period_grid(30.0, 3.0, 3.0, &[0.1], 1.0),
            Err(SearchError::InvalidRange(_))
        ));
        assert!(matches!(
            period_grid(30.0, 0.0, 3.0, &[0.1], 1.0),
            Err(SearchError::InvalidRange(_))
        ));
        assert!(matches!(
            period_grid(30.0, 1.0, 3.0, &[], 1.0),
            Err(SearchError::InvalidRange(_))
        ));
        assert!(matches!(
            period_grid(0.0, 1.0, 3.0, &[0.1], 1.0),
            Err(SearchError::InvalidSeries(_))
        ));
    }
}
