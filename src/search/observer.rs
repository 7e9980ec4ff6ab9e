//! Progress hooks for long searches.
//!
//! The search calls these from worker threads, hence the `Sync` bound.

use tracing::{debug, info};

use crate::domain::ScoreRecord;

pub trait SearchObserver: Sync {
    /// The trial grid is known and scoring is about to start.
    fn grid_built(&self, _n_periods: usize, _n_durations: usize) {}

    /// `done` of `total` periods have been scored. Called at coarse strides.
    fn progress(&self, _done: usize, _total: usize) {}

    fn best_selected(&self, _best: &ScoreRecord) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn grid_built(&self, n_periods: usize, n_durations: usize) {
        info!(n_periods, n_durations, "period grid built");
    }

    fn progress(&self, done: usize, total: usize) {
        debug!(done, total, "scoring trial periods");
    }

    fn best_selected(&self, best: &ScoreRecord) {
        info!(
            period = best.period,
            snr = best.snr,
            depth = best.depth,
            duration = best.duration,
            "best period selected"
        );
    }
}
