//! Shared "search pipeline" logic used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! acquire -> stitch -> clean/flatten -> search -> peaks -> artifacts
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::clean::{CleanOutput, clean_and_flatten};
use crate::data::{CsvSource, FitsSource, LightCurveSource, MastClient, is_fits_path, report_sector, stitch};
use crate::domain::{BestFit, LightCurveSegment, PhaseFoldGrid, ResultFile, RunConfig, ScoreRecord, TargetQuery, TimeSeries};
use crate::error::{AppError, RenderError};
use crate::io::{ReportRow, write_report_csv, write_result_json};
use crate::plot::{self, PlotSize};
use crate::report::{RunSummary, TransitStats};
use crate::search::{TracingObserver, search_with_observer, top_peaks};

/// Peaks closer than this fraction of their period count as one signal.
const PEAK_SEPARATION: f64 = 0.02;
/// Phase bins stored in `result.json` for the `plot` command.
const RESULT_FOLD_BINS: usize = 200;

/// Paths of everything a run wrote.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub report: PathBuf,
    pub result: PathBuf,
    /// Plots that rendered successfully.
    pub plots: Vec<PathBuf>,
}

/// All computed outputs of a single `run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub target: String,
    pub sector: Option<u32>,
    pub segments: Vec<LightCurveSegment>,
    /// Stitched series before cleaning.
    pub raw: TimeSeries,
    pub cleaned: CleanOutput,
    pub best: BestFit,
    pub peaks: Vec<ScoreRecord>,
    pub stats: TransitStats,
    pub artifacts: Artifacts,
}

impl RunOutput {
    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            target: &self.target,
            sector: self.sector,
            segments: self.segments.len(),
            clean: &self.cleaned.report,
            best: &self.best,
            stats: self.stats,
        }
    }

    pub fn result_file(&self, config: &RunConfig) -> ResultFile {
        ResultFile {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            target: self.target.clone(),
            sector: self.sector,
            samples: self.cleaned.series.len(),
            search: config.search,
            clean: config.clean,
            best: self.best.record(),
            peaks: self.peaks.clone(),
            score_curve: self.best.score_curve.scored_only(),
            phase_fold: PhaseFoldGrid::build(
                &self.cleaned.series,
                self.best.period,
                self.best.transit_time,
                RESULT_FOLD_BINS,
            ),
        }
    }
}

/// Execute the full pipeline, acquiring from the archive or a local CSV.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    let segments = acquire(config)?;
    run_with_segments(config, segments)
}

/// Fetch light-curve segments for the configured target.
///
/// A local input is read as FITS or CSV by its extension.
pub fn acquire(config: &RunConfig) -> Result<Vec<LightCurveSegment>, AppError> {
    let query = TargetQuery {
        target: config.target.clone(),
        sector: config.sector,
    };
    let segments = match &config.input {
        Some(path) if is_fits_path(path) => FitsSource { path: path.clone() }.fetch(&query)?,
        Some(path) => CsvSource { path: path.clone() }.fetch(&query)?,
        None => MastClient::from_env()?.fetch(&query)?,
    };
    info!(segments = segments.len(), "acquired light curve");
    Ok(segments)
}

/// Execute the pipeline on already-acquired segments.
///
/// Plot failures are logged and skipped; the report and result JSON are the
/// primary outputs and abort the run when they cannot be written.
pub fn run_with_segments(config: &RunConfig, segments: Vec<LightCurveSegment>) -> Result<RunOutput, AppError> {
    let raw = stitch(&segments)?;
    let sector = report_sector(config.sector, &segments);
    info!(samples = raw.len(), ?sector, "stitched light curve");

    fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::new(
            4,
            format!("Failed to create output dir {}: {e}", config.out_dir.display()),
        )
    })?;
    let size = PlotSize::default();
    let mut plots = Vec::new();

    let path = config.out_dir.join("raw.png");
    keep_plot(&mut plots, path.clone(), plot::png::render_light_curve(&path, &raw, size));

    let cleaned = clean_and_flatten(&raw, &config.clean)?;
    info!(
        kept = cleaned.report.output,
        removed = cleaned.report.input - cleaned.report.output,
        "cleaned light curve"
    );
    let path = config.out_dir.join("flattened.png");
    keep_plot(
        &mut plots,
        path.clone(),
        plot::png::render_flattened(&path, &cleaned.series, size),
    );

    let best = search_with_observer(&cleaned.series, &config.search, &TracingObserver)?;
    let peaks = top_peaks(&best.score_curve, config.top_n, PEAK_SEPARATION);
    let stats = TransitStats::compute(&cleaned.series, &best);

    let path = config.out_dir.join("bls.png");
    keep_plot(&mut plots, path.clone(), plot::png::render_score_curve(&path, &best, size));
    let path = config.out_dir.join("phase_folded.png");
    keep_plot(
        &mut plots,
        path.clone(),
        plot::png::render_phase_folded(&path, &cleaned.series, &best, size),
    );
    if config.animation {
        let path = config.out_dir.join("phase_animation.gif");
        keep_plot(
            &mut plots,
            path.clone(),
            plot::png::render_phase_animation(&path, &cleaned.series, &best, size),
        );
    }

    let mut run = RunOutput {
        target: config.target.clone(),
        sector,
        segments,
        raw,
        cleaned,
        best,
        peaks,
        stats,
        artifacts: Artifacts {
            plots,
            ..Artifacts::default()
        },
    };

    run.artifacts.report = write_report(&config.out_dir, &run)?;
    run.artifacts.result = config.out_dir.join("result.json");
    write_result_json(&run.artifacts.result, &run.result_file(config))?;
    info!(dir = %config.out_dir.display(), "wrote report and result");

    Ok(run)
}

fn write_report(dir: &Path, run: &RunOutput) -> Result<PathBuf, AppError> {
    let path = dir.join("report.csv");
    write_report_csv(&path, &ReportRow::new(&run.target, run.sector, &run.best))?;
    Ok(path)
}

fn keep_plot(plots: &mut Vec<PathBuf>, path: PathBuf, rendered: Result<(), RenderError>) {
    match rendered {
        Ok(()) => plots.push(path),
        Err(err) => warn!(artifact = %err.artifact, error = %err.message, "plot skipped"),
    }
}
