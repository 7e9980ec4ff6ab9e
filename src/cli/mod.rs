//! Command-line parsing for the transit finder.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! search and acquisition code. Conversion into a [`RunConfig`] lives in
//! `app`.
//!
//! [`RunConfig`]: crate::domain::RunConfig

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "transit-finder",
    version,
    about = "Box least-squares transit search for TESS light curves"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Acquire, clean, and search a light curve; write plots, report, and result JSON.
    Run(RunArgs),
    /// Write a synthetic light curve with an injected box transit to CSV.
    Synth(SynthArgs),
    /// Print ASCII plots from a previously written result JSON.
    Plot(PlotArgs),
    /// Run the pipeline, then browse the score curve and phase fold interactively.
    Tui(RunArgs),
}

/// Options shared by `run` and `tui`.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Target name or TIC identifier (e.g. "Pi Men", "TIC 261136679").
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Restrict acquisition to one TESS sector.
    #[arg(short = 's', long)]
    pub sector: Option<u32>,

    /// Read a local CSV or `*_lc.fits` light curve instead of querying the archive.
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output directory for plots, report, and result JSON.
    #[arg(short = 'o', long, default_value = "output")]
    pub out: PathBuf,

    /// Shortest trial period (days).
    #[arg(long, default_value_t = 0.5)]
    pub min_period: f64,

    /// Longest trial period (days).
    #[arg(long, default_value_t = 30.0)]
    pub max_period: f64,

    /// Shortest trial transit duration (days).
    #[arg(long, default_value_t = 0.05)]
    pub min_duration: f64,

    /// Longest trial transit duration (days).
    #[arg(long, default_value_t = 0.3)]
    pub max_duration: f64,

    /// Number of trial durations between the bounds.
    #[arg(long, default_value_t = 10)]
    pub duration_steps: usize,

    /// Phase bins per minimum duration.
    #[arg(long, default_value_t = 10)]
    pub oversample: usize,

    /// Period-grid density multiplier (< 1 gives a denser grid).
    #[arg(long, default_value_t = 1.0)]
    pub frequency_factor: f64,

    /// Outlier rejection threshold (standard deviations).
    #[arg(long, default_value_t = 5.0)]
    pub sigma_clip: f64,

    /// Savitzky-Golay window length (cadences; forced odd).
    #[arg(long, default_value_t = 401)]
    pub window_length: usize,

    /// Savitzky-Golay polynomial order.
    #[arg(long, default_value_t = 2)]
    pub polyorder: usize,

    /// Gap size (in median cadences) that splits the trend fit.
    #[arg(long, default_value_t = 5.0)]
    pub break_tolerance: f64,

    /// Number of distinct score-curve peaks to list.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Skip the animated phase-fold GIF.
    #[arg(long)]
    pub no_animation: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// ASCII plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// ASCII plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Write a markdown debug bundle next to the outputs.
    #[arg(long)]
    pub debug: bool,
}

/// Options for the synthetic light-curve generator.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Destination CSV file.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    /// Time span (days).
    #[arg(long, default_value_t = 30.0)]
    pub baseline: f64,

    /// First timestamp.
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    #[arg(long, default_value_t = 3.5)]
    pub period: f64,

    /// Mid-transit epoch of the injected signal.
    #[arg(long, default_value_t = 1.0)]
    pub t0: f64,

    #[arg(long, default_value_t = 0.1)]
    pub duration: f64,

    /// Fractional transit depth.
    #[arg(long, default_value_t = 0.01)]
    pub depth: f64,

    /// Gaussian noise standard deviation.
    #[arg(long, default_value_t = 1e-4)]
    pub noise: f64,

    /// Also write a flux_err column (equal to the noise level).
    #[arg(long)]
    pub with_errors: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for plotting a saved result.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Result JSON produced by `transit-finder run`.
    #[arg(long, value_name = "JSON")]
    pub result: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_search_defaults() {
        let cli = Cli::parse_from(["transit-finder", "run", "--target", "Pi Men"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.target.as_deref(), Some("Pi Men"));
        assert_eq!(args.min_period, 0.5);
        assert_eq!(args.max_period, 30.0);
        assert_eq!(args.min_duration, 0.05);
        assert_eq!(args.max_duration, 0.3);
        assert_eq!(args.duration_steps, 10);
        assert_eq!(args.window_length, 401);
        assert_eq!(args.out, PathBuf::from("output"));
        assert!(!args.no_animation && !args.no_plot && !args.debug);
    }

    #[test]
    fn synth_requires_out() {
        assert!(Cli::try_parse_from(["transit-finder", "synth"]).is_err());
        let cli = Cli::try_parse_from(["transit-finder", "synth", "--out", "lc.csv", "--period", "2.5"])
            .unwrap();
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.period, 2.5);
        assert_eq!(args.samples, 1000);
    }

    #[test]
    fn rejects_non_numeric_period() {
        let err = Cli::try_parse_from(["transit-finder", "run", "--min-period", "short"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
