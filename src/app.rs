//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments
//! - runs the search pipeline
//! - prints the summary and plots

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, PlotArgs, RunArgs, SynthArgs};
use crate::data::synthetic::{SyntheticConfig, generate};
use crate::domain::{CleanConfig, RunConfig, SearchConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `transit-finder` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // `transit-finder --target X` is shorthand for `transit-finder run --target X`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Synth(args) => handle_synth(args),
        Command::Plot(args) => handle_plot(args),
        Command::Tui(args) => handle_tui(args),
    }
}

/// Log to stderr so stdout carries only the report; `RUST_LOG` overrides the
/// default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_pipeline(&config)?;

    println!("{}", crate::report::format_run_summary(&run.summary()));
    println!("{}", crate::report::format_peaks(&run.peaks));

    if config.plot {
        let score = crate::plot::render_score_plot(
            &run.best.score_curve,
            Some(&run.best.record()),
            config.plot_width,
            config.plot_height,
        );
        println!("{score}");

        let fold = crate::domain::PhaseFoldGrid::build(
            &run.cleaned.series,
            run.best.period,
            run.best.transit_time,
            config.plot_width * 4,
        );
        let half = (3.0 * run.best.duration).max(0.05);
        println!(
            "{}",
            crate::plot::render_phase_plot(
                &fold,
                &run.best.record(),
                Some(half),
                config.plot_width,
                config.plot_height,
            )
        );
    }

    if config.debug {
        let path = crate::debug::write_debug_bundle(&run, &config)?;
        info!(path = %path.display(), "wrote debug bundle");
    }

    println!("Outputs written to {}", config.out_dir.display());
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let synth = SyntheticConfig {
        samples: args.samples,
        baseline: args.baseline,
        start: args.start,
        period: args.period,
        t0: args.t0,
        duration: args.duration,
        depth: args.depth,
        noise: args.noise,
        with_errors: args.with_errors,
        seed: args.seed,
    };
    let series = generate(&synth).map_err(|e| AppError::new(2, format!("Invalid synthetic setup: {e}")))?;
    crate::io::write_light_curve_csv(&args.out, &series).map_err(|e| {
        AppError::new(4, format!("Failed to write {}: {e}", args.out.display()))
    })?;
    info!(path = %args.out.display(), samples = series.len(), "wrote synthetic light curve");
    Ok(())
}

fn handle_tui(args: RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_pipeline(&config)?;
    crate::tui::run(run, config)
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let result = crate::io::read_result_json(&args.result)?;
    println!(
        "Target: {} | P={:.6} d | snr={:.2}\n",
        result.target, result.best.period, result.best.snr
    );
    println!("{}", crate::plot::render_result_plots(&result, args.width, args.height));
    Ok(())
}

/// Translate CLI flags into a pipeline configuration.
///
/// A target is required unless a local input file is given, in which case the
/// file stem labels the report.
pub fn run_config_from_args(args: &RunArgs) -> Result<RunConfig, AppError> {
    let target = match (&args.target, &args.input) {
        (Some(t), _) if !t.trim().is_empty() => t.trim().to_string(),
        (_, Some(path)) => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string()),
        _ => return Err(AppError::new(2, "A --target or an --input file is required")),
    };

    Ok(RunConfig {
        target,
        sector: args.sector,
        input: args.input.clone(),
        out_dir: args.out.clone(),
        search: SearchConfig {
            min_period: args.min_period,
            max_period: args.max_period,
            min_duration: args.min_duration,
            max_duration: args.max_duration,
            duration_steps: args.duration_steps,
            oversample: args.oversample,
            frequency_factor: args.frequency_factor,
        },
        clean: CleanConfig {
            sigma_clip: args.sigma_clip,
            window_length: args.window_length,
            polyorder: args.polyorder,
            break_tolerance: args.break_tolerance,
            ..CleanConfig::default()
        },
        top_n: args.top,
        plot: !args.no_plot,
        animation: !args.no_animation,
        plot_width: args.width,
        plot_height: args.height,
        debug: args.debug,
    })
}

/// Rewrite argv so bare flags imply `run`.
///
/// Rules:
/// - `transit-finder --target X ...`    -> `transit-finder run --target X ...`
/// - `transit-finder --help/--version`  -> unchanged (top-level help/version)
/// - `transit-finder <subcommand> ...`  -> unchanged
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "synth" | "plot" | "tui");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_flags_imply_run() {
        assert_eq!(
            rewrite_args(argv(&["transit-finder", "--target", "Pi Men"])),
            argv(&["transit-finder", "run", "--target", "Pi Men"])
        );
        assert_eq!(
            rewrite_args(argv(&["transit-finder", "plot", "--result", "r.json"])),
            argv(&["transit-finder", "plot", "--result", "r.json"])
        );
        assert_eq!(
            rewrite_args(argv(&["transit-finder", "--help"])),
            argv(&["transit-finder", "--help"])
        );
        assert_eq!(rewrite_args(argv(&["transit-finder"])), argv(&["transit-finder"]));
    }

    fn parse_run(items: &[&str]) -> RunArgs {
        let cli = crate::cli::Cli::parse_from(rewrite_args(argv(items)));
        match cli.command {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn config_carries_flags() {
        let args = parse_run(&[
            "transit-finder",
            "--target",
            "TIC 1",
            "--sector",
            "3",
            "--min-period",
            "1.5",
            "--no-animation",
            "--window-length",
            "201",
        ]);
        let cfg = run_config_from_args(&args).unwrap();
        assert_eq!(cfg.target, "TIC 1");
        assert_eq!(cfg.sector, Some(3));
        assert_eq!(cfg.search.min_period, 1.5);
        assert_eq!(cfg.clean.window_length, 201);
        assert_eq!(cfg.clean.flatten_iters, CleanConfig::default().flatten_iters);
        assert!(!cfg.animation);
        assert!(cfg.plot);
    }

    #[test]
    fn input_file_labels_the_run() {
        let args = parse_run(&["transit-finder", "run", "--input", "data/wasp18.csv"]);
        assert_eq!(run_config_from_args(&args).unwrap().target, "wasp18");
    }

    #[test]
    fn target_or_input_is_required() {
        let args = parse_run(&["transit-finder", "run"]);
        assert_eq!(run_config_from_args(&args).unwrap_err().exit_code(), 2);
    }
}
