//! Debug bundle writer for inspecting acquisition, cleaning, and search results.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::RunConfig;
use crate::error::AppError;

/// Rows of the score-curve table; longer curves are decimated.
const CURVE_ROWS: usize = 200;

pub fn write_debug_bundle(run: &RunOutput, config: &RunConfig) -> Result<PathBuf, AppError> {
    let dir = config.out_dir.join("debug");
    create_dir_all(&dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("transit_debug_{}_{ts}.md", slug(&run.target)));
    let mut file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    let io = |e: std::io::Error| AppError::new(4, format!("Failed to write debug bundle: {e}"));

    writeln!(file, "# transit-finder debug bundle").map_err(io)?;
    writeln!(file, "- generated: {}", Local::now().to_rfc3339()).map_err(io)?;
    writeln!(file, "- target: {}", run.target).map_err(io)?;
    writeln!(file, "- sector: {}", fmt_sector(run.sector)).map_err(io)?;
    writeln!(
        file,
        "- search: period {:.4}..{:.4} d, duration {:.4}..{:.4} d x{}, oversample {}, frequency_factor {:.3}",
        config.search.min_period,
        config.search.max_period,
        config.search.min_duration,
        config.search.max_duration,
        config.search.duration_steps,
        config.search.oversample,
        config.search.frequency_factor
    )
    .map_err(io)?;
    writeln!(
        file,
        "- clean: sigma_clip {:.2}, window {}, polyorder {}, break_tolerance {:.1}, iters {}, flatten_sigma {:.1}",
        config.clean.sigma_clip,
        config.clean.window_length,
        config.clean.polyorder,
        config.clean.break_tolerance,
        config.clean.flatten_iters,
        config.clean.flatten_sigma
    )
    .map_err(io)?;

    writeln!(file, "\n## Segments").map_err(io)?;
    writeln!(file, "| origin | sector | samples | t_start | t_end |").map_err(io)?;
    writeln!(file, "| - | - | - | - | - |").map_err(io)?;
    for seg in &run.segments {
        let (t0, t1) = match (seg.series.time.first(), seg.series.time.last()) {
            (Some(a), Some(b)) => (fmt_num(*a, 5), fmt_num(*b, 5)),
            _ => ("-".to_string(), "-".to_string()),
        };
        writeln!(
            file,
            "| {} | {} | {} | {t0} | {t1} |",
            seg.origin,
            fmt_sector(seg.sector),
            seg.series.len()
        )
        .map_err(io)?;
    }

    let r = &run.cleaned.report;
    writeln!(file, "\n## Cleaning").map_err(io)?;
    writeln!(file, "| stage | removed |").map_err(io)?;
    writeln!(file, "| - | - |").map_err(io)?;
    writeln!(file, "| non-finite | {} |", r.non_finite).map_err(io)?;
    writeln!(file, "| duplicate time | {} |", r.duplicate_times).map_err(io)?;
    writeln!(file, "| quality flag | {} |", r.bad_quality).map_err(io)?;
    writeln!(file, "| sigma clip | {} |", r.clipped).map_err(io)?;
    writeln!(file, "Kept {} of {} samples.", r.output, r.input).map_err(io)?;

    let curve = &run.best.score_curve;
    let scored = curve.snr.iter().filter(|v| v.is_finite()).count();
    writeln!(file, "\n## Search").map_err(io)?;
    writeln!(
        file,
        "Trial periods: {} ({} scored). Best: P={:.6} d, t0={:.6}, dur={:.4} d, depth={:.1} ppm, snr={:.2}",
        curve.len(),
        scored,
        run.best.period,
        run.best.transit_time,
        run.best.duration,
        run.best.depth * 1e6,
        run.best.snr
    )
    .map_err(io)?;

    writeln!(file, "\n### Peaks").map_err(io)?;
    writeln!(file, "| period | snr | power | depth_ppm | depth_err_ppm | duration | epoch |").map_err(io)?;
    writeln!(file, "| - | - | - | - | - | - | - |").map_err(io)?;
    for p in &run.peaks {
        writeln!(
            file,
            "| {:.6} | {:.3} | {:.3} | {:.1} | {:.1} | {:.4} | {:.6} |",
            p.period,
            p.snr,
            p.power,
            p.depth * 1e6,
            p.depth_err * 1e6,
            p.duration,
            p.transit_time
        )
        .map_err(io)?;
    }

    writeln!(file, "\n### Score curve").map_err(io)?;
    writeln!(file, "| period | snr | depth_ppm | duration |").map_err(io)?;
    writeln!(file, "| - | - | - | - |").map_err(io)?;
    let step = curve.len().div_ceil(CURVE_ROWS).max(1);
    for i in (0..curve.len()).step_by(step) {
        let rec = curve.record(i);
        writeln!(
            file,
            "| {:.6} | {} | {} | {} |",
            rec.period,
            fmt_num(rec.snr, 3),
            fmt_num(rec.depth * 1e6, 1),
            fmt_num(rec.duration, 4)
        )
        .map_err(io)?;
    }

    Ok(path)
}

fn slug(target: &str) -> String {
    let s: String = target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if s.is_empty() { "target".to_string() } else { s }
}

fn fmt_sector(sector: Option<u32>) -> String {
    sector.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fmt_num(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{value:.decimals$}")
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_keeps_alphanumerics() {
        assert_eq!(slug("TIC 261136679"), "TIC_261136679");
        assert_eq!(slug("Pi Men"), "Pi_Men");
        assert_eq!(slug(""), "target");
    }

    #[test]
    fn unscored_values_render_as_dash() {
        assert_eq!(fmt_num(f64::NAN, 3), "-");
        assert_eq!(fmt_num(1.23456, 2), "1.23");
    }
}
