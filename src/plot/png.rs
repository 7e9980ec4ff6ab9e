//! PNG and GIF diagnostics (Plotters bitmap backend).
//!
//! Text goes through the embedded face in [`super::font`]. Charts with a
//! reference line also carry a legend.
//!
//! Each public function returns a [`RenderError`] naming the artifact; callers
//! log and continue.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use super::font::{self, FAMILY};
use crate::domain::{BestFit, TimeSeries, fold_centered};
use crate::error::RenderError;

type DrawResult = Result<(), Box<dyn Error>>;
type Root<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const POINT: RGBColor = RGBColor(40, 70, 160);
const HIGHLIGHT: RGBColor = RGBColor(200, 30, 30);

const CAPTION_SIZE: u32 = 24;
const LABEL_SIZE: u32 = 14;

/// Frames in the phase animation; the fold shifts by `period / FRAMES` each.
pub const ANIMATION_FRAMES: usize = 100;
const FRAME_DELAY_MS: u32 = 50;

#[derive(Debug, Clone, Copy)]
pub struct PlotSize {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotSize {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
        }
    }
}

/// Caption and axis descriptions of one chart.
struct Labels<'a> {
    title: String,
    x_desc: &'a str,
    y_desc: &'a str,
}

/// A reference line drawn over the samples, with its legend entry.
struct Overlay<'a> {
    points: &'a [(f64, f64)],
    label: String,
}

/// Raw (unflattened) flux against time.
pub fn render_light_curve(path: &Path, series: &TimeSeries, size: PlotSize) -> Result<(), RenderError> {
    let points = finite_points(&series.time, &series.flux);
    let labels = Labels {
        title: "Raw Light Curve".to_string(),
        x_desc: "Time [BJD]",
        y_desc: "Flux",
    };
    draw_scatter(path, &points, None, &labels, size).map_err(|e| RenderError::new(artifact(path), e))
}

/// Flattened flux with the unit baseline drawn across it.
pub fn render_flattened(path: &Path, series: &TimeSeries, size: PlotSize) -> Result<(), RenderError> {
    let points = finite_points(&series.time, &series.flux);
    let unity: Vec<(f64, f64)> = match (series.time.first(), series.time.last()) {
        (Some(&a), Some(&b)) => vec![(a, 1.0), (b, 1.0)],
        _ => Vec::new(),
    };
    let overlay = Overlay {
        points: &unity,
        label: "Baseline".to_string(),
    };
    let labels = Labels {
        title: "Flattened Light Curve".to_string(),
        x_desc: "Time [BJD]",
        y_desc: "Normalized Flux",
    };
    draw_scatter(path, &points, Some(&overlay), &labels, size).map_err(|e| RenderError::new(artifact(path), e))
}

/// SNR against trial period with a vertical marker at the best period.
pub fn render_score_curve(path: &Path, best: &BestFit, size: PlotSize) -> Result<(), RenderError> {
    draw_score_curve(path, best, size).map_err(|e| RenderError::new(artifact(path), e))
}

/// Flux folded at the best period (mid-transit at 0) with the box model.
pub fn render_phase_folded(
    path: &Path,
    series: &TimeSeries,
    best: &BestFit,
    size: PlotSize,
) -> Result<(), RenderError> {
    let points = folded_points(series, best, 0.0);
    let model = box_model(best);
    let overlay = Overlay {
        points: &model,
        label: format!("Box model (depth {:.0} ppm)", best.depth * 1e6),
    };
    let labels = Labels {
        title: format!("Phase-Folded Light Curve (P={:.4} d)", best.period),
        x_desc: "Phase [days]",
        y_desc: "Normalized Flux",
    };
    draw_scatter(path, &points, Some(&overlay), &labels, size).map_err(|e| RenderError::new(artifact(path), e))
}

/// Animated GIF: the fold reference sweeps through one full period.
pub fn render_phase_animation(
    path: &Path,
    series: &TimeSeries,
    best: &BestFit,
    size: PlotSize,
) -> Result<(), RenderError> {
    draw_phase_animation(path, series, best, size).map_err(|e| RenderError::new(artifact(path), e))
}

fn artifact(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn finite_points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys.iter())
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect()
}

fn folded_points(series: &TimeSeries, best: &BestFit, shift: f64) -> Vec<(f64, f64)> {
    series
        .time
        .iter()
        .zip(series.flux.iter())
        .filter(|(t, f)| t.is_finite() && f.is_finite())
        .map(|(&t, &f)| (fold_centered(t, best.transit_time + shift, best.period), f))
        .collect()
}

fn box_model(best: &BestFit) -> Vec<(f64, f64)> {
    let half_p = 0.5 * best.period;
    let half_d = 0.5 * best.duration;
    let low = 1.0 - best.depth;
    vec![
        (-half_p, 1.0),
        (-half_d, 1.0),
        (-half_d, low),
        (half_d, low),
        (half_d, 1.0),
        (half_p, 1.0),
    ]
}

fn bounds(points: &[(f64, f64)]) -> Option<((f64, f64), (f64, f64))> {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for &(px, py) in points {
        x = (x.0.min(px), x.1.max(px));
        y = (y.0.min(py), y.1.max(py));
    }
    if !(x.0.is_finite() && x.1.is_finite() && y.0.is_finite() && y.1.is_finite()) {
        return None;
    }
    Some((widen(x), widen(y)))
}

fn widen((lo, hi): (f64, f64)) -> (f64, f64) {
    let pad = ((hi - lo).abs() * 0.03).max(1e-9);
    (lo - pad, hi + pad)
}

fn draw_scatter(
    path: &Path,
    points: &[(f64, f64)],
    overlay: Option<&Overlay<'_>>,
    labels: &Labels<'_>,
    size: PlotSize,
) -> DrawResult {
    font::ensure_registered()?;
    let mut all = points.to_vec();
    if let Some(overlay) = overlay {
        all.extend_from_slice(overlay.points);
    }
    let ((x0, x1), (y0, y1)) = bounds(&all).ok_or("no finite samples to plot")?;

    let root = BitMapBackend::new(path, (size.width, size.height)).into_drawing_area();
    root.fill(&WHITE)?;
    scatter_frame(&root, points, overlay, labels, (x0, x1), (y0, y1))?;
    root.present()?;
    Ok(())
}

fn scatter_frame(
    root: &Root<'_>,
    points: &[(f64, f64)],
    overlay: Option<&Overlay<'_>>,
    labels: &Labels<'_>,
    x: (f64, f64),
    y: (f64, f64),
) -> DrawResult {
    let mut chart = ChartBuilder::on(root)
        .caption(&labels.title, (FAMILY, CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x.0..x.1, y.0..y.1)?;

    chart
        .configure_mesh()
        .x_desc(labels.x_desc)
        .y_desc(labels.y_desc)
        .x_label_formatter(&|v| format!("{v:.2}"))
        .y_label_formatter(&|v| format!("{v:.4}"))
        .label_style((FAMILY, LABEL_SIZE))
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(px, py)| Circle::new((px, py), 1, POINT.filled())),
    )?;
    if let Some(overlay) = overlay {
        chart
            .draw_series(LineSeries::new(
                overlay.points.iter().copied(),
                HIGHLIGHT.stroke_width(2),
            ))?
            .label(overlay.label.as_str())
            .legend(|(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], HIGHLIGHT.stroke_width(2)));
        draw_legend(&mut chart)?;
    }
    Ok(())
}

fn draw_legend<'a, 'b: 'a>(chart: &mut Chart<'a, 'b>) -> DrawResult {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font((FAMILY, LABEL_SIZE))
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_score_curve(path: &Path, best: &BestFit, size: PlotSize) -> DrawResult {
    font::ensure_registered()?;
    let root = BitMapBackend::new(path, (size.width, size.height)).into_drawing_area();
    root.fill(&WHITE)?;
    score_frame(&root, best)?;
    root.present()?;
    Ok(())
}

fn score_frame(root: &Root<'_>, best: &BestFit) -> DrawResult {
    let points = best.score_curve.snr_points();
    let ((x0, x1), (y0, y1)) = bounds(&points).ok_or("score curve has no scored periods")?;

    let mut chart = ChartBuilder::on(root)
        .caption("BLS Power Spectrum", (FAMILY, CAPTION_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .x_desc("Period [days]")
        .y_desc("SNR")
        .x_label_formatter(&|v| format!("{v:.2}"))
        .y_label_formatter(&|v| format!("{v:.1}"))
        .label_style((FAMILY, LABEL_SIZE))
        .draw()?;

    chart.draw_series(LineSeries::new(points, POINT.stroke_width(1)))?;
    chart
        .draw_series(LineSeries::new(
            vec![(best.period, y0), (best.period, y1)],
            HIGHLIGHT.stroke_width(2),
        ))?
        .label(format!("Best Period: {:.4} days", best.period))
        .legend(|(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], HIGHLIGHT.stroke_width(2)));
    draw_legend(&mut chart)?;
    Ok(())
}

fn draw_phase_animation(path: &Path, series: &TimeSeries, best: &BestFit, size: PlotSize) -> DrawResult {
    font::ensure_registered()?;
    let first = folded_points(series, best, 0.0);
    let ((_, _), (y0, y1)) = bounds(&first).ok_or("no finite samples to animate")?;
    let half = 0.5 * best.period;
    let x = widen((-half, half));

    let root = BitMapBackend::gif(path, (size.width, size.height), FRAME_DELAY_MS)?.into_drawing_area();
    for frame in 0..ANIMATION_FRAMES {
        let shift = best.period * frame as f64 / ANIMATION_FRAMES as f64;
        let points = folded_points(series, best, shift);
        let labels = Labels {
            title: format!("Phase-Folded Transit Animation (Frame {frame}/{ANIMATION_FRAMES})"),
            x_desc: "Phase [days]",
            y_desc: "Normalized Flux",
        };
        root.fill(&WHITE)?;
        scatter_frame(&root, &points, None, &labels, x, (y0, y1))?;
        root.present()?;
    }
    Ok(())
}
