//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - score curve / box model: `-` line
//! - binned phase-folded flux: `o`
//! - best period: `*`

use crate::domain::{PhaseFoldGrid, ResultFile, ScoreCurve, ScoreRecord};

/// SNR against trial period, with the best period marked.
pub fn render_score_plot(
    curve: &ScoreCurve,
    best: Option<&ScoreRecord>,
    width: usize,
    height: usize,
) -> String {
    let points = curve.snr_points();
    let Some((p_min, p_max)) = x_range(&points) else {
        return "Score curve: no scored periods\n".to_string();
    };
    let (y_min, y_max) = y_range(&points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut canvas = Canvas::new(width, height, (p_min, p_max), (y_min, y_max));
    canvas.polyline(&points, '-');
    if let Some(b) = best.filter(|b| b.is_scored()) {
        canvas.mark(b.period, b.snr, '*');
    }

    let mut out = format!(
        "Score: period=[{p_min:.3}, {p_max:.3}] d | snr=[{y_min:.2}, {y_max:.2}]\n"
    );
    out.push_str(&canvas.finish());
    out
}

/// Binned phase-folded flux around mid-transit with the box model overlaid.
///
/// The x range is `±half_window` days (the full period when `None`).
pub fn render_phase_plot(
    fold: &PhaseFoldGrid,
    best: &ScoreRecord,
    half_window: Option<f64>,
    width: usize,
    height: usize,
) -> String {
    let half = half_window
        .unwrap_or(0.5 * best.period)
        .min(0.5 * best.period);
    if !(half.is_finite() && half > 0.0) || fold.is_empty() {
        return "Phase fold: nothing to plot\n".to_string();
    }

    let points: Vec<(f64, f64)> = fold
        .phase
        .iter()
        .zip(fold.flux.iter())
        .filter(|(p, _)| p.abs() <= half)
        .map(|(&p, &f)| (p, f))
        .collect();

    let width = width.max(10);
    let model = box_model(best, half, width * 2);

    let mut all = points.clone();
    all.extend_from_slice(&model);
    let (y_min, y_max) = y_range(&all).unwrap_or((0.99, 1.01));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut canvas = Canvas::new(width, height, (-half, half), (y_min, y_max));
    canvas.polyline(&model, '-');
    for &(x, y) in &points {
        canvas.mark(x, y, 'o');
    }

    let mut out = format!(
        "Phase fold: P={:.5} d | phase=[{:.3}, {:.3}] d | flux=[{y_min:.5}, {y_max:.5}]\n",
        best.period, -half, half
    );
    out.push_str(&canvas.finish());
    out
}

/// Both plots for a saved result.
pub fn render_result_plots(result: &ResultFile, width: usize, height: usize) -> String {
    let mut out = render_score_plot(&result.score_curve, Some(&result.best), width, height);
    out.push('\n');
    let half = (3.0 * result.best.duration).max(0.05);
    out.push_str(&render_phase_plot(
        &result.phase_fold,
        &result.best,
        Some(half),
        width,
        height,
    ));
    out
}

/// `1 - depth` inside the transit window, `1` outside.
fn box_model(best: &ScoreRecord, half: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let x = -half + 2.0 * half * i as f64 / (n as f64 - 1.0);
            let y = if x.abs() < 0.5 * best.duration {
                1.0 - best.depth
            } else {
                1.0
            };
            (x, y)
        })
        .collect()
}

struct Canvas {
    grid: Vec<Vec<char>>,
    x: (f64, f64),
    y: (f64, f64),
}

impl Canvas {
    fn new(width: usize, height: usize, x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            grid: vec![vec![' '; width.max(10)]; height.max(5)],
            x,
            y,
        }
    }

    fn cell(&self, x: f64, y: f64) -> (usize, usize) {
        let width = self.grid[0].len();
        let height = self.grid.len();
        (
            map_x(x, self.x.0, self.x.1, width),
            map_y(y, self.y.0, self.y.1, height),
        )
    }

    fn mark(&mut self, x: f64, y: f64, ch: char) {
        let (cx, cy) = self.cell(x, y);
        self.grid[cy][cx] = ch;
    }

    fn polyline(&mut self, points: &[(f64, f64)], ch: char) {
        let mut prev = None;
        for &(x, y) in points {
            let (cx, cy) = self.cell(x, y);
            match prev {
                Some((x0, y0)) => draw_line(&mut self.grid, x0, y0, cx, cy, ch),
                None => self.grid[cy][cx] = ch,
            }
            prev = Some((cx, cy));
        }
    }

    fn finish(self) -> String {
        let mut out = String::new();
        for row in self.grid {
            out.push_str(&row.into_iter().collect::<String>());
            out.push('\n');
        }
        out
    }
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else if min.is_finite() {
        Some((min - 0.5, min + 0.5))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period: f64, snr: f64) -> ScoreRecord {
        ScoreRecord {
            period,
            power: 0.5 * snr * snr,
            snr,
            depth: 0.01,
            depth_err: 0.01 / snr,
            transit_time: 0.0,
            duration: 0.2,
        }
    }

    #[test]
    fn score_plot_golden_snapshot_small() {
        let curve = ScoreCurve::from_records(&[
            record(1.0, 1.0),
            ScoreRecord::unscored(1.5),
            record(2.0, 5.0),
            record(3.0, 2.0),
        ]);
        let best = record(2.0, 5.0);

        let txt = render_score_plot(&curve, Some(&best), 10, 5);
        let expected = concat!(
            "Score: period=[1.000, 3.000] d | snr=[0.80, 5.20]\n",
            "     *    \n",
            "    - -   \n",
            "  --   -- \n",
            " -       -\n",
            "-         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn phase_plot_marks_points_and_box() {
        let fold = PhaseFoldGrid {
            phase: vec![-0.4, -0.05, 0.05, 0.4],
            flux: vec![1.0, 0.99, 0.99, 1.0],
            count: vec![5, 5, 5, 5],
        };
        let best = record(2.0, 10.0);
        let txt = render_phase_plot(&fold, &best, Some(0.5), 21, 7);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("Phase fold: P=2.00000 d"));
        // In-transit points sit on the bottom row, out-of-transit on the top.
        assert!(lines[7].contains('o'));
        assert!(lines[1].contains('o'));
        assert!(txt.contains('-'));
    }

    #[test]
    fn empty_inputs_render_a_hint() {
        assert_eq!(
            render_score_plot(&ScoreCurve::default(), None, 10, 5),
            "Score curve: no scored periods\n"
        );
        let best = record(2.0, 3.0);
        assert_eq!(
            render_phase_plot(&PhaseFoldGrid::default(), &best, None, 10, 5),
            "Phase fold: nothing to plot\n"
        );
    }
}
