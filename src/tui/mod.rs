//! Ratatui-based terminal UI.
//!
//! The TUI shows a finished run: a header with the selected candidate, a
//! chart that toggles between the score curve and the phase fold, and a peak
//! list that can be stepped through to compare aliases.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::RunOutput;
use crate::domain::{PhaseFoldGrid, RunConfig, ScoreRecord, fold_centered};
use crate::error::AppError;

mod plotters_chart;

use plotters_chart::TransitChart;

/// Phase bins averaged for the highlighted fold.
const FOLD_BINS: usize = 400;

/// Start the TUI on a finished run.
pub fn run(run: RunOutput, config: RunConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(run, config);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Score,
    Phase,
}

struct App {
    run: RunOutput,
    config: RunConfig,
    view: View,
    /// Index into `run.peaks`; the best fit when there are no peaks.
    selected: usize,
    status: String,
}

impl App {
    fn new(run: RunOutput, config: RunConfig) -> Self {
        let status = format!("Outputs in {}", config.out_dir.display());
        Self {
            run,
            config,
            view: View::Score,
            selected: 0,
            status,
        }
    }

    fn candidate(&self) -> ScoreRecord {
        self.run
            .peaks
            .get(self.selected)
            .copied()
            .unwrap_or_else(|| self.run.best.record())
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the UI should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.view = match self.view {
                    View::Score => View::Phase,
                    View::Phase => View::Score,
                };
            }
            KeyCode::Right | KeyCode::Down => {
                if self.selected + 1 < self.run.peaks.len() {
                    self.selected += 1;
                }
                self.status = self.peak_status();
            }
            KeyCode::Left | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                self.status = self.peak_status();
            }
            KeyCode::Char('d') => {
                self.status = match crate::debug::write_debug_bundle(&self.run, &self.config) {
                    Ok(path) => format!("Wrote debug bundle: {}", path.display()),
                    Err(err) => format!("Debug write failed: {err}"),
                };
            }
            _ => {}
        }
        false
    }

    fn peak_status(&self) -> String {
        if self.run.peaks.is_empty() {
            return "No distinct peaks; showing the best fit.".to_string();
        }
        format!("peak {}/{}", self.selected + 1, self.run.peaks.len())
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let c = self.candidate();
        let sector = self
            .run
            .sector
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        let lines = vec![
            Line::from(vec![
                Span::styled("transit-finder", Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    " | {} | sector {sector} | n={}",
                    self.run.target,
                    self.run.cleaned.series.len()
                )),
            ]),
            Line::from(Span::styled(
                format!(
                    "P={:.6} d | t0={:.5} | dur={:.3} d | depth={:.0} ppm | snr={:.2}",
                    c.period,
                    c.transit_time,
                    c.duration,
                    c.depth * 1e6,
                    c.snr
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(34)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_peaks(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match self.view {
            View::Score => "Score curve",
            View::Phase => "Phase fold",
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let series = match self.view {
            View::Score => score_series(&self.run, &self.candidate()),
            View::Phase => phase_series(&self.run, &self.candidate()),
        };
        let widget = TransitChart {
            line: &series.line,
            points: &series.points,
            highlight: &series.highlight,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: series.x_label,
            y_label: series.y_label,
            fmt_x: series.fmt_x,
            fmt_y: series.fmt_y,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_peaks(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = self
            .run
            .peaks
            .iter()
            .enumerate()
            .map(|(i, p)| ListItem::new(format!("{:>2} P={:<10.5} snr={:.1}", i + 1, p.period, p.snr)))
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Peaks").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if !self.run.peaks.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab score/phase  ←/→ peaks  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Chart data for one view.
struct ChartSeries {
    line: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    highlight: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    x_label: &'static str,
    y_label: &'static str,
    fmt_x: fn(f64) -> String,
    fmt_y: fn(f64) -> String,
}

fn score_series(run: &RunOutput, candidate: &ScoreRecord) -> ChartSeries {
    let line = run.best.score_curve.snr_points();
    let highlight = if candidate.is_scored() {
        vec![(candidate.period, candidate.snr)]
    } else {
        Vec::new()
    };

    let x_bounds = bounds(line.iter().map(|p| p.0), 0.0).unwrap_or([0.0, 1.0]);
    let y_bounds = bounds(line.iter().map(|p| p.1), 0.05).unwrap_or([0.0, 1.0]);

    ChartSeries {
        line,
        points: Vec::new(),
        highlight,
        x_bounds,
        y_bounds,
        x_label: "period (d)",
        y_label: "snr",
        fmt_x: fmt_period,
        fmt_y: fmt_snr,
    }
}

/// Samples folded on `candidate` within a few durations of mid-transit, the
/// binned fold, and the box model.
fn phase_series(run: &RunOutput, candidate: &ScoreRecord) -> ChartSeries {
    let series = &run.cleaned.series;
    let half = (3.0 * candidate.duration)
        .max(0.05)
        .min(0.5 * candidate.period);

    let points: Vec<(f64, f64)> = series
        .time
        .iter()
        .zip(series.flux.iter())
        .map(|(&t, &f)| (fold_centered(t, candidate.transit_time, candidate.period), f))
        .filter(|(p, f)| p.abs() <= half && f.is_finite())
        .collect();

    let fold = PhaseFoldGrid::build(series, candidate.period, candidate.transit_time, FOLD_BINS);
    let highlight: Vec<(f64, f64)> = fold
        .phase
        .iter()
        .zip(fold.flux.iter())
        .filter(|(p, _)| p.abs() <= half)
        .map(|(&p, &f)| (p, f))
        .collect();

    let half_d = 0.5 * candidate.duration;
    let low = 1.0 - candidate.depth;
    let line = vec![
        (-half, 1.0),
        (-half_d, 1.0),
        (-half_d, low),
        (half_d, low),
        (half_d, 1.0),
        (half, 1.0),
    ];

    let y_bounds = bounds(
        points.iter().chain(line.iter()).map(|p| p.1),
        0.05,
    )
    .unwrap_or([0.99, 1.01]);

    ChartSeries {
        line,
        points,
        highlight,
        x_bounds: [-half, half],
        y_bounds,
        x_label: "phase (d)",
        y_label: "flux",
        fmt_x: fmt_phase,
        fmt_y: fmt_flux,
    }
}

fn bounds(values: impl Iterator<Item = f64>, pad_frac: f64) -> Option<[f64; 2]> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return None;
    }
    let pad = ((hi - lo) * pad_frac).max(1e-12);
    Some([lo - pad, hi + pad])
}

fn fmt_period(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_snr(v: f64) -> String {
    format!("{v:.1}")
}

fn fmt_phase(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_flux(v: f64) -> String {
    format!("{v:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::Artifacts;
    use crate::clean::{CleanOutput, CleanReport};
    use crate::data::synthetic::{SyntheticConfig, generate};
    use crate::domain::{CleanConfig, SearchConfig, TimeSeries};
    use crate::report::TransitStats;
    use crate::search::{search, top_peaks};

    fn app() -> App {
        let series = generate(&SyntheticConfig::default()).unwrap();
        let search_cfg = SearchConfig {
            min_period: 3.0,
            max_period: 4.0,
            ..SearchConfig::default()
        };
        let best = search(&series, &search_cfg).unwrap();
        let peaks = top_peaks(&best.score_curve, 3, 0.02);
        let stats = TransitStats::compute(&series, &best);
        let run = RunOutput {
            target: "synthetic".to_string(),
            sector: None,
            segments: Vec::new(),
            raw: TimeSeries::default(),
            cleaned: CleanOutput {
                trend: vec![1.0; series.len()],
                series,
                report: CleanReport::default(),
            },
            best,
            peaks,
            stats,
            artifacts: Artifacts::default(),
        };
        let config = RunConfig {
            target: "synthetic".to_string(),
            sector: None,
            input: None,
            out_dir: std::env::temp_dir(),
            search: search_cfg,
            clean: CleanConfig::default(),
            top_n: 3,
            plot: false,
            animation: false,
            plot_width: 80,
            plot_height: 20,
            debug: false,
        };
        App::new(run, config)
    }

    #[test]
    fn keys_toggle_view_and_step_peaks() {
        let mut app = app();
        assert_eq!(app.view, View::Score);
        assert!(!app.handle_key(KeyCode::Tab));
        assert_eq!(app.view, View::Phase);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, View::Score);

        let n = app.run.peaks.len();
        assert!(n >= 1);
        for _ in 0..n + 2 {
            app.handle_key(KeyCode::Right);
        }
        assert_eq!(app.selected, n - 1);
        for _ in 0..n + 2 {
            app.handle_key(KeyCode::Left);
        }
        assert_eq!(app.selected, 0);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn first_peak_is_the_best_fit() {
        let app = app();
        assert_eq!(app.candidate().period, app.run.best.period);
    }

    #[test]
    fn phase_series_centres_the_transit() {
        let app = app();
        let c = app.candidate();
        let s = phase_series(&app.run, &c);
        assert!(!s.points.is_empty());
        assert!(s.x_bounds[0] < 0.0 && s.x_bounds[1] > 0.0);
        // The deepest binned point sits inside the transit window.
        let deepest = s
            .highlight
            .iter()
            .copied()
            .fold((0.0, f64::INFINITY), |acc, p| if p.1 < acc.1 { p } else { acc });
        assert!(deepest.0.abs() <= 0.5 * c.duration + 0.05);
        assert!(s.y_bounds[0] < 1.0 - 0.5 * c.depth);
    }

    #[test]
    fn score_series_marks_the_candidate() {
        let app = app();
        let c = app.candidate();
        let s = score_series(&app.run, &c);
        assert_eq!(s.highlight, vec![(c.period, c.snr)]);
        assert!(s.x_bounds[0] >= 3.0 - 1e-9 && s.x_bounds[1] <= 4.0 + 1e-9);
    }
}
