//! Ratatui-based terminal UI.
//!
//! The TUI shows the trajectory overlay for the current filters, or one
//! subject's piecewise-linear fit. A settings panel adjusts the age window,
//! toggles studies and sample types, picks the subject and toggles the fit.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{self, SubjectFit};
use crate::cohort::{FilterSpec, Overlay, subject_ids};
use crate::domain::FilterSelection;
use crate::error::AppError;
use crate::io::ingest::Dataset;
use crate::io::CURVE_GRID_POINTS;
use crate::models::{evaluate_at, linspace};
use crate::plot::{FigureStyle, export_fit_svg, export_overlay_svg};
use crate::report::FIT_FAILED_TITLE;

mod plotters_chart;

use plotters_chart::KineticsChart;

/// Start the TUI on a loaded dataset.
pub fn run(dataset: Dataset, selection: FilterSelection, max_subjects: usize) -> Result<(), AppError> {
    // Resolve flags before entering raw mode so errors print normally.
    let spec = FilterSpec::from_selection(&selection, &dataset.columns, &dataset.stats)?;
    let mut app = App::new(dataset, spec, max_subjects.max(1));

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::internal(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::internal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::internal(format!("Failed to enter alternate screen: {e}")));
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
enum Field {
    AgeMin,
    AgeMax,
    Study,
    SampleType,
    Subject,
    Fit,
    MaxSubjects,
}

const FIELDS: [Field; 7] = [
    Field::AgeMin,
    Field::AgeMax,
    Field::Study,
    Field::SampleType,
    Field::Subject,
    Field::Fit,
    Field::MaxSubjects,
];

/// Results for the current settings.
struct View {
    n_rows: usize,
    overlay: Overlay,
    subjects: Vec<String>,
    fit: Option<SubjectFit>,
}

struct App {
    dataset: Dataset,
    spec: FilterSpec,
    max_subjects: usize,
    selected_field: usize,
    study_cursor: usize,
    sample_cursor: usize,
    subject_idx: usize,
    show_fit: bool,
    status: String,
    view: Option<View>,
}

impl App {
    fn new(dataset: Dataset, spec: FilterSpec, max_subjects: usize) -> Self {
        let mut app = Self {
            dataset,
            spec,
            max_subjects,
            selected_field: 0,
            study_cursor: 0,
            sample_cursor: 0,
            subject_idx: 0,
            show_fit: false,
            status: String::new(),
            view: None,
        };
        app.recompute();
        if app.view.is_some() {
            app.status = "Ready.".to_string();
        }
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::internal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::internal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::internal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => {
                if self.selected_field + 1 < FIELDS.len() {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_field(),
            KeyCode::Char('f') => {
                self.show_fit = !self.show_fit;
                self.recompute();
                self.status = format!("fit: {}", on_off(self.show_fit));
            }
            KeyCode::Char('e') => self.export_svg(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        match FIELDS[self.selected_field] {
            Field::AgeMin | Field::AgeMax => self.adjust_age(delta),
            Field::Study => {
                self.study_cursor = cycle(self.study_cursor, self.dataset.stats.studies.len(), delta);
            }
            Field::SampleType => {
                self.sample_cursor = cycle(self.sample_cursor, self.dataset.stats.sample_types.len(), delta);
            }
            Field::Subject => {
                let n = self.view.as_ref().map_or(0, |v| v.subjects.len());
                self.subject_idx = cycle(self.subject_idx, n, delta);
                self.recompute();
                if let Some(s) = self.current_subject().map(str::to_string) {
                    self.status = format!("subject: {s}");
                }
            }
            Field::Fit => self.toggle_field(),
            Field::MaxSubjects => {
                self.max_subjects = if delta >= 0 {
                    self.max_subjects.saturating_add(5)
                } else {
                    self.max_subjects.saturating_sub(5)
                }
                .max(1);
                self.recompute();
                self.status = format!("overlay subjects: {}", self.max_subjects);
            }
        }
    }

    fn adjust_age(&mut self, delta: i32) {
        let (Some((lo, hi)), Some((min_age, max_age))) = (self.spec.age_range, self.dataset.stats.age_bounds) else {
            self.status = "No age columns in this dataset.".to_string();
            return;
        };
        let step = f64::from(delta);
        let range = if FIELDS[self.selected_field] == Field::AgeMin {
            ((lo + step).clamp(min_age, hi), hi)
        } else {
            (lo, (hi + step).clamp(lo, max_age))
        };
        self.spec.age_range = Some(range);
        self.recompute();
        self.status = format!("age window: [{}, {}]", range.0, range.1);
    }

    fn toggle_field(&mut self) {
        match FIELDS[self.selected_field] {
            Field::Study => {
                let options = &self.dataset.stats.studies;
                if let (Some(set), Some(name)) = (self.spec.studies.as_mut(), options.get(self.study_cursor)) {
                    let on = toggle(set, name);
                    self.status = format!("study {name}: {}", on_off(on));
                }
                self.recompute();
            }
            Field::SampleType => {
                let options = &self.dataset.stats.sample_types;
                if let (Some(set), Some(name)) = (self.spec.sample_types.as_mut(), options.get(self.sample_cursor)) {
                    let on = toggle(set, name);
                    self.status = format!("sample type {name}: {}", on_off(on));
                }
                self.recompute();
            }
            Field::Fit => {
                self.show_fit = !self.show_fit;
                self.recompute();
                self.status = format!("fit: {}", on_off(self.show_fit));
            }
            _ => {}
        }
    }

    fn current_subject(&self) -> Option<&str> {
        self.view.as_ref()?.subjects.get(self.subject_idx).map(String::as_str)
    }

    fn recompute(&mut self) {
        match pipeline::explore_with_spec(&self.dataset, self.spec.clone(), self.max_subjects) {
            Ok(ex) => {
                let subjects = subject_ids(&ex.rows);
                if self.subject_idx >= subjects.len() {
                    self.subject_idx = 0;
                }
                let fit = if self.show_fit {
                    subjects
                        .get(self.subject_idx)
                        .and_then(|s| pipeline::fit_subject(&ex.rows, s).ok())
                } else {
                    None
                };
                self.view = Some(View {
                    n_rows: ex.rows.len(),
                    overlay: ex.overlay,
                    subjects,
                    fit,
                });
            }
            Err(err) => {
                self.view = None;
                self.status = err.to_string();
            }
        }
    }

    fn export_svg(&mut self) {
        let Some(view) = &self.view else {
            self.status = "Nothing to export.".to_string();
            return;
        };
        let style = FigureStyle::dark();
        let result = match (&view.fit, self.show_fit) {
            (Some(fit), true) => {
                let path = PathBuf::from(format!("vkx_fit_{}.svg", sanitize(&fit.subject)));
                export_fit_svg(&path, &fit.subject, &fit.observations, fit.params(), &style).map(|_| path)
            }
            _ => {
                let path = PathBuf::from("vkx_overlay.svg");
                export_overlay_svg(&path, &view.overlay, &style).map(|_| path)
            }
        };
        self.status = match result {
            Ok(path) => format!("Wrote {}", path.display()),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let stats = &self.dataset.stats;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("vkx", Style::default().fg(Color::Cyan)),
            Span::raw(" | Viral Kinetics Explorer"),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "records: {} | subjects: {} | dropped rows: {}",
                stats.n_records,
                stats.subjects.len(),
                self.dataset.rows_dropped
            ),
            Style::default().fg(Color::Gray),
        )));

        let filtered = match &self.view {
            Some(v) => format!(
                "filtered rows: {} | overlay: {} subject(s), {} trajectorie(s)",
                v.n_rows,
                v.overlay.subjects.len(),
                v.overlay.trajectories.len()
            ),
            None => "filtered rows: 0".to_string(),
        };
        lines.push(Line::from(Span::styled(filtered, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(9)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(view) = &self.view else {
            let block = Block::default().title("Chart").borders(Borders::ALL);
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let msg = Paragraph::new("No rows match the current filters.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let data = chart_series(view, self.show_fit);
        let block = Block::default().title(data.title.clone()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let (chart_rect, insets) = chart_layout(inner);
        let widget = KineticsChart {
            lines: &data.lines,
            points: &data.points,
            curve: &data.curve,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "time (days)",
            y_label: data.y_label,
            fmt_x: fmt_axis,
            fmt_y: fmt_axis,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, data.x_bounds, data.y_bounds, data.y_label);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let stats = &self.dataset.stats;
        let age = match self.spec.age_range {
            Some((lo, hi)) => (format!("{lo}"), format!("{hi}")),
            None => ("(no age data)".to_string(), "(no age data)".to_string()),
        };
        let subject = self.current_subject().unwrap_or("-");

        let items = vec![
            ListItem::new(format!("Age min: {}", age.0)),
            ListItem::new(format!("Age max: {}", age.1)),
            ListItem::new(format!(
                "Study: {}",
                option_label(self.spec.studies.as_ref(), &stats.studies, self.study_cursor)
            )),
            ListItem::new(format!(
                "Sample type: {}",
                option_label(self.spec.sample_types.as_ref(), &stats.sample_types, self.sample_cursor)
            )),
            ListItem::new(format!("Subject: {subject}")),
            ListItem::new(format!("Fit: {}", on_off(self.show_fit))),
            ListItem::new(format!("Overlay subjects: {}", self.max_subjects)),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  space toggle  f fit  e export svg  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Series and bounds for the chart widget.
struct ChartData {
    title: String,
    lines: Vec<Vec<(f64, f64)>>,
    points: Vec<(f64, f64)>,
    curve: Vec<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    y_label: &'static str,
}

fn chart_series(view: &View, show_fit: bool) -> ChartData {
    let (title, lines, points, curve, y_label) = match (&view.fit, show_fit) {
        (Some(fit), true) => {
            let points: Vec<(f64, f64)> = fit.observations.iter().map(|o| (o.t, o.y)).collect();
            let curve = match (fit.params(), fit.observations.first(), fit.observations.last()) {
                (Some(p), Some(first), Some(last)) => linspace(first.t, last.t, CURVE_GRID_POINTS)
                    .into_iter()
                    .map(|t| (t, evaluate_at(t, p)))
                    .collect(),
                _ => Vec::new(),
            };
            let title = if fit.result.is_ok() {
                format!("Piecewise linear fit: {}", fit.subject)
            } else {
                format!("{}: {FIT_FAILED_TITLE}", fit.subject)
            };
            (title, Vec::new(), points, curve, crate::cohort::Y_LABEL_RAW)
        }
        _ => {
            let lines: Vec<Vec<(f64, f64)>> = view
                .overlay
                .trajectories
                .iter()
                .map(|t| t.points.iter().map(|p| (p.t, p.y)).collect())
                .collect();
            let points: Vec<(f64, f64)> = lines.iter().flatten().copied().collect();
            let title = format!("Viral load over time (sample of {} people)", view.overlay.subjects.len());
            (title, lines, points, Vec::new(), view.overlay.y_label)
        }
    };

    let xs = points.iter().chain(curve.iter()).map(|p| p.0);
    let ys = points.iter().chain(curve.iter()).map(|p| p.1);
    ChartData {
        title,
        x_bounds: padded_bounds(xs),
        y_bounds: padded_bounds(ys),
        lines,
        points,
        curve,
        y_label,
    }
}

fn padded_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return [0.0, 1.0];
    }
    if hi <= lo {
        return [lo - 0.5, hi + 0.5];
    }
    let pad = (hi - lo) * 0.05;
    [lo - pad, hi + pad]
}

fn cycle(idx: usize, len: usize, delta: i32) -> usize {
    if len == 0 {
        return 0;
    }
    if delta >= 0 { (idx + 1) % len } else { (idx + len - 1) % len }
}

/// Flip membership; returns the new state.
fn toggle(set: &mut std::collections::BTreeSet<String>, name: &str) -> bool {
    if set.remove(name) {
        false
    } else {
        set.insert(name.to_string());
        true
    }
}

fn option_label(set: Option<&std::collections::BTreeSet<String>>, options: &[String], cursor: usize) -> String {
    let Some(set) = set else {
        return "(column absent)".to_string();
    };
    let Some(name) = options.get(cursor) else {
        return "(none)".to_string();
    };
    let mark = if set.contains(name) { "x" } else { " " };
    format!("[{mark}] {name}  ({}/{} selected)", set.len(), options.len())
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.1}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    y_label: &str,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = format!("{:.1}", x_bounds[0] + u * (x_bounds[1] - x_bounds[0]));
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label.clone()).style(style),
            Rect {
                x: x.saturating_sub((label.len() / 2) as u16),
                y,
                width: label.len() as u16,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = format!("{:.1}", y_bounds[0] + u * (y_bounds[1] - y_bounds[0]));
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let start = (inner.x + insets.left.saturating_sub(1)).saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label.clone()).style(style),
            Rect {
                x: start,
                y,
                width: label.len() as u16,
                height: 1,
            },
        );
    }

    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        let x_label = Paragraph::new("time (days)")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(x_label, x_rect);
    }

    // Axis title above the tick labels; long labels are clipped to the chart width.
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(insets.right),
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(y_label.to_string()).style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
        y_rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnPresence, VlRecord};

    fn dataset() -> Dataset {
        let mut records = Vec::new();
        let ys = [3.0, 4.0, 5.0, 6.5, 5.5, 4.0, 3.0, 3.0, 3.0];
        for (i, &y) in ys.iter().enumerate() {
            let mut r = VlRecord::new("P1", i as f64, y);
            r.age_lo = Some(18.0);
            r.age_hi = Some(39.0);
            r.study_id = Some("S1".to_string());
            r.sample_type = Some("Nasal".to_string());
            records.push(r);
        }
        let mut r = VlRecord::new("P2", 1.0, 4.0);
        r.age_lo = Some(40.0);
        r.age_hi = Some(64.0);
        r.study_id = Some("S2".to_string());
        r.sample_type = Some("Nasal".to_string());
        records.push(r);

        let columns = ColumnPresence {
            age_range: true,
            study_id: true,
            sample_type: true,
            ..ColumnPresence::default()
        };
        Dataset::from_records(records, columns).unwrap()
    }

    fn app() -> App {
        let ds = dataset();
        let spec = FilterSpec::from_selection(&FilterSelection::default(), &ds.columns, &ds.stats).unwrap();
        App::new(ds, spec, 25)
    }

    fn select(app: &mut App, field: Field) {
        app.selected_field = FIELDS.iter().position(|f| *f == field).unwrap();
    }

    #[test]
    fn toggling_a_study_refilters() {
        let mut app = app();
        assert_eq!(app.view.as_ref().unwrap().n_rows, 10);

        select(&mut app, Field::Study);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.study_cursor, 1);
        app.handle_key(KeyCode::Char(' '));
        assert_eq!(app.view.as_ref().unwrap().n_rows, 9);
        assert_eq!(app.status, "study S2: off");
    }

    #[test]
    fn age_window_is_clamped_and_can_empty_the_view() {
        let mut app = app();
        select(&mut app, Field::AgeMin);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.spec.age_range, Some((18.0, 64.0)));

        select(&mut app, Field::AgeMax);
        for _ in 0..30 {
            app.handle_key(KeyCode::Left);
        }
        assert_eq!(app.spec.age_range, Some((18.0, 34.0)));
        assert_eq!(app.view.as_ref().unwrap().n_rows, 9);

        select(&mut app, Field::Study);
        app.handle_key(KeyCode::Enter);
        assert!(app.view.is_none());
        assert!(app.status.contains("No rows"));
    }

    #[test]
    fn fit_toggle_fits_the_selected_subject() {
        let mut app = app();
        assert!(!app.handle_key(KeyCode::Char('f')));
        let view = app.view.as_ref().unwrap();
        let fit = view.fit.as_ref().unwrap();
        assert_eq!(fit.subject, "P1");
        assert!(fit.result.is_ok());

        let data = chart_series(view, true);
        assert_eq!(data.points.len(), 9);
        assert_eq!(data.curve.len(), CURVE_GRID_POINTS);
        assert!(data.lines.is_empty());

        select(&mut app, Field::Subject);
        app.handle_key(KeyCode::Right);
        let fit = app.view.as_ref().unwrap().fit.as_ref().unwrap();
        assert_eq!(fit.subject, "P2");
        assert!(fit.result.is_err());
        assert!(chart_series(app.view.as_ref().unwrap(), true).title.contains(FIT_FAILED_TITLE));
    }

    #[test]
    fn overlay_series_cover_every_point() {
        let app = app();
        let data = chart_series(app.view.as_ref().unwrap(), false);
        assert_eq!(data.lines.len(), 2);
        assert_eq!(data.points.len(), 10);
        assert!(data.x_bounds[0] < 0.0 && data.x_bounds[1] > 8.0);
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        assert!(app.handle_key(KeyCode::Char('q')));
        assert!(app.handle_key(KeyCode::Esc));
    }

    #[test]
    fn cycle_wraps() {
        assert_eq!(cycle(0, 3, -1), 2);
        assert_eq!(cycle(2, 3, 1), 0);
        assert_eq!(cycle(5, 0, 1), 0);
    }
}
