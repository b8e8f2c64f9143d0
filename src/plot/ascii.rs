//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - overlay trajectories: `.` lines with `o` markers
//! - fit plot: observed points `o`, fitted curve `-`

use crate::cohort::Overlay;
use crate::domain::{CurveFile, KineticParameters, Observation};
use crate::io::CURVE_GRID_POINTS;
use crate::models::{evaluate_at, linspace};
use crate::report::FIT_FAILED_TITLE;

/// One drawable series.
struct Layer<'a> {
    points: &'a [(f64, f64)],
    line: Option<char>,
    marker: Option<char>,
}

/// Render the trajectory overlay.
pub fn render_overlay_plot(overlay: &Overlay, width: usize, height: usize) -> String {
    let series: Vec<Vec<(f64, f64)>> = overlay
        .trajectories
        .iter()
        .map(|t| t.points.iter().map(|p| (p.t, p.y)).collect())
        .collect();
    let layers: Vec<Layer<'_>> = series
        .iter()
        .map(|points| Layer {
            points,
            line: Some('.'),
            marker: Some('o'),
        })
        .collect();

    let title = format!(
        "Viral load over time (sample of {} people) | y: {}",
        overlay.subjects.len(),
        overlay.y_label
    );
    render_plot(&title, &layers, width, height)
}

/// Render one subject's observations with its fitted curve.
///
/// `params = None` means the fit failed: only the observations are drawn.
pub fn render_fit_plot(
    observations: &[Observation],
    params: Option<&KineticParameters>,
    width: usize,
    height: usize,
) -> String {
    let observed: Vec<(f64, f64)> = observations.iter().map(|o| (o.t, o.y)).collect();

    let curve: Vec<(f64, f64)> = match (params, time_span(&observed)) {
        (Some(p), Some((lo, hi))) => linspace(lo, hi, CURVE_GRID_POINTS)
            .into_iter()
            .map(|t| (t, evaluate_at(t, p)))
            .collect(),
        _ => Vec::new(),
    };

    let title = if params.is_some() {
        "Piecewise linear fit | y: Log10 Viral Load"
    } else {
        FIT_FAILED_TITLE
    };

    let layers = [
        Layer {
            points: &curve,
            line: Some('-'),
            marker: None,
        },
        Layer {
            points: &observed,
            line: None,
            marker: Some('o'),
        },
    ];
    render_plot(title, &layers, width, height)
}

/// Render a saved curve file (curve only).
pub fn render_curve_plot(curve: &CurveFile, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = curve
        .grid
        .time_days
        .iter()
        .zip(curve.grid.y.iter())
        .map(|(&t, &y)| (t, y))
        .collect();

    let title = format!("Fitted curve for subject {}", curve.subject);
    let layers = [Layer {
        points: &points,
        line: Some('-'),
        marker: None,
    }];
    render_plot(&title, &layers, width, height)
}

fn render_plot(title: &str, layers: &[Layer<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');

    let all: Vec<(f64, f64)> = layers
        .iter()
        .flat_map(|l| l.points.iter().copied())
        .filter(|(t, y)| t.is_finite() && y.is_finite())
        .collect();
    let (Some((t_min, t_max)), Some((y_min, y_max))) = (time_span(&all), value_span(&all)) else {
        out.push_str("(no data to plot)\n");
        return out;
    };
    let (t_min, t_max) = widen(t_min, t_max);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers land on top.
    for layer in layers {
        if let Some(ch) = layer.line {
            draw_polyline(&mut grid, layer.points, ch, (t_min, t_max), (y_min, y_max));
        }
    }
    for layer in layers {
        if let Some(ch) = layer.marker {
            for &(t, y) in layer.points {
                if !(t.is_finite() && y.is_finite()) {
                    continue;
                }
                let x = map_x(t, t_min, t_max, width);
                let yy = map_y(y, y_min, y_max, height);
                grid[yy][x] = ch;
            }
        }
    }

    out.push_str(&format!(
        "Plot: time=[{t_min:.2}, {t_max:.2}] days | y=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn time_span(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    span(points.iter().map(|p| p.0))
}

fn value_span(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    span(points.iter().map(|p| p.1))
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() { Some((lo, hi)) } else { None }
}

/// A single time is still plottable: give it a one-day window.
fn widen(min: f64, max: f64) -> (f64, f64) {
    if max > min { (min, max) } else { (min - 0.5, max + 0.5) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    if span == 0.0 {
        return (min - 0.5, max + 0.5);
    }
    let pad = span * frac;
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

fn draw_polyline(grid: &mut [Vec<char>], points: &[(f64, f64)], ch: char, t: (f64, f64), y: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(pt, py) in points {
        if !(pt.is_finite() && py.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(pt, t.0, t.1, width);
        let yy = map_y(py, y.0, y.1, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None => {
                if grid[yy][x] == ' ' {
                    grid[yy][x] = ch;
                }
            }
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham); never overwrites a filled cell.
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
