//! SVG figure export via Plotters.
//!
//! Figures use a 10:6 aspect (1000x600 px) in a light or dark theme. Drawing
//! is generic over the Plotters backend so tests can render into a string.

use std::error::Error;
use std::path::Path;

use log::info;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::cohort::Overlay;
use crate::domain::{KineticParameters, Observation};
use crate::error::AppError;
use crate::io::CURVE_GRID_POINTS;
use crate::models::{evaluate_at, linspace};
use crate::report::FIT_FAILED_TITLE;

pub const FIGURE_SIZE: (u32, u32) = (1000, 600);

const X_LABEL: &str = "Time (days)";

/// Figure colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureStyle {
    pub background: RGBColor,
    pub foreground: RGBColor,
}

impl FigureStyle {
    pub fn light() -> Self {
        Self {
            background: WHITE,
            foreground: BLACK,
        }
    }

    pub fn dark() -> Self {
        Self {
            background: RGBColor(0x0e, 0x11, 0x17),
            foreground: WHITE,
        }
    }

    pub fn for_mode(dark: bool) -> Self {
        if dark { Self::dark() } else { Self::light() }
    }
}

/// Write the trajectory overlay as an SVG file.
pub fn export_overlay_svg(path: &Path, overlay: &Overlay, style: &FigureStyle) -> Result<(), AppError> {
    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    draw_overlay(root, overlay, style)
        .map_err(|e| AppError::input(format!("Failed to write SVG '{}': {e}", path.display())))?;
    info!("wrote overlay figure to '{}'", path.display());
    Ok(())
}

/// Write one subject's fit as an SVG file.
pub fn export_fit_svg(
    path: &Path,
    subject: &str,
    observations: &[Observation],
    params: Option<&KineticParameters>,
    style: &FigureStyle,
) -> Result<(), AppError> {
    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    draw_fit(root, subject, observations, params, style)
        .map_err(|e| AppError::input(format!("Failed to write SVG '{}': {e}", path.display())))?;
    info!("wrote fit figure for subject {subject} to '{}'", path.display());
    Ok(())
}

pub fn draw_overlay<DB>(root: DrawingArea<DB, Shift>, overlay: &Overlay, style: &FigureStyle) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let fg = style.foreground;
    root.fill(&style.background)?;

    let title = format!("Viral Load Over Time (Sample of {} People)", overlay.subjects.len());
    let (x0, x1, y0, y1) = overlay.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    let (x0, x1) = padded(x0, x1);
    let (y0, y1) = padded(y0, y1);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22).into_font().color(&fg))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    configure_axes(&mut chart, overlay.y_label, style)?;

    // Thin translucent lines with small markers, one per trajectory.
    let line_style = fg.mix(0.2).stroke_width(1);
    for trajectory in &overlay.trajectories {
        let points: Vec<(f64, f64)> = trajectory.points.iter().map(|p| (p.t, p.y)).collect();
        chart.draw_series(LineSeries::new(points.iter().copied(), line_style))?;
        chart.draw_series(points.iter().map(|&xy| Circle::new(xy, 3, fg.mix(0.2).filled())))?;
    }

    root.present()?;
    Ok(())
}

pub fn draw_fit<DB>(
    root: DrawingArea<DB, Shift>,
    subject: &str,
    observations: &[Observation],
    params: Option<&KineticParameters>,
    style: &FigureStyle,
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let fg = style.foreground;
    root.fill(&style.background)?;

    let (t_lo, t_hi) = span(observations.iter().map(|o| o.t)).unwrap_or((0.0, 1.0));
    let curve: Vec<(f64, f64)> = match params {
        Some(p) => linspace(t_lo, t_hi, CURVE_GRID_POINTS)
            .into_iter()
            .map(|t| (t, evaluate_at(t, p)))
            .collect(),
        None => Vec::new(),
    };
    let (y_lo, y_hi) = span(observations.iter().map(|o| o.y).chain(curve.iter().map(|c| c.1))).unwrap_or((0.0, 1.0));
    let (x0, x1) = padded(t_lo, t_hi);
    let (y0, y1) = padded(y_lo, y_hi);

    let title = if params.is_some() {
        format!("Piecewise Linear Fit to Viral Kinetics (subject {subject})")
    } else {
        FIT_FAILED_TITLE.to_string()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22).into_font().color(&fg))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    configure_axes(&mut chart, "Log10 Viral Load", style)?;

    chart
        .draw_series(
            observations
                .iter()
                .map(|o| Circle::new((o.t, o.y), 4, BLUE.filled())),
        )?
        .label("Observed")
        .legend(|(x, y)| Circle::new((x, y), 4, BLUE.filled()));

    if !curve.is_empty() {
        chart
            .draw_series(LineSeries::new(curve.iter().copied(), RED.stroke_width(2)))?
            .label("Piecewise Fit")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(style.background.mix(0.8))
        .border_style(fg)
        .label_font(("sans-serif", 14).into_font().color(&fg))
        .draw()?;

    root.present()?;
    Ok(())
}

fn configure_axes<DB>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    y_label: &str,
    style: &FigureStyle,
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let fg = style.foreground;
    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .y_desc(y_label)
        .axis_desc_style(("sans-serif", 16).into_font().color(&fg))
        .label_style(("sans-serif", 12).into_font().color(&fg))
        .axis_style(fg)
        .bold_line_style(fg.mix(0.2))
        .light_line_style(fg.mix(0.05))
        .draw()?;
    Ok(())
}

fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() { Some((lo, hi)) } else { None }
}

/// 5% padding; degenerate ranges get a unit window.
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - 0.05 * span, hi + 0.05 * span)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{Trajectory, TrajectoryKey, Y_LABEL_GE};

    fn overlay() -> Overlay {
        Overlay {
            trajectories: vec![Trajectory {
                key: TrajectoryKey {
                    person_id: "P1".to_string(),
                    infection_id: None,
                    sample_type: None,
                },
                points: vec![Observation::new(0.0, 3.0), Observation::new(2.0, 6.0), Observation::new(5.0, 4.0)],
            }],
            subjects: vec!["P1".to_string()],
            y_label: Y_LABEL_GE,
            ge_transformed: true,
        }
    }

    #[test]
    fn dark_overlay_svg_uses_dark_background() {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, FIGURE_SIZE).into_drawing_area();
            draw_overlay(root, &overlay(), &FigureStyle::dark()).unwrap();
        }
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Sample of 1 People"));
        assert!(svg.contains("GE/ml"));
        assert!(svg.to_ascii_uppercase().contains("#0E1117"));
    }

    #[test]
    fn failed_fit_svg_has_failure_title() {
        let obs = [Observation::new(0.0, 3.0), Observation::new(1.0, 4.0)];
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, FIGURE_SIZE).into_drawing_area();
            draw_fit(root, "P1", &obs, None, &FigureStyle::light()).unwrap();
        }
        assert!(svg.contains(FIT_FAILED_TITLE));
        assert!(!svg.contains("Piecewise Fit"));
    }

    #[test]
    fn svg_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.svg");
        export_overlay_svg(&path, &overlay(), &FigureStyle::light()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Time (days)"));
    }
}
