//! Plotters-powered kinetics chart widget for Ratatui.
//!
//! Plotters gives us axes and line/point series without manual tick math; the
//! output is drawn into the Ratatui buffer through `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// Render-only chart description; all series and bounds are computed outside
/// the render call.
pub struct KineticsChart<'a> {
    /// One polyline per trajectory (overlay view).
    pub lines: &'a [Vec<(f64, f64)>],
    /// Observed points.
    pub points: &'a [(f64, f64)],
    /// Fitted curve (fit view); empty when there is none.
    pub curve: &'a [(f64, f64)],
    /// X bounds (days).
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for KineticsChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are noise at terminal resolution; axes + labels suffice.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let line_color = RGBColor(128, 128, 128);
            let point_color = WHITE;
            let curve_color = RGBColor(255, 64, 64);

            for line in self.lines {
                chart.draw_series(LineSeries::new(line.iter().copied(), &line_color))?;
            }

            // `Pixel` rather than `Circle`: the ratatui backend scales circle
            // radii in canvas units, which produces huge markers.
            chart.draw_series(self.points.iter().map(|&(x, y)| Pixel::new((x, y), point_color)))?;

            if !self.curve.is_empty() {
                chart.draw_series(LineSeries::new(self.curve.iter().copied(), &curve_color))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
