//! Plotters-powered attribution bar widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `BarChart` widget?
//! - horizontal bars with real-valued (signed) extents
//! - nicer axis + tick rendering
//! - easy to extend later (annotations, exportable PNG/SVG backends, etc.)
//!
//! We render Plotters output into the Ratatui buffer using
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A lightweight, render-only chart description.
///
/// The widget is intentionally data-driven: items, ordering, and bounds are
/// computed outside the render call. This keeps `render()` focused on drawing
/// and makes the data prep testable separately.
pub struct AttributionBars<'a> {
    /// Bars in display order, top to bottom. Values are bar extents.
    pub items: &'a [(String, f64)],
    /// Signed mode: negative bars extend left of a zero axis and bars are
    /// colored by sign.
    pub diverging: bool,
    /// X bounds (contribution units).
    pub x_bounds: [f64; 2],
    /// Formatting of x tick labels.
    pub fmt_x: fn(f64) -> String,
}

impl Widget for AttributionBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a
        // chart. In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 4 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let n = self.items.len();

        if n == 0 || !(x0.is_finite() && x1.is_finite()) || x1 <= x0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                // Small margins keep the chart readable without wasting space.
                .margin(1)
                // Terminal cells are low-res, so keep the label area compact.
                .set_label_area_size(LabelAreaPosition::Bottom, 2)
                .build_cartesian_2d(x0..x1, 0.0..(n as f64))?;

            // X axis + tick labels only; bar labels are drawn by the caller
            // as ordinary terminal text, and mesh lines would just add
            // clutter at terminal resolution.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(4)
                .y_labels(0)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .draw()?;

            // Series styling: keep the palette high-contrast for terminal
            // readability.
            let neutral = RGBColor(0, 255, 255); // cyan
            let positive = RGBColor(0, 255, 0); // green
            let negative = RGBColor(255, 0, 0); // red

            // Zero axis for signed charts.
            if self.diverging && x0 < 0.0 && 0.0 < x1 {
                chart.draw_series(LineSeries::new(
                    vec![(0.0, 0.0), (0.0, n as f64)],
                    &WHITE,
                ))?;
            }

            // Horizontal bars: item 0 occupies the top band.
            chart.draw_series(self.items.iter().enumerate().map(|(i, (_, v))| {
                let top = (n - i) as f64 - 0.2;
                let bottom = (n - 1 - i) as f64 + 0.2;
                let (x_lo, x_hi) = if *v < 0.0 { (*v, 0.0) } else { (0.0, *v) };
                let color = if !self.diverging {
                    neutral
                } else if *v < 0.0 {
                    negative
                } else {
                    positive
                };
                Rectangle::new([(x_lo, bottom), (x_hi, top)], color.filled())
            }))?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
