//! Tomography rendering.
//!
//! This module draws interpolated fields with the plotters library. Each
//! panel shows:
//! - The field as a pseudocolor image over the interpolation extent
//! - The raw samples as a semi-transparent scatter in the same color map
//! - A color bar labelled with the quantity
//! - The outlines of every committed selection polygon
//!
//! Panels are stacked vertically on one canvas.

pub mod export;
pub mod selection;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::colors::colormaps::ViridisRGB;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::config::PlotConfig;
use crate::core::loaders::SampleSet;
use crate::processors::interpolation::InterpolatedField;

pub use export::{Canvas, ExportError};
pub use selection::{PolygonSelector, SelectionError, SelectionPolygon};

/// Errors that can occur during rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Nothing to render")]
    NoPanels,

    #[error("Canvas error: {0}")]
    Canvas(#[from] ExportError),
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Steps used to paint the color bar gradient.
const COLORBAR_STEPS: usize = 256;

/// Outline color of committed selections.
const SELECTION_COLOR: RGBColor = RED;

/// One field to draw together with its samples and selections.
#[derive(Debug, Clone, Copy)]
pub struct FieldPanel<'a> {
    pub field: &'a InterpolatedField,
    pub samples: &'a SampleSet,
    pub selections: &'a [SelectionPolygon],
}

/// Map a value onto the color map, clamping outside `[lo, hi]`.
pub fn value_color(value: f64, lo: f64, hi: f64) -> RGBColor {
    let mut t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
    if t.is_nan() {
        t = 0.0;
    }
    ViridisRGB.get_color(t.clamp(0.0, 1.0))
}

/// Render the panels onto a single canvas.
///
/// # Errors
///
/// Returns an error if there are no panels or if plotters fails to draw.
pub fn render(panels: &[FieldPanel<'_>], config: &PlotConfig) -> Result<Canvas> {
    if panels.is_empty() {
        return Err(RenderError::NoPanels);
    }

    let (panel_w, panel_h) = config.panel_pixels();
    let width = panel_w;
    let height = panel_h * panels.len() as u32;
    let mut pixels = vec![255u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let areas = root.split_evenly((panels.len(), 1));
        for (area, panel) in areas.iter().zip(panels) {
            draw_panel(area, panel, config)?;
        }

        root.present().map_err(plot_err)?;
    }

    Ok(Canvas::from_rgb(width, height, pixels)?)
}

/// Scale a size given in points to pixels at the configured DPI.
fn pt(config: &PlotConfig, points: f64) -> u32 {
    (points * config.dpi as f64 / 72.0).round().max(1.0) as u32
}

/// Font size in pixels for a size given in points.
fn font(config: &PlotConfig, points: f64) -> f64 {
    points * config.dpi as f64 / 72.0
}

fn plot_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::PlottingError(e.to_string())
}

/// Widen a degenerate range so plotters gets a non-empty axis.
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        let pad = if lo == 0.0 { 0.5 } else { lo.abs() * 0.05 };
        (lo - pad, hi + pad)
    }
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &FieldPanel<'_>,
    config: &PlotConfig,
) -> Result<()> {
    let field = panel.field;
    let quantity = field.quantity;
    let grid = field.grid();
    let extent = grid.extent();

    // Samples and field share one normalisation; the field never leaves the
    // sample range, so it is the widest of the two.
    let (lo, hi) = panel
        .samples
        .value_range(quantity)
        .or_else(|| field.value_range())
        .unwrap_or((0.0, 1.0));
    let (bar_lo, bar_hi) = padded(lo, hi);

    let (area_w, _) = area.dim_in_pixel();
    let bar_width = (area_w as f64 * 0.12).round() as u32;
    let (main_area, bar_area) = area.split_horizontally(area_w - bar_width);

    let (x_min, x_max) = padded(extent.x_min, extent.x_max);
    let (y_min, y_max) = padded(extent.y_min, extent.y_max);

    let mut builder = ChartBuilder::on(&main_area);
    builder.margin(pt(config, 4.0));
    if config.annotate {
        builder
            .caption(config.title_for(quantity.label()), ("sans-serif", font(config, 12.0)))
            .x_label_area_size(pt(config, 30.0))
            .y_label_area_size(pt(config, 40.0));
    }
    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    if config.annotate {
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(config.x_label.as_str())
            .y_desc(config.y_label.as_str())
            .label_style(("sans-serif", font(config, 9.0)))
            .axis_desc_style(("sans-serif", font(config, 10.0)))
            .draw()
            .map_err(plot_err)?;
    }

    // Field image: one cell per grid node, undefined cells stay blank.
    let n = grid.resolution();
    let dx = extent.width() / n as f64;
    let dy = extent.height() / n as f64;
    chart
        .draw_series(field.values().iter().enumerate().filter_map(|(i, v)| {
            let v = (*v)?;
            let (row, col) = (i / n, i % n);
            let x0 = extent.x_min + col as f64 * dx;
            let y0 = extent.y_min + row as f64 * dy;
            Some(Rectangle::new(
                [(x0, y0), (x0 + dx, y0 + dy)],
                value_color(v, lo, hi).filled(),
            ))
        }))
        .map_err(plot_err)?;

    // Raw samples on top, faint enough to leave the image readable.
    let alpha = config.scatter_alpha.clamp(0.0, 1.0);
    let radius = config.marker_size;
    chart
        .draw_series(panel.samples.samples().map(|s| {
            let color = value_color(s.value(quantity), lo, hi);
            Circle::new((s.distance, s.depth), radius, color.mix(alpha).filled())
        }))
        .map_err(plot_err)?;
    chart
        .draw_series(panel.samples.samples().map(|s| {
            Circle::new((s.distance, s.depth), radius, BLACK.mix(alpha).stroke_width(1))
        }))
        .map_err(plot_err)?;

    for polygon in panel.selections {
        chart
            .draw_series(std::iter::once(PathElement::new(
                polygon.closed_path(),
                SELECTION_COLOR.stroke_width(config.selection_width),
            )))
            .map_err(plot_err)?;
    }

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(x_min, y_min), (x_max, y_max)],
            BLACK.stroke_width(1),
        )))
        .map_err(plot_err)?;

    draw_colorbar(&bar_area, quantity.label(), bar_lo, bar_hi, lo, hi, config)
}

fn draw_colorbar(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    label: &str,
    bar_lo: f64,
    bar_hi: f64,
    lo: f64,
    hi: f64,
    config: &PlotConfig,
) -> Result<()> {
    let mut builder = ChartBuilder::on(area);
    builder
        .margin_top(pt(config, 20.0))
        .margin_bottom(pt(config, 34.0))
        .margin_left(pt(config, 4.0))
        .margin_right(pt(config, 4.0));
    if config.annotate {
        builder.set_label_area_size(LabelAreaPosition::Right, pt(config, 40.0));
    }
    let mut bar = builder
        .build_cartesian_2d(0f64..1f64, bar_lo..bar_hi)
        .map_err(plot_err)?;

    if config.annotate {
        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_desc(label)
            .y_label_formatter(&|v| format_tick(*v))
            .label_style(("sans-serif", font(config, 9.0)))
            .axis_desc_style(("sans-serif", font(config, 10.0)))
            .draw()
            .map_err(plot_err)?;
    }

    let step = (bar_hi - bar_lo) / COLORBAR_STEPS as f64;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let y0 = bar_lo + step * i as f64;
        let color = value_color(y0 + step * 0.5, lo, hi);
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
    }))
    .map_err(plot_err)?;

    bar.draw_series(std::iter::once(Rectangle::new(
        [(0.0, bar_lo), (1.0, bar_hi)],
        BLACK.stroke_width(1),
    )))
    .map_err(plot_err)?;

    Ok(())
}

/// Tick label without units, switching to scientific notation for extremes.
fn format_tick(v: f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-2..1e4).contains(&a) {
        format!("{:.1e}", v)
    } else if a >= 100.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::{Quantity, Sample};
    use crate::processors::interpolation::interpolate_field;

    fn test_config() -> PlotConfig {
        // Text needs system fonts; keep the rendering tests font-free.
        PlotConfig {
            width_in: 4.0,
            height_in: 2.0,
            dpi: 50,
            annotate: false,
            scatter_alpha: 1.0,
            marker_size: 2,
            ..PlotConfig::default()
        }
    }

    fn samples() -> SampleSet {
        let mut set = SampleSet::with_capacity(30);
        for j in 0..5 {
            for i in 0..6 {
                let rho = 10.0 + i as f64 * 5.0 + j as f64;
                set.push(Sample {
                    distance: i as f64 * 2.0,
                    depth: -(j as f64),
                    resistivity: rho,
                    conductivity: 1.0 / rho,
                });
            }
        }
        set
    }

    fn is_selection(p: [u8; 3]) -> bool {
        p == [255, 0, 0]
    }

    #[test]
    fn test_value_color_clamps() {
        assert_eq!(value_color(-5.0, 0.0, 1.0), value_color(0.0, 0.0, 1.0));
        assert_eq!(value_color(9.0, 0.0, 1.0), value_color(1.0, 0.0, 1.0));
        assert_ne!(value_color(0.0, 0.0, 1.0), value_color(1.0, 0.0, 1.0));
        // Constant fields map to the middle of the scale.
        assert_eq!(value_color(3.0, 3.0, 3.0), value_color(0.5, 0.0, 1.0));
    }

    #[test]
    fn test_render_no_panels() {
        assert!(matches!(render(&[], &test_config()), Err(RenderError::NoPanels)));
    }

    #[test]
    fn test_render_dimensions_and_field_pixels() {
        let set = samples();
        let field = interpolate_field(&set, Quantity::Resistivity, 30).unwrap();
        let config = test_config();
        let panel = FieldPanel {
            field: &field,
            samples: &set,
            selections: &[],
        };

        let canvas = render(&[panel, panel], &config).unwrap();
        assert_eq!((canvas.width(), canvas.height()), (200, 200));

        // The middle of each plot area lies inside the sample hull.
        assert_ne!(canvas.pixel(88, 50), export::BACKGROUND);
        assert_ne!(canvas.pixel(88, 150), export::BACKGROUND);
        assert_eq!(canvas.count_pixels(is_selection), 0);
    }

    #[test]
    fn test_cells_outside_hull_stay_blank() {
        let set = SampleSet::from_samples(&[
            Sample {
                distance: 0.0,
                depth: 0.0,
                resistivity: 10.0,
                conductivity: 0.1,
            },
            Sample {
                distance: 1.0,
                depth: 0.0,
                resistivity: 20.0,
                conductivity: 0.05,
            },
            Sample {
                distance: 0.0,
                depth: 1.0,
                resistivity: 30.0,
                conductivity: 0.033,
            },
        ]);
        let field = interpolate_field(&set, Quantity::Resistivity, 30).unwrap();
        let config = test_config();
        let panel = FieldPanel {
            field: &field,
            samples: &set,
            selections: &[],
        };
        let canvas = render(&[panel], &config).unwrap();

        // 200x100 canvas: a 24 px colour bar on the right and a 3 px margin
        // leave the plot area at x 3..173, y 3..97.
        let to_pixel = |x: f64, y: f64| (3 + (x * 170.0) as u32, 3 + ((1.0 - y) * 94.0) as u32);

        let (ix, iy) = to_pixel(0.2, 0.2);
        assert_ne!(canvas.pixel(ix, iy), export::BACKGROUND);

        // Past the hypotenuse the field is undefined.
        let (ox, oy) = to_pixel(0.8, 0.8);
        assert_eq!(canvas.pixel(ox, oy), export::BACKGROUND);
    }

    #[test]
    fn test_selection_outline_drawn_and_persists() {
        let set = samples();
        let field = interpolate_field(&set, Quantity::Conductivity, 30).unwrap();
        let config = test_config();

        let mut selector = PolygonSelector::new();
        assert!(!selector.commit(vec![(1.0, -1.0), (8.0, -3.0)]));
        assert!(selector.commit(vec![(1.0, -1.0), (8.0, -1.0), (4.0, -3.5)]));

        let panel = FieldPanel {
            field: &field,
            samples: &set,
            selections: selector.polygons(),
        };
        let first = render(&[panel], &config).unwrap();
        let first_count = first.count_pixels(is_selection);
        assert!(first_count > 0);

        // Redrawing after another commit keeps the earlier outline.
        assert!(selector.commit(vec![(0.5, -0.5), (2.0, -0.5), (2.0, -2.0)]));
        let panel = FieldPanel {
            field: &field,
            samples: &set,
            selections: selector.polygons(),
        };
        let second = render(&[panel], &config).unwrap();
        assert!(second.count_pixels(is_selection) > first_count);
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0.00");
        assert_eq!(format_tick(12.345), "12.35");
        assert_eq!(format_tick(250.0), "250");
        assert_eq!(format_tick(0.0004), "4.0e-4");
    }
}
