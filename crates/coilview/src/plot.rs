//! Scene drawing on any plotters backend
//!
//! The field chart keeps a 1:1 data aspect and the color bar to its right
//! spans the same height. Bitmap, SVG and PDF exports all draw through here.

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::colormap::Rgb;
use crate::export::ExportOptions;
use crate::render::{CoilMarker, Scene, X_LABEL, Y_LABEL};
use crate::sample::Window;

pub const HIGHLIGHT_COLOR: RGBColor = RED;
/// Share of the canvas width taken by the field chart
const PLOT_SHARE: f64 = 0.8;
const MARGIN: i32 = 10;
const COLORBAR_STEPS: usize = 256;
/// Half size of the pick cross (px)
const MARKER_SIZE: i32 = 6;

pub type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Pixel layout of the field chart on a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Label font size (px)
    pub font: i32,
    /// Width of the field chart column; the color bar takes the rest
    pub plot_width: i32,
    pub x_label_area: i32,
    pub y_label_area: i32,
    /// Padding on each side that squares the data aspect
    pub pad_x: i32,
    pub pad_y: i32,
}

impl Layout {
    pub fn new(window: &Window, width: u32, height: u32) -> Self {
        let font = (width.min(height) / 50).clamp(8, 24) as i32;
        let plot_width = (width as f64 * PLOT_SHARE) as i32;
        let (x_label_area, y_label_area) = (3 * font, 5 * font);

        let avail_w = (plot_width - 2 * MARGIN - y_label_area).max(1) as f64;
        let avail_h = (height as i32 - 2 * MARGIN - x_label_area).max(1) as f64;
        let (ww, wh) = (positive(window.width()), positive(window.height()));
        let scale = (avail_w / ww).min(avail_h / wh);

        Self {
            font,
            plot_width,
            x_label_area,
            y_label_area,
            pad_x: ((avail_w - ww * scale) / 2.0) as i32,
            pad_y: ((avail_h - wh * scale) / 2.0) as i32,
        }
    }

    /// Pixel size of the field data area on a canvas of `height`
    pub fn data_size(&self, height: u32) -> (i32, i32) {
        (
            self.plot_width - 2 * MARGIN - self.y_label_area - 2 * self.pad_x,
            height as i32 - 2 * MARGIN - self.x_label_area - 2 * self.pad_y,
        )
    }
}

fn positive(extent: f64) -> f64 {
    if extent > 0.0 {
        extent
    } else {
        1.0
    }
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

/// Draw the field chart and color bar of `scene` over all of `root`
///
/// `cell_px` is the edge of the square field cells in pixels; vector
/// backends use coarser cells to keep the element count down.
pub fn draw_scene<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    scene: &Scene,
    opts: &ExportOptions,
    cell_px: u32,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let (width, height) = root.dim_in_pixel();
    let layout = Layout::new(&scene.window, width, height);
    let (plot_area, bar_area) = root.split_horizontally(layout.plot_width);

    draw_field(&plot_area, scene, &layout, opts, cell_px)?;
    draw_colorbar(&bar_area, scene, &layout)
}

fn draw_field<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scene: &Scene,
    layout: &Layout,
    opts: &ExportOptions,
    cell_px: u32,
) -> DrawResult<DB> {
    let area = area.margin(layout.pad_y, layout.pad_y, layout.pad_x, layout.pad_x);
    let w = scene.window;

    let mut chart = ChartBuilder::on(&area)
        .margin(MARGIN)
        .x_label_area_size(layout.x_label_area)
        .y_label_area_size(layout.y_label_area)
        .build_cartesian_2d(w.z_min..w.z_max, w.rho_min..w.rho_max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .label_style(("sans-serif", layout.font))
        .axis_desc_style(("sans-serif", layout.font))
        .x_label_formatter(&|v| format!("{:.3}", v))
        .y_label_formatter(&|v| format!("{:.3}", v))
        .draw()?;

    let (px_w, px_h) = chart.plotting_area().dim_in_pixel();
    chart.draw_series(
        field_cells(scene, px_w, px_h, cell_px)
            .into_iter()
            .map(|(corners, color)| Rectangle::new(corners, rgb(color).filled())),
    )?;

    let px_per_pt = opts.dpi as f64 / 72.0;
    chart.draw_series(scene.coils.iter().filter_map(|coil| {
        let width = (coil.line_width * px_per_pt).round().max(1.0) as u32;
        coil_segment(coil, &w)
            .map(|points| PathElement::new(points.to_vec(), rgb(coil.color).stroke_width(width)))
    }))?;

    if let Some(h) = &scene.highlight {
        let hw = h.window;
        chart.plotting_area().draw(&Rectangle::new(
            [(hw.z_min, hw.rho_min), (hw.z_max, hw.rho_max)],
            HIGHLIGHT_COLOR.stroke_width(2),
        ))?;
        if !h.label.is_empty() {
            chart.plotting_area().draw(&Text::new(
                h.label.clone(),
                (hw.z_min, hw.rho_max),
                ("sans-serif", layout.font).into_font().color(&HIGHLIGHT_COLOR),
            ))?;
        }
    }

    if let Some(pick) = &scene.marker {
        chart
            .plotting_area()
            .draw(&Cross::new((pick.x, pick.y), MARKER_SIZE, BLACK.stroke_width(2)))?;
    }
    Ok(())
}

/// Color bar with the legend labels on its right, level with the field
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scene: &Scene,
    layout: &Layout,
) -> DrawResult<DB> {
    let (bar_w, _) = area.dim_in_pixel();
    let label_area = (6 * layout.font).min(bar_w as i32 * 2 / 3);
    let area = area.margin(
        layout.pad_y + MARGIN,
        layout.pad_y + MARGIN + layout.x_label_area,
        MARGIN,
        0,
    );
    let ticks: Vec<f64> = scene.legend.iter().map(|t| scene.range.normalize(t.value)).collect();

    let mut bar = ChartBuilder::on(&area)
        .set_label_area_size(LabelAreaPosition::Right, label_area)
        .build_cartesian_2d(0.0..1.0, (0.0..1.0).with_key_points(ticks))?;

    bar.configure_mesh()
        .disable_x_axis()
        .disable_mesh()
        .label_style(("sans-serif", layout.font))
        .y_label_formatter(&|t| tick_label(scene, *t))
        .draw()?;

    for k in 0..COLORBAR_STEPS {
        let t0 = k as f64 / COLORBAR_STEPS as f64;
        let t1 = (k + 1) as f64 / COLORBAR_STEPS as f64;
        let color = rgb(scene.colormap.color_at((t0 + t1) / 2.0));
        bar.plotting_area()
            .draw(&Rectangle::new([(0.0, t0), (1.0, t1)], color.filled()))?;
    }
    Ok(())
}

/// Colored cells tiling the window, about `cell_px` pixels each
///
/// Points no mesh covers are left out so the background shows through.
pub fn field_cells(scene: &Scene, px_w: u32, px_h: u32, cell_px: u32) -> Vec<([(f64, f64); 2], Rgb)> {
    let w = &scene.window;
    let cell_px = cell_px.max(1);
    let nx = (px_w / cell_px).max(1) as usize;
    let ny = (px_h / cell_px).max(1) as usize;
    let (dz, dr) = (w.width() / nx as f64, w.height() / ny as f64);

    let mut cells = Vec::with_capacity(nx * ny);
    for i in 0..nx {
        for j in 0..ny {
            let (z0, r0) = (w.z_min + i as f64 * dz, w.rho_min + j as f64 * dr);
            if let Some(value) = scene.value_at(z0 + dz / 2.0, r0 + dr / 2.0) {
                let color = scene.colormap.color_at(scene.range.normalize(value));
                cells.push(([(z0, r0), (z0 + dz, r0 + dr)], color));
            }
        }
    }
    cells
}

/// Coil line clipped to the window, `None` when it lies outside
pub fn coil_segment(coil: &CoilMarker, window: &Window) -> Option<[(f64, f64); 2]> {
    if coil.position < window.z_min || coil.position > window.z_max {
        return None;
    }
    let lo = (-coil.radius).max(window.rho_min);
    let hi = coil.radius.min(window.rho_max);
    (lo < hi).then_some([(coil.position, lo), (coil.position, hi)])
}

/// Legend label nearest to the normalized bar position `t`
fn tick_label(scene: &Scene, t: f64) -> String {
    scene
        .legend
        .iter()
        .map(|tick| ((scene.range.normalize(tick.value) - t).abs(), tick))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, tick)| tick.label.clone())
        .unwrap_or_default()
}
