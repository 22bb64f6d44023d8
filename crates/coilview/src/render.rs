//! Scene composition: field mesh, mirrored half-plane, coil overlay and legend
//!
//! The scene is a plain description; any 2D surface (a plotters backend, a
//! browser canvas fed by `to_binary`) can draw it.

use serde::Serialize;

use crate::color_scale::{format_sci, ColorRange};
use crate::colormap::{parse_color, Colormap, Rgb};
use crate::error::{Result, ViewError};
use crate::pick::Pick;
use crate::sample::{Coil, FieldSample, Window};

/// Number of labelled ticks on the color bar
pub const LEGEND_TICKS: usize = 5;
/// Coil line width (pt) per turn
pub const LINE_WIDTH_PER_TURN: f64 = 0.1;

pub const X_LABEL: &str = "z [m]";
pub const Y_LABEL: &str = "y [m]";

/// Drawable description of one display state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    /// Axis limits; aspect ratio is always 1:1
    pub window: Window,
    pub colormap: Colormap,
    pub range: ColorRange,
    pub meshes: Vec<FieldMesh>,
    pub coils: Vec<CoilMarker>,
    pub legend: Vec<LegendTick>,
    /// Persistent pick marker
    pub marker: Option<Pick>,
    /// Outline of a zoom window drawn on top of the field
    pub highlight: Option<Highlight>,
}

/// Gouraud-shaded mesh over a rectilinear grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMesh {
    /// Axial coordinates (rows)
    pub z: Vec<f64>,
    /// Radial coordinates (columns); negated and descending when mirrored
    pub rho: Vec<f64>,
    /// Row-major magnitudes, `values[i * rho.len() + j]`
    pub values: Vec<f64>,
    pub mirrored: bool,
}

/// Vertical segment spanning `[-radius, radius]` at the coil position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoilMarker {
    pub position: f64,
    pub radius: f64,
    /// Line width in points
    pub line_width: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendTick {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    pub window: Window,
    pub label: String,
}

/// Compose the scene for a windowed sample
pub fn render(
    sample: &FieldSample,
    window: &Window,
    range: &ColorRange,
    coils: &[Coil],
    mirror: bool,
    colormap: Colormap,
) -> Result<Scene> {
    if sample.is_empty() {
        return Err(ViewError::EmptyWindow {
            rows: sample.rows(),
            cols: sample.cols(),
        });
    }

    let mut meshes = vec![FieldMesh::from_sample(sample, false)];
    if mirror {
        meshes.push(FieldMesh::from_sample(sample, true));
    }

    let coils = coils
        .iter()
        .map(|c| CoilMarker {
            position: c.position,
            radius: c.radius,
            line_width: c.turns as f64 * LINE_WIDTH_PER_TURN,
            color: parse_color(&c.color),
        })
        .collect();

    Ok(Scene {
        window: *window,
        colormap,
        range: *range,
        meshes,
        coils,
        legend: legend_ticks(range),
        marker: None,
        highlight: None,
    })
}

/// Evenly spaced color bar ticks; end labels flag clipped data
pub fn legend_ticks(range: &ColorRange) -> Vec<LegendTick> {
    let step = (range.max_val - range.min_val) / (LEGEND_TICKS - 1) as f64;
    let mut ticks: Vec<LegendTick> = (0..LEGEND_TICKS)
        .map(|k| {
            let value = if k == LEGEND_TICKS - 1 {
                range.max_val
            } else {
                range.min_val + step * k as f64
            };
            LegendTick { value, label: format_sci(value) }
        })
        .collect();

    if range.clips_high {
        if let Some(top) = ticks.last_mut() {
            top.label = format!("≥ {}", top.label);
        }
    }
    if range.clips_low {
        if let Some(bottom) = ticks.first_mut() {
            bottom.label = format!("≤ {}", bottom.label);
        }
    }
    ticks
}

impl FieldMesh {
    fn from_sample(sample: &FieldSample, mirrored: bool) -> Self {
        let sign = if mirrored { -1.0 } else { 1.0 };
        let (nz, nr) = (sample.rows(), sample.cols());
        let mut values = Vec::with_capacity(nz * nr);
        for i in 0..nz {
            for j in 0..nr {
                values.push(sample.norm[(i, j)]);
            }
        }
        Self {
            z: sample.z_axis(),
            rho: sample.rho_axis().into_iter().map(|r| sign * r).collect(),
            values,
            mirrored,
        }
    }

    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.rho.len() + j]
    }

    /// Bilinear interpolation, `None` outside the mesh
    pub fn value_at(&self, z: f64, rho: f64) -> Option<f64> {
        let (i, fz) = bracket(&self.z, z)?;
        let (j, fr) = bracket(&self.rho, rho)?;
        let i1 = (i + 1).min(self.z.len() - 1);
        let j1 = (j + 1).min(self.rho.len() - 1);

        let v00 = self.value(i, j);
        let v01 = self.value(i, j1);
        let v10 = self.value(i1, j);
        let v11 = self.value(i1, j1);
        let low = v00 + fr * (v01 - v00);
        let high = v10 + fr * (v11 - v10);
        Some(low + fz * (high - low))
    }

    /// (z_min, z_max, rho_min, rho_max) covered by the mesh
    pub fn extent(&self) -> Window {
        let (z0, z1) = min_max(&self.z);
        let (r0, r1) = min_max(&self.rho);
        Window::new(z0, z1, r0, r1)
    }
}

fn min_max(axis: &[f64]) -> (f64, f64) {
    axis.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Cell index and fraction of `x` on a monotonic axis (either direction)
fn bracket(axis: &[f64], x: f64) -> Option<(usize, f64)> {
    let n = axis.len();
    if n == 0 {
        return None;
    }
    let (lo, hi) = (axis[0].min(axis[n - 1]), axis[0].max(axis[n - 1]));
    if !(x >= lo && x <= hi) {
        return None;
    }
    if n == 1 {
        return Some((0, 0.0));
    }

    let idx = if axis[n - 1] >= axis[0] {
        axis.partition_point(|&v| v <= x)
    } else {
        axis.partition_point(|&v| v >= x)
    };
    let i = idx.saturating_sub(1).min(n - 2);
    let (a, b) = (axis[i], axis[i + 1]);
    let f = if b != a { ((x - a) / (b - a)).clamp(0.0, 1.0) } else { 0.0 };
    Some((i, f))
}

impl Scene {
    pub fn with_marker(mut self, marker: Option<Pick>) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_highlight(mut self, highlight: Option<Highlight>) -> Self {
        self.highlight = highlight;
        self
    }

    /// Highest-priority mesh value at a point (the unmirrored half wins)
    pub fn value_at(&self, z: f64, rho: f64) -> Option<f64> {
        self.meshes.iter().find_map(|m| m.value_at(z, rho))
    }

    /// Little-endian framed form for streaming to a browser surface
    pub fn to_binary(&self) -> Vec<u8> {
        let mut data = Vec::new();

        // Header: type marker
        data.extend_from_slice(b"SCENE\0\0\0");

        put_window(&mut data, &self.window);
        put_str(&mut data, self.colormap.name());

        // Color range and clip flags
        data.extend_from_slice(&(self.range.min_val as f32).to_le_bytes());
        data.extend_from_slice(&(self.range.max_val as f32).to_le_bytes());
        data.push(self.range.clips_low as u8);
        data.push(self.range.clips_high as u8);

        // Meshes
        data.extend_from_slice(&(self.meshes.len() as u32).to_le_bytes());
        for mesh in &self.meshes {
            data.push(mesh.mirrored as u8);
            data.extend_from_slice(&(mesh.z.len() as u32).to_le_bytes());
            data.extend_from_slice(&(mesh.rho.len() as u32).to_le_bytes());
            for &v in mesh.z.iter().chain(&mesh.rho).chain(&mesh.values) {
                data.extend_from_slice(&(v as f32).to_le_bytes());
            }
        }

        // Coil overlay
        data.extend_from_slice(&(self.coils.len() as u32).to_le_bytes());
        for coil in &self.coils {
            data.extend_from_slice(&(coil.position as f32).to_le_bytes());
            data.extend_from_slice(&(coil.radius as f32).to_le_bytes());
            data.extend_from_slice(&(coil.line_width as f32).to_le_bytes());
            data.extend_from_slice(&coil.color);
        }

        // Legend
        data.extend_from_slice(&(self.legend.len() as u32).to_le_bytes());
        for tick in &self.legend {
            data.extend_from_slice(&(tick.value as f32).to_le_bytes());
            put_str(&mut data, &tick.label);
        }

        match &self.marker {
            Some(p) => {
                data.push(1);
                data.extend_from_slice(&(p.x as f32).to_le_bytes());
                data.extend_from_slice(&(p.y as f32).to_le_bytes());
            }
            None => data.push(0),
        }

        match &self.highlight {
            Some(h) => {
                data.push(1);
                put_window(&mut data, &h.window);
                put_str(&mut data, &h.label);
            }
            None => data.push(0),
        }

        data
    }
}

fn put_window(data: &mut Vec<u8>, w: &Window) {
    for v in [w.z_min, w.z_max, w.rho_min, w.rho_max] {
        data.extend_from_slice(&(v as f32).to_le_bytes());
    }
}

fn put_str(data: &mut Vec<u8>, s: &str) {
    data.extend_from_slice(&(s.len() as u32).to_le_bytes());
    data.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::tests::grid;

    fn range(min_val: f64, max_val: f64, clips_low: bool, clips_high: bool) -> ColorRange {
        ColorRange { min_val, max_val, clips_low, clips_high }
    }

    #[test]
    fn test_render_single_mesh() {
        let data = grid((0.0, 2.0, 3), (0.0, 1.0, 2), |z, r| z + r);
        let r = range(0.0, 3.0, false, false);
        let scene = render(&data.sample, &data.bounds, &r, &[], false, Colormap::Jet).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.window, data.bounds);
        assert_eq!(scene.meshes[0].values, vec![0.0, 1.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(scene.colormap, Colormap::Jet);
    }

    #[test]
    fn test_render_mirror() {
        let data = grid((0.0, 2.0, 3), (0.0, 1.0, 2), |z, r| z * 10.0 + r);
        let r = range(0.0, 21.0, false, false);
        let scene = render(&data.sample, &data.bounds, &r, &[], true, Colormap::Viridis).unwrap();
        assert_eq!(scene.meshes.len(), 2);

        let mirrored = &scene.meshes[1];
        assert!(mirrored.mirrored);
        assert_eq!(mirrored.rho, vec![-0.0, -1.0]);
        assert_eq!(mirrored.values, scene.meshes[0].values);
        // Reflection gives the same value on either side of the axis
        let up = scene.meshes[0].value_at(1.5, 0.25).unwrap();
        let down = mirrored.value_at(1.5, -0.25).unwrap();
        assert!((up - down).abs() < 1e-12);
        assert!((up - 15.25).abs() < 1e-12);
    }

    #[test]
    fn test_render_empty_window() {
        let data = grid((0.0, 2.0, 3), (0.0, 1.0, 2), |_, _| 1.0);
        let empty = data.sample.block(2, 1, 0, 1);
        let err = render(&empty, &data.bounds, &range(0.0, 1.0, false, false), &[], false, Colormap::Gray)
            .unwrap_err();
        assert!(matches!(err, ViewError::EmptyWindow { rows: 0, cols: 2 }));
    }

    #[test]
    fn test_coil_overlay() {
        let data = grid((0.0, 2.0, 3), (0.0, 1.0, 2), |_, _| 1.0);
        let coils = vec![Coil {
            position: 0.5,
            radius: 0.3,
            turns: 25,
            current: 1.0,
            color: "#ff0000".into(),
        }];
        let scene = render(&data.sample, &data.bounds, &range(0.0, 1.0, false, false), &coils, false, Colormap::Gray)
            .unwrap();
        let marker = &scene.coils[0];
        assert_eq!(marker.position, 0.5);
        assert_eq!(marker.radius, 0.3);
        assert!((marker.line_width - 2.5).abs() < 1e-12);
        assert_eq!(marker.color, [255, 0, 0]);
    }

    #[test]
    fn test_legend_ticks() {
        let ticks = legend_ticks(&range(0.0, 4.0, false, false));
        let values: Vec<f64> = ticks.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ticks[1].label, "1.00e+00");

        let ticks = legend_ticks(&range(1.0, 5.0, true, true));
        assert_eq!(ticks[0].label, "≤ 1.00e+00");
        assert_eq!(ticks[4].label, "≥ 5.00e+00");
        assert_eq!(ticks[2].label, "3.00e+00");

        let ticks = legend_ticks(&range(1.0, 5.0, false, true));
        assert_eq!(ticks[0].label, "1.00e+00");
    }

    #[test]
    fn test_value_at_outside() {
        let data = grid((0.0, 2.0, 3), (0.0, 1.0, 2), |z, _| z);
        let mesh = FieldMesh::from_sample(&data.sample, false);
        assert_eq!(mesh.value_at(2.0, 1.0), Some(2.0));
        assert_eq!(mesh.value_at(2.1, 0.5), None);
        assert_eq!(mesh.value_at(1.0, -0.1), None);
        assert_eq!(mesh.extent(), Window::new(0.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn test_binary_header() {
        let data = grid((0.0, 2.0, 3), (0.0, 1.0, 2), |_, _| 1.0);
        let scene = render(&data.sample, &data.bounds, &range(0.0, 1.0, false, false), &[], false, Colormap::Gray)
            .unwrap();
        let bin = scene.to_binary();
        assert_eq!(&bin[0..8], b"SCENE\0\0\0");
        // window (16) + colormap name length (4)
        assert_eq!(u32::from_le_bytes(bin[24..28].try_into().unwrap()), 4);
        assert_eq!(&bin[28..32], b"gray");
    }
}
