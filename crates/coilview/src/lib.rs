//! coilview: Windowing and color scaling for axisymmetric coil field plots
//!
//! This crate provides:
//! - Zoom window extraction over a sampled (z, rho) field
//! - Automatic and user-driven color ranges, with singularity handling
//! - Scene composition (field mesh, mirrored half-plane, coils, legend)
//! - Pointer picking and image export (png, jpg, pdf, svg)
//!
//! Field magnitudes are in tesla and lengths in meters; nothing here
//! converts units.

pub mod color_scale;
pub mod colormap;
pub mod display;
pub mod error;
pub mod export;
pub mod expr;
pub mod input;
pub mod pick;
pub mod plot;
pub mod render;
pub mod sample;
pub mod zoom;

pub use color_scale::{apply_range, auto_range, ColorRange};
pub use colormap::Colormap;
pub use display::{DisplayState, Pane, PaneCommand, Session, ViewCommand, Viewer};
pub use error::{Result, ViewError};
pub use export::{export_scene, ExportOptions};
pub use pick::{locate, Pick, PointerEvent};
pub use render::{render, Scene};
pub use sample::{Coil, FieldSample, SimulationData, Window};
pub use zoom::compute_window;

/// Main entry point: parse simulation JSON and build the initial viewer
pub fn open(json: &str, config: &ViewConfig) -> anyhow::Result<Viewer> {
    let data = SimulationData::from_json(json)?;
    let viewer = Viewer::new(data, config.clone())?;
    Ok(viewer)
}

/// Startup options for a viewer
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Colormap of the first render (default: viridis)
    pub colormap: Colormap,
    /// Draw the reflected lower half-plane
    pub mirror: bool,
    /// Image size used by `export`
    pub export: ExportOptions,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            colormap: Colormap::Viridis,
            mirror: false,
            export: ExportOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: &str = r#"{
        "z_min": 0.0, "z_max": 2.0, "rho_min": 0.0, "rho_max": 1.0,
        "z": [0.0, 1.0, 2.0],
        "rho": [0.0, 1.0],
        "norm": [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
        "coils": [{"position": 1.0, "radius": 0.5, "turns": 10}]
    }"#;

    #[test]
    fn test_default_config() {
        let config = ViewConfig::default();
        assert_eq!(config.colormap, Colormap::Viridis);
        assert!(!config.mirror);
        assert_eq!((config.export.width, config.export.height, config.export.dpi), (800, 800, 80));
    }

    #[test]
    fn test_open() {
        let viewer = open(FIELD, &ViewConfig::default()).unwrap();
        let state = viewer.state();
        assert_eq!(state.range.min_val, 1.0);
        assert_eq!(state.range.max_val, 6.0);
        assert_eq!(viewer.scene().coils.len(), 1);
        assert!(open("{", &ViewConfig::default()).is_err());
    }
}
