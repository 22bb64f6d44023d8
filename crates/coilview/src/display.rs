//! Display state and the viewer controller
//!
//! Every user action runs the whole pipeline (window -> range -> scene) and
//! builds a fresh [`DisplayState`]. The current state is swapped only when
//! the new one was built without error, so a failed action leaves the old
//! scene on screen.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color_scale::{self, ColorRange};
use crate::colormap::Colormap;
use crate::error::Result;
use crate::export;
use crate::pick::{self, PointerEvent, Pick};
use crate::render::{self, Highlight, Scene};
use crate::sample::{FieldSample, SimulationData, Window};
use crate::zoom::{self, FULL_EXTENT};
use crate::ViewConfig;

/// How the color range of a state is chosen
#[derive(Debug, Clone, PartialEq)]
pub enum RangeSource {
    /// Derived from the windowed data
    Auto,
    /// Typed bounds, kept as text so they can be re-evaluated
    User { min: String, max: String },
    /// Reuse an already computed range unchanged
    Fixed(ColorRange),
}

/// Everything currently on screen
#[derive(Debug, Clone)]
pub struct DisplayState {
    pub zoom: f64,
    pub window: Window,
    /// Copy of the samples inside `window`
    pub sample: FieldSample,
    pub range: ColorRange,
    pub mirror: bool,
    pub colormap: Colormap,
    pub marker: Option<Pick>,
    pub highlight: Option<Highlight>,
    pub scene: Scene,
}

impl DisplayState {
    /// Run the full pipeline for the given parameters
    pub fn build(
        data: &SimulationData,
        zoom: f64,
        range: RangeSource,
        mirror: bool,
        colormap: Colormap,
        highlight: Option<Highlight>,
    ) -> Result<Self> {
        let (window, sample) = zoom::compute_window(&data.sample, &data.bounds, zoom)?;

        let range = match range {
            RangeSource::Auto => color_scale::auto_range(&sample)?,
            RangeSource::User { min, max } => color_scale::apply_range(&sample, &min, &max)?,
            RangeSource::Fixed(range) => range,
        };

        let scene = render::render(&sample, &window, &range, &data.coils, mirror, colormap)?
            .with_highlight(highlight.clone());

        Ok(Self {
            zoom,
            window,
            sample,
            range,
            mirror,
            colormap,
            marker: None,
            highlight,
            scene,
        })
    }

    /// Text shown in the min / max bound fields
    pub fn bound_labels(&self) -> (String, String) {
        (self.range.min_label(), self.range.max_label())
    }
}

/// User actions on one plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewCommand {
    /// Restore the full extent and automatic range
    Reset,
    Zoom { value: String },
    Limits { min: String, max: String },
    Colormap { name: String },
    Mirror { enabled: bool },
    Click(PointerEvent),
    Export { path: PathBuf },
}

/// Windowing / scaling controller for one plot
pub struct Viewer {
    data: SimulationData,
    config: ViewConfig,
    state: DisplayState,
}

impl Viewer {
    /// Initial display: full extent, automatic range
    pub fn new(data: SimulationData, config: ViewConfig) -> Result<Self> {
        let state = DisplayState::build(&data, FULL_EXTENT, RangeSource::Auto, config.mirror, config.colormap, None)?;
        info!(
            rows = state.sample.rows(),
            cols = state.sample.cols(),
            "initial display, range [{}, {}]",
            state.range.min_label(),
            state.range.max_label()
        );
        Ok(Self { data, config, state })
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.state.scene
    }

    pub fn data(&self) -> &SimulationData {
        &self.data
    }

    pub fn reset(&mut self) -> Result<String> {
        self.rebuild(FULL_EXTENT, RangeSource::Auto, self.state.mirror, self.state.colormap)?;
        Ok(format!("Zoom = {:?}", FULL_EXTENT))
    }

    /// Zoom to a typed percentage; the color range is recomputed for the new window
    pub fn zoom(&mut self, text: &str) -> Result<String> {
        let zoom = zoom::parse_zoom(text)?;
        self.rebuild(zoom, RangeSource::Auto, self.state.mirror, self.state.colormap)?;
        Ok(format!("Zoom = {:?}", zoom))
    }

    pub fn apply_limits(&mut self, min: &str, max: &str) -> Result<String> {
        let range = RangeSource::User { min: min.to_string(), max: max.to_string() };
        self.rebuild(self.state.zoom, range, self.state.mirror, self.state.colormap)?;
        let (lo, hi) = self.state.bound_labels();
        Ok(format!("Limits = [{}, {}]", lo, hi))
    }

    pub fn set_colormap(&mut self, name: &str) -> Result<String> {
        let colormap: Colormap = name.parse()?;
        self.rebuild(self.state.zoom, RangeSource::Fixed(self.state.range), self.state.mirror, colormap)?;
        Ok(format!("Colormap = {}", colormap))
    }

    pub fn set_mirror(&mut self, mirror: bool) -> Result<String> {
        self.rebuild(self.state.zoom, RangeSource::Fixed(self.state.range), mirror, self.state.colormap)?;
        Ok(format!("Mirror = {}", if mirror { "on" } else { "off" }))
    }

    /// Outline another plot's zoom window on this one
    pub fn outline(&mut self, window: Window, zoom: f64) {
        let label = if zoom > FULL_EXTENT { format!("Zoom = {:?}", zoom) } else { String::new() };
        let highlight = Some(Highlight { window, label });

        let mut state = self.state.clone();
        state.scene = state.scene.with_highlight(highlight.clone());
        state.highlight = highlight;
        self.state = state;
    }

    /// Place the pick marker; ignored events leave everything untouched
    pub fn click(&mut self, event: &PointerEvent) -> Option<String> {
        let pick = pick::locate(event, &self.state.window)?;

        let mut state = self.state.clone();
        state.marker = Some(pick);
        state.scene = state.scene.with_marker(Some(pick));
        self.state = state;
        Some(pick.status_text())
    }

    pub fn export(&self, path: &Path) -> Result<String> {
        export::export_scene(&self.state.scene, path, &self.config.export)?;
        Ok(format!("Saved {}", path.display()))
    }

    /// Dispatch a command; `Ok(None)` means the command was a no-op
    pub fn handle(&mut self, command: &ViewCommand) -> Result<Option<String>> {
        let status = match command {
            ViewCommand::Reset => Some(self.reset()?),
            ViewCommand::Zoom { value } => Some(self.zoom(value)?),
            ViewCommand::Limits { min, max } => Some(self.apply_limits(min, max)?),
            ViewCommand::Colormap { name } => Some(self.set_colormap(name)?),
            ViewCommand::Mirror { enabled } => Some(self.set_mirror(*enabled)?),
            ViewCommand::Click(event) => self.click(event),
            ViewCommand::Export { path } => Some(self.export(path)?),
        };
        Ok(status)
    }

    fn current_config(&self) -> ViewConfig {
        ViewConfig {
            mirror: self.state.mirror,
            colormap: self.state.colormap,
            ..self.config.clone()
        }
    }

    fn rebuild(&mut self, zoom: f64, range: RangeSource, mirror: bool, colormap: Colormap) -> Result<()> {
        let highlight = self.state.highlight.clone();
        match DisplayState::build(&self.data, zoom, range, mirror, colormap, highlight) {
            Ok(state) => {
                debug!(zoom, mirror, %colormap, "display state replaced");
                self.state = state;
                Ok(())
            }
            Err(e) => {
                warn!("keeping previous display: {}", e);
                Err(e)
            }
        }
    }
}

/// Which plot of a [`Session`] a command targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    #[default]
    Overview,
    Zoom,
}

/// Command addressed to one pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneCommand {
    #[serde(default)]
    pub pane: Pane,
    #[serde(flatten)]
    pub command: ViewCommand,
}

/// Overview plot plus a zoom plot whose window is outlined on the overview
pub struct Session {
    pub overview: Viewer,
    pub zoom: Viewer,
}

impl Session {
    pub fn new(data: SimulationData, config: ViewConfig) -> Result<Self> {
        let zoom_config = ViewConfig { mirror: false, ..config.clone() };
        Ok(Self {
            zoom: Viewer::new(data.clone(), zoom_config)?,
            overview: Viewer::new(data, config)?,
        })
    }

    pub fn viewer(&self, pane: Pane) -> &Viewer {
        match pane {
            Pane::Overview => &self.overview,
            Pane::Zoom => &self.zoom,
        }
    }

    /// Start both panes over on new data, keeping their mirror and colormap choices
    pub fn replace_data(&mut self, data: SimulationData) -> Result<()> {
        // Build both before committing either
        let overview = Viewer::new(data.clone(), self.overview.current_config())?;
        let zoom = Viewer::new(data, self.zoom.current_config())?;
        self.overview = overview;
        self.zoom = zoom;
        Ok(())
    }

    pub fn handle(&mut self, cmd: &PaneCommand) -> Result<Option<String>> {
        match cmd.pane {
            Pane::Overview => self.overview.handle(&cmd.command),
            Pane::Zoom => {
                let status = self.zoom.handle(&cmd.command)?;
                if matches!(cmd.command, ViewCommand::Zoom { .. }) {
                    let state = self.zoom.state();
                    self.overview.outline(state.window, state.zoom);
                }
                Ok(status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewError;
    use crate::sample::tests::grid;
    use crate::sample::Coil;

    fn data() -> SimulationData {
        // Singular spike at the origin, smooth elsewhere
        let mut d = grid((0.0, 10.0, 11), (0.0, 4.0, 5), |z, r| if z == 0.0 && r == 0.0 { 1000.0 } else { 1.0 + z + r });
        d.coils = vec![Coil { position: 5.0, radius: 2.0, turns: 30, current: 2.0, color: "red".into() }];
        d
    }

    fn viewer() -> Viewer {
        Viewer::new(data(), ViewConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let v = viewer();
        let s = v.state();
        assert_eq!(s.zoom, 100.0);
        assert_eq!(s.window, Window::new(0.0, 10.0, 0.0, 4.0));
        assert_eq!(s.sample, v.data().sample);
        // The spike replaces the smallest value, so vmin = 2
        assert_eq!(s.range.min_val, 2.0);
        assert_eq!(s.range.max_val, 10.0);
        assert!(s.range.clips_high);
        assert_eq!(s.scene.coils.len(), 1);
        assert_eq!(s.marker, None);
    }

    #[test]
    fn test_zoom_recomputes_range() {
        let mut v = viewer();
        let status = v.zoom("200").unwrap();
        assert_eq!(status, "Zoom = 200.0");
        let s = v.state();
        assert_eq!(s.window, Window::new(2.5, 7.5, 1.0, 3.0));
        assert_eq!(s.sample.z_axis(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        // No spike inside: plain min / max
        assert_eq!(s.range.min_val, 5.0);
        assert_eq!(s.range.max_val, 11.0);
        assert!(!s.range.clips_high);
    }

    #[test]
    fn test_failed_limits_keep_state() {
        let mut v = viewer();
        v.apply_limits("2", "4").unwrap();
        let before = v.state().clone();

        let err = v.apply_limits("5", "3").unwrap_err();
        assert!(matches!(err, ViewError::InvalidRangeOrder { .. }));
        assert_eq!(v.state().range, before.range);
        assert_eq!(v.state().scene, before.scene);

        let err = v.apply_limits("import os", "3").unwrap_err();
        assert!(matches!(err, ViewError::InvalidNumericExpression { .. }));
        assert_eq!(v.state().range, before.range);
    }

    #[test]
    fn test_failed_zoom_keeps_state() {
        // Center (4.5, 1.5) falls between samples
        let data = grid((0.0, 9.0, 10), (0.0, 3.0, 4), |z, r| 1.0 + z + r);
        let mut v = Viewer::new(data, ViewConfig::default()).unwrap();
        v.zoom("150").unwrap();
        let before = v.state().window;
        assert!(matches!(v.zoom("-1"), Err(ViewError::InvalidZoom(_))));
        assert!(v.zoom("abc").is_err());
        // Window narrower than one cell
        assert!(matches!(v.zoom("10000"), Err(ViewError::EmptyWindow { .. })));
        assert_eq!(v.state().window, before);
    }

    #[test]
    fn test_limits_flags_in_legend() {
        let mut v = viewer();
        let status = v.apply_limits("3", "1e-3*8e3").unwrap();
        assert_eq!(status, "Limits = [3.00e+00, 8.00e+00]");
        let legend = &v.scene().legend;
        assert!(legend[0].label.starts_with('≤'));
        assert!(legend[4].label.starts_with('≥'));
    }

    #[test]
    fn test_colormap_and_mirror_keep_range() {
        let mut v = viewer();
        v.apply_limits("3", "8").unwrap();
        let range = v.state().range;

        v.set_colormap("plasma").unwrap();
        assert_eq!(v.state().colormap, Colormap::Plasma);
        assert_eq!(v.state().range, range);

        v.set_mirror(true).unwrap();
        assert_eq!(v.scene().meshes.len(), 2);
        assert_eq!(v.state().range, range);

        assert!(v.set_colormap("nope").is_err());
        assert_eq!(v.state().colormap, Colormap::Plasma);
    }

    #[test]
    fn test_click_marker() {
        let mut v = viewer();
        let outside = PointerEvent { button: 1, x: None, y: None };
        assert_eq!(v.click(&outside), None);
        assert_eq!(v.state().marker, None);

        let inside = PointerEvent { button: 1, x: Some(1.23456), y: Some(2.0) };
        assert_eq!(v.click(&inside).unwrap(), "Coordinates: x = 1.235; y = 2.0");
        let second = PointerEvent { button: 1, x: Some(3.0), y: Some(1.0) };
        v.click(&second);
        assert_eq!(v.scene().marker, Some(Pick { x: 3.0, y: 1.0 }));

        // Re-rendering clears the marker
        v.zoom("120").unwrap();
        assert_eq!(v.scene().marker, None);
    }

    #[test]
    fn test_command_json() {
        let cmd: PaneCommand = serde_json::from_str(r#"{"pane": "zoom", "action": "zoom", "value": "250"}"#).unwrap();
        assert_eq!(cmd.pane, Pane::Zoom);
        assert_eq!(cmd.command, ViewCommand::Zoom { value: "250".into() });

        let cmd: PaneCommand = serde_json::from_str(r#"{"action": "click", "button": 1, "x": 0.5, "y": null}"#).unwrap();
        assert_eq!(cmd.pane, Pane::Overview);
        assert_eq!(cmd.command, ViewCommand::Click(PointerEvent { button: 1, x: Some(0.5), y: None }));

        let cmd: PaneCommand = serde_json::from_str(r#"{"action": "reset"}"#).unwrap();
        assert_eq!(cmd.command, ViewCommand::Reset);
    }

    #[test]
    fn test_session_outlines_zoom() {
        let mut session = Session::new(data(), ViewConfig::default()).unwrap();
        let cmd = PaneCommand { pane: Pane::Zoom, command: ViewCommand::Zoom { value: "200".into() } };
        session.handle(&cmd).unwrap();

        let highlight = session.overview.scene().highlight.clone().unwrap();
        assert_eq!(highlight.window, Window::new(2.5, 7.5, 1.0, 3.0));
        assert_eq!(highlight.label, "Zoom = 200.0");
        assert_eq!(session.overview.state().window, Window::new(0.0, 10.0, 0.0, 4.0));

        let cmd = PaneCommand { pane: Pane::Zoom, command: ViewCommand::Zoom { value: "80".into() } };
        session.handle(&cmd).unwrap();
        assert_eq!(session.overview.scene().highlight.as_ref().unwrap().label, "");

        // Outline survives re-rendering of the overview
        session.overview.set_colormap("hot").unwrap();
        assert!(session.overview.scene().highlight.is_some());
    }
}
