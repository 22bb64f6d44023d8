//! Display pipeline thread
//!
//! One thread owns the [`Session`]; loads and commands are handled strictly
//! in arrival order and every result leaves as a binary frame.

use std::path::{Component, Path};

use coilview::{Pane, PaneCommand, Scene, Session, SimulationData, ViewCommand, ViewConfig};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub const SCENE_HEADER: &[u8; 5] = b"SCENE";
pub const STATUS_HEADER: &[u8; 8] = b"STATUS\0\0";
/// Byte of the 8-byte scene header that carries the pane
pub const PANE_BYTE: usize = 6;

/// Work for the pipeline thread
#[derive(Debug)]
pub enum Input {
    /// New simulation JSON
    Load(String),
    Command(PaneCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info = 0,
    Error = 1,
}

pub fn pane_index(pane: Pane) -> u8 {
    match pane {
        Pane::Overview => 0,
        Pane::Zoom => 1,
    }
}

/// Scene frame: `SCENE\0<pane>\0` followed by the scene body
pub fn scene_frame(pane: Pane, scene: &Scene) -> Vec<u8> {
    let mut data = scene.to_binary();
    data[PANE_BYTE] = pane_index(pane);
    data
}

/// Status frame: `STATUS\0\0`, level, pane, UTF-8 text
pub fn status_frame(level: Level, pane: Pane, text: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(10 + text.len());
    data.extend_from_slice(STATUS_HEADER);
    data.push(level as u8);
    data.push(pane_index(pane));
    data.extend_from_slice(text.as_bytes());
    data
}

pub fn run(
    mut rx: mpsc::UnboundedReceiver<Input>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    config: ViewConfig,
    export_dir: &Path,
) {
    let mut session: Option<Session> = None;

    while let Some(input) = rx.blocking_recv() {
        let frames = match input {
            Input::Load(content) => load(&mut session, &content, &config),
            Input::Command(cmd) => match session.as_mut() {
                Some(session) => command(session, cmd, export_dir),
                None => vec![status_frame(Level::Error, cmd.pane, "No simulation loaded")],
            },
        };

        for frame in frames {
            if tx.send(frame).is_err() {
                return;
            }
        }
    }
}

fn load(session: &mut Option<Session>, content: &str, config: &ViewConfig) -> Vec<Vec<u8>> {
    let data = match SimulationData::from_json(content) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to load simulation: {}", e);
            return vec![status_frame(Level::Error, Pane::Overview, &format!("Load failed: {}", e))];
        }
    };
    let (rows, cols) = (data.sample.rows(), data.sample.cols());

    let loaded = match session.as_mut() {
        Some(current) => current.replace_data(data),
        None => Session::new(data, config.clone()).map(|s| {
            *session = Some(s);
        }),
    };

    match (loaded, session.as_ref()) {
        (Ok(()), Some(s)) => {
            info!("Loaded {}x{} samples", rows, cols);
            vec![
                scene_frame(Pane::Overview, s.overview.scene()),
                scene_frame(Pane::Zoom, s.zoom.scene()),
                status_frame(Level::Info, Pane::Overview, &format!("Loaded {}x{} samples", rows, cols)),
            ]
        }
        (Err(e), _) => {
            error!("Failed to display simulation: {}", e);
            vec![status_frame(Level::Error, Pane::Overview, &e.to_string())]
        }
        (Ok(()), None) => Vec::new(),
    }
}

fn command(session: &mut Session, mut cmd: PaneCommand, export_dir: &Path) -> Vec<Vec<u8>> {
    let pane = cmd.pane;

    if let ViewCommand::Export { path } = &mut cmd.command {
        match confine(path, export_dir) {
            Some(confined) => *path = confined,
            None => {
                warn!("Rejected export path {:?}", path);
                return vec![status_frame(Level::Error, pane, "Export path must be a plain file name")];
            }
        }
    }

    match session.handle(&cmd) {
        Ok(None) => Vec::new(),
        Ok(Some(status)) => {
            let mut frames = vec![scene_frame(pane, session.viewer(pane).scene())];
            if pane == Pane::Zoom {
                frames.push(scene_frame(Pane::Overview, session.overview.scene()));
            }
            frames.push(status_frame(Level::Info, pane, &status));
            frames
        }
        Err(e) => vec![status_frame(Level::Error, pane, &e.to_string())],
    }
}

/// Exports from remote clients may only name a file inside `dir`
fn confine(path: &Path, dir: &Path) -> Option<std::path::PathBuf> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Some(dir.join(name)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const FIELD: &str = r#"{
        "z_min": 0.0, "z_max": 4.0, "rho_min": 0.0, "rho_max": 2.0,
        "z": [0.0, 1.0, 2.0, 3.0, 4.0],
        "rho": [0.0, 1.0, 2.0],
        "norm": [[1, 2, 3], [2, 3, 4], [3, 4, 5], [4, 5, 6], [5, 6, 7]]
    }"#;

    fn run_inputs(inputs: Vec<Input>) -> Vec<Vec<u8>> {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        for input in inputs {
            in_tx.send(input).unwrap();
        }
        drop(in_tx);

        let dir = std::env::temp_dir();
        thread::spawn(move || run(in_rx, out_tx, ViewConfig::default(), &dir))
            .join()
            .unwrap();

        let mut frames = Vec::new();
        while let Ok(frame) = out_rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn status_text(frame: &[u8]) -> (u8, String) {
        assert!(frame.starts_with(STATUS_HEADER));
        (frame[8], String::from_utf8(frame[10..].to_vec()).unwrap())
    }

    fn cmd(json: &str) -> Input {
        Input::Command(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_load_sends_both_panes() {
        let frames = run_inputs(vec![Input::Load(FIELD.into())]);
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with(SCENE_HEADER));
        assert_eq!(frames[0][PANE_BYTE], 0);
        assert_eq!(frames[1][PANE_BYTE], 1);
        assert_eq!(status_text(&frames[2]), (0, "Loaded 5x3 samples".into()));
    }

    #[test]
    fn test_zoom_pane_updates_overview() {
        let frames = run_inputs(vec![
            Input::Load(FIELD.into()),
            cmd(r#"{"pane": "zoom", "action": "zoom", "value": "200"}"#),
        ]);
        let tail = &frames[3..];
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0][PANE_BYTE], 1);
        assert_eq!(tail[1][PANE_BYTE], 0);
        assert_eq!(status_text(&tail[2]), (0, "Zoom = 200.0".into()));
    }

    #[test]
    fn test_errors_become_status_frames() {
        let frames = run_inputs(vec![
            cmd(r#"{"action": "reset"}"#),
            Input::Load("not json".into()),
            Input::Load(FIELD.into()),
            cmd(r#"{"action": "limits", "min": "5", "max": "1"}"#),
            cmd(r#"{"action": "export", "path": "../escape.png"}"#),
        ]);
        assert_eq!(status_text(&frames[0]), (1, "No simulation loaded".into()));
        assert_eq!(status_text(&frames[1]).0, 1);
        // Load frames, then one error per bad command
        assert_eq!(frames.len(), 7);
        assert_eq!(status_text(&frames[5]).0, 1);
        assert_eq!(status_text(&frames[6]), (1, "Export path must be a plain file name".into()));
    }

    #[test]
    fn test_click_outside_is_silent() {
        let frames = run_inputs(vec![
            Input::Load(FIELD.into()),
            cmd(r#"{"action": "click", "button": 3, "x": 1.0, "y": 1.0}"#),
        ]);
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn test_confine() {
        let dir = Path::new("/tmp/out");
        assert_eq!(confine(Path::new("plot.png"), dir), Some(dir.join("plot.png")));
        assert_eq!(confine(Path::new("/etc/plot.png"), dir), None);
        assert_eq!(confine(Path::new("a/plot.png"), dir), None);
        assert_eq!(confine(Path::new(".."), dir), None);
    }
}
