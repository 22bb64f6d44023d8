//! coilview server
//! - File watcher
//! - Display pipeline thread
//! - WebSocket command intake and binary scene streaming

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use coilview::{Colormap, Pane, PaneCommand, ViewConfig};
use futures::{SinkExt, StreamExt};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, thread, time::Duration};
use tokio::sync::{broadcast, mpsc, RwLock};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};

mod pipeline;

use pipeline::{Input, Level, PANE_BYTE, SCENE_HEADER};

#[derive(Parser, Debug)]
#[command(name = "coilview-server")]
#[command(about = "Stream coil field plots to browser clients over WebSocket")]
struct Args {
    /// Simulation JSON file to watch
    file: PathBuf,

    #[arg(long, default_value = "3001")]
    port: u16,

    /// Initial colormap
    #[arg(long, default_value = "viridis")]
    colormap: String,

    /// Draw the reflected lower half-plane on the overview
    #[arg(long)]
    mirror: bool,

    /// Directory that receives exports requested by clients
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Serve a browser front end from this directory
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

struct AppState {
    frame_tx: broadcast::Sender<Vec<u8>>,
    input_tx: mpsc::UnboundedSender<Input>,
    /// Latest scene frame per pane
    current_scenes: RwLock<[Option<Vec<u8>>; 2]>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let colormap: Colormap = args.colormap.parse()?;
    let config = ViewConfig { colormap, mirror: args.mirror, ..ViewConfig::default() };

    info!("Watching: {:?}", args.file);

    let (frame_tx, _) = broadcast::channel::<Vec<u8>>(16);
    let (input_tx, input_rx) = mpsc::unbounded_channel::<Input>();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    // Pipeline thread (one display state, never touched concurrently)
    let export_dir = args.export_dir.clone();
    thread::spawn(move || {
        pipeline::run(input_rx, result_tx, config, &export_dir);
    });

    let state = Arc::new(AppState {
        frame_tx: frame_tx.clone(),
        input_tx: input_tx.clone(),
        current_scenes: RwLock::new([None, None]),
    });

    // Handle pipeline frames
    let state_clone = state.clone();
    tokio::spawn(async move {
        while let Some(data) = result_rx.recv().await {
            if data.starts_with(SCENE_HEADER) {
                let pane = data[PANE_BYTE] as usize;
                if let Some(slot) = state_clone.current_scenes.write().await.get_mut(pane) {
                    *slot = Some(data.clone());
                }
            }
            let _ = state_clone.frame_tx.send(data);
        }
    });

    // Load initial file
    if args.file.exists() {
        let content = std::fs::read_to_string(&args.file)
            .with_context(|| format!("Failed to read {:?}", args.file))?;
        let _ = input_tx.send(Input::Load(content));
    } else {
        warn!("{:?} does not exist yet, waiting for it", args.file);
    }

    // File watcher
    let watch_path = args.file.clone();
    tokio::spawn(async move {
        if let Err(e) = watch_file(watch_path, input_tx).await {
            error!("File watcher stopped: {:#}", e);
        }
    });

    let mut app = Router::new().route("/ws", get(ws_handler));
    if let Some(dir) = &args.static_dir {
        info!("Serving static files from {:?}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(CorsLayer::permissive()).with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Server: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn watch_file(path: PathBuf, tx: mpsc::UnboundedSender<Input>) -> Result<()> {
    let (notify_tx, mut notify_rx) = mpsc::channel::<PathBuf>(10);

    let mut debouncer = new_debouncer(Duration::from_millis(200), move |res: DebounceEventResult| {
        if let Ok(events) = res {
            for event in events {
                let _ = notify_tx.blocking_send(event.path);
            }
        }
    })
    .context("Failed to create file watcher")?;

    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    debouncer
        .watcher()
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {:?}", watch_dir))?;

    info!("Watching directory: {:?}", watch_dir);

    while let Some(changed) = notify_rx.recv().await {
        if changed == path || changed.file_name() == path.file_name() {
            if let Ok(content) = tokio::fs::read_to_string(&path).await {
                info!("File changed, reloading simulation...");
                if tx.send(Input::Load(content)).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.frame_tx.subscribe();

    // Send current scenes if available
    let scenes = state.current_scenes.read().await.clone();
    for scene in scenes.into_iter().flatten() {
        if sender.send(Message::Binary(scene)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            Ok(frame) = rx.recv() => {
                if sender.send(Message::Binary(frame)).await.is_err() {
                    break;
                }
            }
            Some(msg) = receiver.next() => {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<PaneCommand>(&text) {
                        Ok(cmd) => {
                            let _ = state.input_tx.send(Input::Command(cmd));
                        }
                        Err(e) => {
                            warn!("Bad command {:?}: {}", text, e);
                            let frame = pipeline::status_frame(Level::Error, Pane::Overview, &format!("Bad command: {}", e));
                            if sender.send(Message::Binary(frame)).await.is_err() {
                                break;
                            }
                        }
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            else => break,
        }
    }
}
