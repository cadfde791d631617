//! N-back Daemon - hosts one dual n-back session
//!
//! This daemon runs in the background, managing:
//! - The session (settings, turn history, match checks)
//! - The session clock (turn ticks and flash timing)
//! - The persisted settings token
//! - IPC server for UI clients (newline-delimited JSON over TCP)
//!
//! Storage locations:
//! - Linux: ~/.local/share/nback/
//! - Windows: %APPDATA%\nback\
//! - MacOS: ~/Library/Application Support/nback/
//!
//! Listens on 127.0.0.1:9876 unless `NBACKD_ADDR` says otherwise.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

mod paths;
mod protocol;
mod state;

use paths::AppPaths;
use protocol::{Request, Response};
use state::DaemonState;

const DEFAULT_ADDR: &str = "127.0.0.1:9876";

async fn write_response(
    writer: &mut OwnedWriteHalf,
    resp: &Response,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    writer
        .write_all(serde_json::to_string(resp)?.as_bytes())
        .await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

async fn handle_client(
    stream: TcpStream,
    state: Arc<DaemonState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let resp = Response::error(format!("Invalid request: {}", e));
                write_response(&mut writer, &resp).await?;
                continue;
            }
        };

        if let Request::Subscribe = request {
            return stream_events(writer, &state).await;
        }

        let response = state.handle(request).await;
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

/// Forward frame and hide events until the client goes away.
async fn stream_events(
    mut writer: OwnedWriteHalf,
    state: &DaemonState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut rx = state.subscribe();
    write_response(&mut writer, &Response::success("Subscribed")).await?;

    loop {
        match rx.recv().await {
            Ok(event) => write_response(&mut writer, &Response::Event { event }).await?,
            Err(RecvError::Lagged(n)) => warn!("Subscriber lagged; {} events dropped", n),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Main
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Setup application paths
    let paths = AppPaths::new()?;
    info!("Persistence initialized ({:?})", paths.data_dir());

    let state = Arc::new(DaemonState::new(paths));

    match state.load_settings().await {
        Ok(true) => {}
        Ok(false) => info!("No saved settings; using defaults"),
        Err(e) => {
            warn!("Could not load settings: {}", e);
            info!("Starting with default settings");
        }
    }

    // Save on Ctrl-C so settings persist even if the daemon is stopped abruptly.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                state.stop().await;
                if let Err(e) = state.save_settings().await {
                    error!("Ctrl-C save failed: {}", e);
                } else {
                    info!("Ctrl-C: settings saved");
                }
                std::process::exit(0);
            }
        });
    }

    let addr = std::env::var("NBACKD_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!("N-back daemon listening on {}", addr);

    // Accept client connections
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Client connected: {}", peer);
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, state_clone).await {
                error!("Client handler error: {}", e);
            }
        });
    }
}
