//! Fishing socket console - connect to a game server and exchange raw payloads.
//!
//! Every stdin line is sent as one payload; every server payload is logged.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fishing_socket::{Handlers, SocketClient, SocketConfig};

const ENV_FILES: [&str; 2] = [".env.local", ".env"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_files();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fishing_socket=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SocketConfig::from_env().context("loading socket configuration")?;
    tracing::info!(
        url = %config.url,
        heartbeat = config.heartbeat_enabled(),
        reconnect_limit = config.reconnect_limit,
        "Starting fishing socket console"
    );

    let ended = Arc::new(Notify::new());
    let ended_for_handler = Arc::clone(&ended);
    let handlers = Handlers::new()
        .on_init(|| tracing::info!("connected"))
        .on_data(|msg| tracing::info!(%msg, "received"))
        .on_error(|detail| tracing::warn!(?detail, "socket error"))
        .on_close(|| tracing::info!("socket closed"))
        .on_reconnect(|| tracing::info!("reconnecting"))
        .on_reconnected(|| tracing::info!("reconnected"))
        .on_end(move || {
            tracing::warn!("socket ended");
            ended_for_handler.notify_one();
        });

    let socket = SocketClient::spawn(config, handlers);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if let Err(e) = socket.send(line).await {
                        tracing::warn!(error = %e, status = %socket.status(), "send failed");
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            _ = ended.notified() => return Ok(()),
        }
    }

    socket.disconnect().await;
    Ok(())
}

fn load_env_files() {
    if let Some(workspace) = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2) {
        load_env_files_from(workspace);
    }
}

/// Load `.env.local` then `.env` from `dir`. Variables already set are left
/// alone, so the first file to define a key wins.
fn load_env_files_from(dir: &Path) {
    for path in ENV_FILES.iter().map(|name| dir.join(name)) {
        match dotenvy::from_path(&path) {
            Ok(()) => {}
            Err(e) if e.not_found() => {}
            Err(e) => eprintln!("ignoring {}: {e}", path.display()),
        }
    }
}
