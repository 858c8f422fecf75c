//! SMIL Player (smil-player) - Main entry point
//!
//! Headless scheduler: loads a JSON timing document, plays it through the
//! tracing renderer, reloads it when the file changes, and accepts
//! `start <id>` / `stop <id>` trigger commands on stdin. With
//! `--print-events` the event stream is echoed to stdout as JSON lines.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smil_common::events::PlayerEvent;
use smil_player::config::{LoggingConfig, TomlConfig};
use smil_player::document::{DocumentProvider, FileDocumentProvider};
use smil_player::playback::{SystemClock, TracingRenderer};
use smil_player::Player;

const DEFAULT_FILTER: &str = "smil_player=debug,smil_common=info";

/// Command-line arguments for smil-player
#[derive(Parser, Debug)]
#[command(name = "smil-player")]
#[command(about = "Headless SMIL playback scheduler")]
#[command(version)]
struct Args {
    /// Timing document (JSON)
    #[arg(short, long, env = "SMIL_DOCUMENT")]
    document: Option<PathBuf>,

    /// Bootstrap config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long the tracing renderer pretends each video runs, in seconds
    #[arg(long)]
    video_seconds: Option<u64>,

    /// Write every player event to stdout as one JSON object per line
    #[arg(long)]
    print_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!(
        "Starting smil-player {} (rev {}, built {}, {} profile)",
        env!("CARGO_PKG_VERSION"),
        env!("SMIL_GIT_REVISION"),
        env!("SMIL_BUILT_AT"),
        env!("SMIL_BUILD_PROFILE")
    );

    let document_path = config.resolve_document_path(args.document.as_deref())?;
    info!("Document: {}", document_path.display());

    let video_seconds = args.video_seconds.unwrap_or(config.playback.simulated_video_seconds);
    let renderer = Arc::new(TracingRenderer::new(Duration::from_secs(video_seconds)));
    let player = Player::new(renderer, Arc::new(SystemClock), config.playback_settings());
    let provider: Arc<dyn DocumentProvider> = Arc::new(FileDocumentProvider::new(document_path));

    tokio::spawn(read_trigger_commands(player.clone()));
    if args.print_events {
        tokio::spawn(print_events(player.subscribe_events()));
    }

    tokio::select! {
        _ = player.run(provider) => {}
        _ = shutdown_signal() => {}
    }

    info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins, then the TOML level, then the built-in default
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match logging.level.as_deref() {
            Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level))?,
            None => EnvFilter::new(DEFAULT_FILTER),
        },
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Trigger source: `start <id>` / `stop <id>` lines on stdin
async fn read_trigger_commands(player: Player) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read trigger commands: {}", e);
                return;
            }
        };

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("start"), Some(id)) => {
                if let Err(e) = player.start_trigger(id) {
                    warn!("Cannot start trigger '{}': {}", id, e);
                }
            }
            (Some("stop"), Some(id)) => {
                player.stop_trigger(id);
            }
            (None, _) => {}
            _ => warn!("Unrecognised command '{}' (expected 'start <id>' or 'stop <id>')", line.trim()),
        }
    }
}

/// Event stream as JSON lines on stdout
async fn print_events(mut events: broadcast::Receiver<PlayerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to encode {} event: {}", event.event_type(), e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, {} event(s) dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
