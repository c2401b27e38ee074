//! Tab wrangler server.
//!
//! Runs the eviction engine on a timer and exposes it over HTTP and
//! WebSocket. A browser extension connects to `/ws`, reports tab activity
//! and carries out the close/reopen/badge commands it receives.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p wrangler-web
//! cargo run -p wrangler-web -- --port 8080 --tick-secs 10
//! cargo run -p wrangler-web -- --settings ~/.wrangler/settings.json --log-level debug
//! ```
//!
//! ## Reporting tabs
//!
//! **WebSocket** (connect to `/ws`):
//! ```json
//! {"type": "tab_created", "tab": {"id": 7, "url": "https://example.com", "title": "Example"}}
//! {"type": "tab_activated", "id": 7}
//! ```
//!
//! **REST** (`POST /api/host/event`): same bodies.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tab_wrangler::prelude::*;
use tab_wrangler::runtime::{self, lock};
use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wrangler_web::{BroadcastHost, WebBroadcastHandler, WebConfig, WsMessage, spawn_web};

/// How often the archive is written to disk while running.
const AUTOSAVE_PERIOD: Duration = Duration::from_secs(30);

/// Close idle browser tabs and keep a searchable archive of them.
#[derive(Parser)]
#[command(about = "Close idle browser tabs and keep a searchable archive of them")]
struct Args {
    /// Port for the HTTP / WebSocket server.
    #[arg(long, default_value_t = 3001)]
    port: u16,

    /// Settings file (created with defaults if missing).
    #[arg(long, default_value = "wrangler-settings.json")]
    settings: PathBuf,

    /// Closed-tab archive file.
    #[arg(long, default_value = "wrangler-archive.json")]
    archive: PathBuf,

    /// Seconds between eviction passes.
    #[arg(long, default_value_t = 5)]
    tick_secs: u64,

    /// Minimum log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn save_archive(file: &ArchiveFile, shared: &SharedWrangler) {
    let archive = lock(shared).archive().clone();
    if let Err(e) = file.save(&archive) {
        warn!("Archive autosave failed: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    // 1. Logging: stderr plus an in-memory buffer served at /api/logs.
    let (capture, log_buffer) = CaptureLayer::new();
    tracing_subscriber::registry()
        .with(capture.with_filter(args.log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(args.log_level),
        )
        .init();

    // 2. Persistent settings and archive.
    let settings = FileSettingsStore::open(&args.settings).map_err(|e| e.to_string())?;
    let archive_file = ArchiveFile::new(&args.archive);
    let archive = archive_file
        .load(settings.snapshot().max_archive_size)
        .map_err(|e| e.to_string())?;
    info!(
        "Loaded {} closed tab(s) from {}",
        archive.len(),
        archive_file.path().display()
    );

    // 3. One broadcast channel carries host commands and UI events.
    let (ws_tx, _) = tokio::sync::broadcast::channel::<WsMessage>(256);

    // 4. The engine.
    let handler = CompositeEventHandler::new()
        .with(LoggingHandler)
        .with(WebBroadcastHandler::new(ws_tx.clone()));
    let wrangler = Wrangler::new(BroadcastHost::new(ws_tx.clone()), settings, SystemClock)
        .with_archive(archive)
        .with_event_handler(handler);
    let shared = runtime::shared(wrangler);
    lock(&shared).update_closed_count();

    // 5. Web server and tick loop.
    let web_config = WebConfig {
        bind_addr: ([127, 0, 0, 1], args.port).into(),
        log_buffer: Some(log_buffer),
    };
    let addr = spawn_web(shared.clone(), ws_tx, web_config)
        .await
        .map_err(|e| format!("could not bind port {}: {e}", args.port))?;
    println!("Tab wrangler listening on http://{addr}");

    let ticker = Ticker::spawn(shared.clone(), Duration::from_secs(args.tick_secs.max(1)));

    let autosave = {
        let shared = shared.clone();
        let file = archive_file.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(AUTOSAVE_PERIOD);
            interval.tick().await;
            loop {
                interval.tick().await;
                save_archive(&file, &shared);
            }
        })
    };

    // 6. Run until Ctrl-C, then persist.
    tokio::signal::ctrl_c().await.map_err(|e| e.to_string())?;
    info!("Shutting down");
    ticker.cancel();
    autosave.abort();

    lock(&shared).shutdown();
    save_archive(&archive_file, &shared);
    Ok(())
}
