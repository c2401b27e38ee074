//! HTTP and WebSocket bridge for the `tab-wrangler` engine.
//!
//! `wrangler-web` exposes a running [`Wrangler`](tab_wrangler::Wrangler) to
//! two kinds of client over one axum server:
//!
//! - the **tab host** (a browser extension) connects to `/ws`, sends
//!   [`HostEvent`](tab_wrangler::HostEvent)s and executes the `close_tab`,
//!   `open_tab` and `badge` commands it receives;
//! - **UIs** read `/api/state`, search `/api/closed`, edit settings and
//!   follow engine events on the same socket.
//!
//! # Quick start
//!
//! ```ignore
//! use tab_wrangler::prelude::*;
//! use tab_wrangler::runtime;
//! use wrangler_web::{BroadcastHost, WebBroadcastHandler, WebConfig, WsMessage, spawn_web};
//!
//! let (ws_tx, _) = tokio::sync::broadcast::channel::<WsMessage>(256);
//! let wrangler = Wrangler::new(
//!     BroadcastHost::new(ws_tx.clone()),
//!     MemorySettingsStore::default(),
//!     SystemClock,
//! )
//! .with_event_handler(WebBroadcastHandler::new(ws_tx.clone()));
//! let shared = runtime::shared(wrangler);
//!
//! let addr = spawn_web(shared.clone(), ws_tx, WebConfig::default()).await?;
//! let _ticker = Ticker::spawn(shared, runtime::DEFAULT_TICK_PERIOD);
//! println!("listening on http://{addr}");
//! ```
//!
//! # Architecture
//!
//! ```text
//!            HostEvent (ws / POST /api/host/event)
//! extension ─────────────────────────────────────▶ SharedWrangler ◀── Ticker
//!     ▲                                                │
//!     │      close_tab / open_tab / badge              │ WrangleEvent
//!     └───────────── broadcast channel ◀── BroadcastHost, WebBroadcastHandler
//! ```

mod api;
pub mod broadcast;
mod server;
pub mod snapshot;
mod ws;

pub use broadcast::{BroadcastHost, WebBroadcastHandler, WsMessage};
pub use snapshot::WranglerSnapshot;

use std::net::SocketAddr;

use tab_wrangler::logging::LogBuffer;
use tab_wrangler::runtime::SharedWrangler;

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Captured log lines served at `/api/logs`. Empty list when `None`.
    pub log_buffer: Option<LogBuffer>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            log_buffer: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
///
/// # Arguments
///
/// * `wrangler` — The shared engine.
/// * `broadcast_tx` — Sender half of the WebSocket broadcast channel. Pass
///   the same sender to [`BroadcastHost::new`] and
///   [`WebBroadcastHandler::new`]. Clients that fall behind by the channel's
///   capacity receive a fresh snapshot.
/// * `config` — Server configuration.
pub async fn spawn_web(
    wrangler: SharedWrangler,
    broadcast_tx: tokio::sync::broadcast::Sender<WsMessage>,
    config: WebConfig,
) -> std::io::Result<SocketAddr> {
    let router = server::build_router(wrangler, broadcast_tx, config.log_buffer);
    server::start_server(router, config.bind_addr).await
}
