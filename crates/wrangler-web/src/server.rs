//! Axum server setup and router construction.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tab_wrangler::logging::LogBuffer;
use tab_wrangler::runtime::SharedWrangler;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::api::{self, AppState};
use crate::broadcast::WsMessage;
use crate::ws::{self, WsState};

/// Build the full axum router.
///
/// The router serves:
/// - WebSocket at `/ws`
/// - REST API at `/api/*`
pub fn build_router(
    wrangler: SharedWrangler,
    broadcast_tx: broadcast::Sender<WsMessage>,
    log_buffer: Option<LogBuffer>,
) -> Router {
    let app_state = AppState {
        wrangler: wrangler.clone(),
        log_buffer,
    };

    let ws_state = WsState {
        wrangler,
        broadcast_tx,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .with_state(ws_state);

    let api_routes = Router::new()
        .route("/api/state", get(api::get_state))
        .route("/api/logs", get(api::get_logs))
        .route("/api/tick", post(api::post_tick))
        .route("/api/tabs/{id}/remaining", get(api::get_remaining))
        .route("/api/tabs/{id}/exemption", get(api::get_exemption))
        .route(
            "/api/tabs/{id}/lock",
            post(api::post_lock).delete(api::delete_lock),
        )
        .route("/api/tabs/{id}/wrangle", post(api::post_wrangle))
        .route(
            "/api/closed",
            get(api::get_closed).delete(api::delete_all_closed),
        )
        .route("/api/closed/count", get(api::get_closed_count))
        .route("/api/closed/restore_all", post(api::post_restore_all))
        .route("/api/closed/{id}", delete(api::delete_closed))
        .route("/api/closed/{id}/restore", post(api::post_restore))
        .route("/api/settings", get(api::get_settings))
        .route("/api/settings/{key}", put(api::put_setting))
        .route(
            "/api/allow_list",
            post(api::post_allow_pattern).delete(api::delete_allow_pattern),
        )
        .route("/api/host/event", post(api::post_host_event))
        .with_state(app_state);

    Router::new().merge(ws_routes).merge(api_routes).layer(cors)
}

/// Bind the listener, spawn the server and return the bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "web server stopped");
        }
    });

    Ok(addr)
}
