//! WebSocket upgrade handler and message dispatch.
//!
//! Each connected client receives:
//! 1. A full [`WranglerSnapshot`] on connect.
//! 2. Every [`WsMessage`] broadcast afterwards: host commands
//!    (`close_tab`, `open_tab`, `badge`) and engine events.
//!
//! The tab host (a browser extension) speaks the same socket: it sends
//! [`HostEvent`] JSON as tabs open, change and close. UIs may also send a
//! few commands (`lock`, `unlock`, `restore`, `tick`).

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::Deserialize;
use tab_wrangler::runtime::{SharedWrangler, lock};
use tab_wrangler::{HostEvent, TabId};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::broadcast::WsMessage;
use crate::snapshot::WranglerSnapshot;

/// Shared state for WebSocket handlers.
#[derive(Clone)]
pub struct WsState {
    pub wrangler: SharedWrangler,
    pub broadcast_tx: broadcast::Sender<WsMessage>,
}

/// GET /ws — WebSocket upgrade handler.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(ws_state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ws_state))
}

fn snapshot_message(wrangler: &SharedWrangler) -> WsMessage {
    let snapshot = WranglerSnapshot::from_wrangler(&lock(wrangler));
    WsMessage::Snapshot {
        data: snapshot.to_json(),
    }
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, ws_state: WsState) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before the snapshot so nothing falls between the two.
    let mut broadcast_rx = ws_state.broadcast_tx.subscribe();

    if ws_send(&mut sink, &snapshot_message(&ws_state.wrangler))
        .await
        .is_err()
    {
        return;
    }

    debug!("WebSocket client connected");

    let wrangler_for_resync = ws_state.wrangler.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if ws_send(&mut sink, &msg).await.is_err() {
                        break; // Client disconnected.
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged by {n} messages, resending snapshot");
                    let msg = snapshot_message(&wrangler_for_resync);
                    if ws_send(&mut sink, &msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => handle_client_message(&text, &ws_state.wrangler),
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping, pong.
        }
    }

    debug!("WebSocket client disconnected");
    forward_task.abort();
}

/// Commands a UI may send over the socket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UiCommand {
    Lock { id: TabId },
    Unlock { id: TabId },
    Restore { id: TabId },
    Tick,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
enum ClientMessage {
    Host(HostEvent),
    Ui(UiCommand),
}

/// Process a JSON message received from a client.
fn handle_client_message(text: &str, wrangler: &SharedWrangler) {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        debug!("Ignoring malformed WebSocket message");
        return;
    };

    let mut wrangler = lock(wrangler);
    let outcome = match msg {
        ClientMessage::Host(event) => {
            wrangler.handle_host_event(event);
            Ok(())
        }
        ClientMessage::Ui(UiCommand::Lock { id }) => wrangler.lock(id).map(drop),
        ClientMessage::Ui(UiCommand::Unlock { id }) => wrangler.unlock(id).map(drop),
        ClientMessage::Ui(UiCommand::Restore { id }) => wrangler.restore(id).map(drop),
        ClientMessage::Ui(UiCommand::Tick) => {
            wrangler.tick();
            Ok(())
        }
    };
    if let Err(e) = outcome {
        debug!(error = %e, "WebSocket command rejected");
    }
}

/// Serialize a `WsMessage` and send it over the WebSocket sink.
async fn ws_send(sink: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).unwrap_or_default();
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_events_and_ui_commands_share_the_socket() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "tab_removed", "id": 3}"#).unwrap();
        assert_eq!(msg, ClientMessage::Host(HostEvent::TabRemoved { id: TabId(3) }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "lock", "id": 3}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ui(UiCommand::Lock { id: TabId(3) }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "tick"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ui(UiCommand::Tick));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "explode"}"#).is_err());
    }
}
