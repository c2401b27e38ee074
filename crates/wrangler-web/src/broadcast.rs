//! Server-to-client WebSocket messages, and the two producers that feed
//! them: [`BroadcastHost`] (commands for the tab host) and
//! [`WebBroadcastHandler`] (engine events for UIs).
//!
//! Both write into one `tokio::sync::broadcast` channel; every connected
//! client sees every message and picks the ones it cares about by `type`.

use serde::Serialize;
use tab_wrangler::archive::ClosedTabEntry;
use tab_wrangler::events::{EventHandler, HostSignal, WrangleEvent};
use tab_wrangler::settings::SettingKey;
use tab_wrangler::{Millis, Result, TabHost, TabId, WrangleError};
use tokio::sync::broadcast;

/// A message sent from the server to WebSocket clients.
///
/// Discriminated on the `type` field when serialized to JSON.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Full state snapshot (sent on connect and after a client lags).
    Snapshot { data: serde_json::Value },

    // ── Host commands ──
    /// Close this tab.
    CloseTab { id: TabId },
    /// Reopen an archived tab in the background.
    OpenTab {
        url: Option<String>,
        title: Option<String>,
    },
    /// Badge text; empty clears the badge.
    Badge { text: String },

    // ── Engine events ──
    TabEvicted { entry: ClosedTabEntry },
    TabRestored { entry: ClosedTabEntry },
    EntryRemoved { id: TabId },
    ArchivePruned { count: usize },
    ArchiveCleared { count: usize },
    HostSignalFailed {
        id: TabId,
        signal: HostSignal,
        error: String,
    },
    Tick {
        at: Millis,
        evicted: usize,
        deferred_by_floor: usize,
        tracked: usize,
    },
    LockChanged { id: TabId, locked: bool },
    SettingChanged { key: SettingKey },
}

/// [`TabHost`] that forwards commands to connected WebSocket clients.
///
/// A command sent while no client is connected fails with
/// [`WrangleError::HostSignalFailure`]; the engine logs it and moves on.
#[derive(Clone)]
pub struct BroadcastHost {
    sender: broadcast::Sender<WsMessage>,
}

impl BroadcastHost {
    pub fn new(sender: broadcast::Sender<WsMessage>) -> Self {
        Self { sender }
    }
}

impl TabHost for BroadcastHost {
    fn close_tab(&mut self, id: TabId) -> Result<()> {
        self.sender
            .send(WsMessage::CloseTab { id })
            .map(|_| ())
            .map_err(|_| WrangleError::host(id, "no tab host connected"))
    }

    fn open_tab(&mut self, entry: &ClosedTabEntry) -> Result<()> {
        self.sender
            .send(WsMessage::OpenTab {
                url: entry.url.clone(),
                title: entry.title.clone(),
            })
            .map(|_| ())
            .map_err(|_| WrangleError::host(entry.id, "no tab host connected"))
    }

    fn set_badge(&mut self, count: Option<usize>) -> Result<()> {
        let text = match count {
            Some(n) if n > 0 => n.to_string(),
            _ => String::new(),
        };
        // A badge update with nobody listening is not worth reporting.
        let _ = self.sender.send(WsMessage::Badge { text });
        Ok(())
    }
}

/// Event handler that broadcasts engine events to WebSocket clients.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(WebBroadcastHandler::new(ws_tx.clone()));
/// ```
pub struct WebBroadcastHandler {
    sender: broadcast::Sender<WsMessage>,
}

impl WebBroadcastHandler {
    pub fn new(sender: broadcast::Sender<WsMessage>) -> Self {
        Self { sender }
    }

    /// Silently ignores send errors (no subscribers is fine).
    fn broadcast(&self, msg: WsMessage) {
        let _ = self.sender.send(msg);
    }
}

impl EventHandler for WebBroadcastHandler {
    fn on_event(&self, event: &WrangleEvent<'_>) {
        match event {
            WrangleEvent::TickCompleted { report } => {
                self.broadcast(WsMessage::Tick {
                    at: report.at,
                    evicted: report.evicted.len(),
                    deferred_by_floor: report.deferred_by_floor,
                    tracked: report.tracked,
                });
            }
            WrangleEvent::TabEvicted { entry } => {
                self.broadcast(WsMessage::TabEvicted {
                    entry: (*entry).clone(),
                });
            }
            WrangleEvent::TabRestored { entry } => {
                self.broadcast(WsMessage::TabRestored {
                    entry: (*entry).clone(),
                });
            }
            WrangleEvent::EntryRemoved { entry } => {
                self.broadcast(WsMessage::EntryRemoved { id: entry.id });
            }
            WrangleEvent::ArchivePruned { count } => {
                self.broadcast(WsMessage::ArchivePruned { count: *count });
            }
            WrangleEvent::ArchiveCleared { count } => {
                self.broadcast(WsMessage::ArchiveCleared { count: *count });
            }
            WrangleEvent::HostSignalFailed { id, signal, error } => {
                self.broadcast(WsMessage::HostSignalFailed {
                    id: *id,
                    signal: *signal,
                    error: error.to_string(),
                });
            }
            WrangleEvent::LockChanged { id, locked } => {
                self.broadcast(WsMessage::LockChanged {
                    id: *id,
                    locked: *locked,
                });
            }
            WrangleEvent::SettingChanged { key } => {
                self.broadcast(WsMessage::SettingChanged { key: *key });
            }
            // Open-tab churn is too chatty to broadcast; clients poll state.
            WrangleEvent::TabRegistered { .. } | WrangleEvent::TabUnregistered { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64) -> ClosedTabEntry {
        ClosedTabEntry {
            id: TabId(id),
            url: Some("https://a.test".into()),
            title: Some("A".into()),
            favicon_url: None,
            closed_at: 1_000,
        }
    }

    #[test]
    fn close_without_clients_is_host_failure() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let mut host = BroadcastHost::new(tx);
        assert!(matches!(
            host.close_tab(TabId(3)),
            Err(WrangleError::HostSignalFailure { id: TabId(3), .. })
        ));
        assert!(host.set_badge(Some(2)).is_ok());
    }

    #[test]
    fn commands_reach_subscribers() {
        let (tx, mut rx) = broadcast::channel(8);
        let mut host = BroadcastHost::new(tx);
        host.close_tab(TabId(3)).unwrap();
        host.open_tab(&entry(3)).unwrap();
        host.set_badge(Some(0)).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), WsMessage::CloseTab { id: TabId(3) }));
        assert!(matches!(rx.try_recv().unwrap(), WsMessage::OpenTab { url: Some(_), .. }));
        match rx.try_recv().unwrap() {
            WsMessage::Badge { text } => assert!(text.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn message_wire_format() {
        let json = serde_json::to_value(WsMessage::CloseTab { id: TabId(7) }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "close_tab", "id": 7}));

        let json = serde_json::to_value(WsMessage::SettingChanged {
            key: SettingKey::AllowList,
        })
        .unwrap();
        assert_eq!(json["key"], "allow_list");
    }

    #[test]
    fn failed_reopen_names_the_signal() {
        let (tx, mut rx) = broadcast::channel(8);
        let handler = WebBroadcastHandler::new(tx);
        let error = WrangleError::host(TabId(3), "could not open tab");
        handler.on_event(&WrangleEvent::HostSignalFailed {
            id: TabId(3),
            signal: HostSignal::Open,
            error: &error,
        });

        let json = serde_json::to_value(rx.try_recv().unwrap()).unwrap();
        assert_eq!(json["type"], "host_signal_failed");
        assert_eq!(json["signal"], "open");
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn handler_forwards_engine_events() {
        let (tx, mut rx) = broadcast::channel(8);
        let handler = WebBroadcastHandler::new(tx);
        let e = entry(4);
        handler.on_event(&WrangleEvent::TabEvicted { entry: &e });
        handler.on_event(&WrangleEvent::TabRegistered {
            tab: &tab_wrangler::TabInfo::new(4),
        });

        match rx.try_recv().unwrap() {
            WsMessage::TabEvicted { entry } => assert_eq!(entry.id, TabId(4)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
