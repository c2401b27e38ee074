//! Boundary to the environment that actually hosts the tabs.
//!
//! The engine never talks to a browser directly. Outgoing commands go
//! through a [`TabHost`]; incoming notifications arrive as [`HostEvent`]s
//! and are dispatched by
//! [`Wrangler::handle_host_event`](crate::Wrangler::handle_host_event).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::archive::ClosedTabEntry;
use crate::error::{Result, WrangleError};
use crate::tab::{TabId, TabInfo};

/// Commands the engine sends to the tab host.
///
/// Errors are logged and reported as events. A failed close still leaves
/// the tab archived; a failed open puts the entry back in the archive.
pub trait TabHost: Send {
    /// Close an open tab.
    fn close_tab(&mut self, id: TabId) -> Result<()>;

    /// Reopen an archived tab in the background.
    fn open_tab(&mut self, entry: &ClosedTabEntry) -> Result<()>;

    /// Show `Some(count)` on the badge, or clear it with `None`.
    fn set_badge(&mut self, _count: Option<usize>) -> Result<()> {
        Ok(())
    }
}

/// Notifications from the tab host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    TabCreated { tab: TabInfo },
    TabActivated { id: TabId },
    /// URL, title or pin state changed.
    TabUpdated { tab: TabInfo },
    TabRemoved { id: TabId },
    /// Full enumeration of open tabs, sent on (re)connect.
    OpenTabs { tabs: Vec<TabInfo> },
}

// ── Recording host ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HostLog {
    closed: Vec<TabId>,
    opened: Vec<ClosedTabEntry>,
    badge: Option<usize>,
    gone: HashSet<TabId>,
    refuse_open: HashSet<TabId>,
}

/// A [`TabHost`] that records every command instead of acting on it.
///
/// Clones share one log, so a test can keep a handle while the engine owns
/// another. Tabs marked with [`mark_gone`](Self::mark_gone) fail to close;
/// entries marked with [`mark_open_fails`](Self::mark_open_fails) fail to
/// reopen.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    log: Arc<Mutex<HostLog>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future `close_tab` calls for `id` fail as if the tab were
    /// already gone.
    pub fn mark_gone(&self, id: TabId) {
        self.lock().gone.insert(id);
    }

    /// Make future `open_tab` calls for `id` fail.
    pub fn mark_open_fails(&self, id: TabId) {
        self.lock().refuse_open.insert(id);
    }

    pub fn closed(&self) -> Vec<TabId> {
        self.lock().closed.clone()
    }

    pub fn opened(&self) -> Vec<ClosedTabEntry> {
        self.lock().opened.clone()
    }

    /// Last badge value set.
    pub fn badge(&self) -> Option<usize> {
        self.lock().badge
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TabHost for RecordingHost {
    fn close_tab(&mut self, id: TabId) -> Result<()> {
        let mut log = self.lock();
        if log.gone.contains(&id) {
            return Err(WrangleError::host(id, "tab already gone"));
        }
        log.closed.push(id);
        Ok(())
    }

    fn open_tab(&mut self, entry: &ClosedTabEntry) -> Result<()> {
        let mut log = self.lock();
        if log.refuse_open.contains(&entry.id) {
            return Err(WrangleError::host(entry.id, "could not open tab"));
        }
        log.opened.push(entry.clone());
        Ok(())
    }

    fn set_badge(&mut self, count: Option<usize>) -> Result<()> {
        self.lock().badge = count;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_host_shares_log_between_clones() {
        let handle = RecordingHost::new();
        let mut host = handle.clone();
        host.close_tab(TabId(1)).unwrap();
        host.set_badge(Some(3)).unwrap();
        assert_eq!(handle.closed(), vec![TabId(1)]);
        assert_eq!(handle.badge(), Some(3));
    }

    #[test]
    fn gone_tab_fails_to_close() {
        let mut host = RecordingHost::new();
        host.mark_gone(TabId(5));
        let err = host.close_tab(TabId(5)).unwrap_err();
        assert!(matches!(err, WrangleError::HostSignalFailure { id: TabId(5), .. }));
        assert!(host.closed().is_empty());
    }

    #[test]
    fn marked_entry_fails_to_open() {
        let mut host = RecordingHost::new();
        host.mark_open_fails(TabId(4));
        let entry = ClosedTabEntry::from_tab(&TabInfo::new(4), 1_000);
        let err = host.open_tab(&entry).unwrap_err();
        assert!(matches!(err, WrangleError::HostSignalFailure { id: TabId(4), .. }));
        assert!(host.opened().is_empty());

        host.open_tab(&ClosedTabEntry::from_tab(&TabInfo::new(5), 1_000))
            .unwrap();
        assert_eq!(host.opened().len(), 1);
    }

    #[test]
    fn host_event_wire_format() {
        let event: HostEvent = serde_json::from_str(
            r#"{"type":"tab_created","tab":{"id":3,"url":"https://a.test","pinned":true}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            HostEvent::TabCreated {
                tab: TabInfo::new(3).with_url("https://a.test").pinned(true)
            }
        );

        let json = serde_json::to_value(HostEvent::TabActivated { id: TabId(8) }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "tab_activated", "id": 8}));
    }
}
