//! Engine events and the handlers that observe them.
//!
//! The [`Wrangler`](crate::Wrangler) reports every state change it makes
//! through an [`EventHandler`]: evictions, restores, archive pruning, lock
//! and setting changes, and host signal failures. Handlers are used for
//! logging, pushing updates to a UI, or test assertions.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests, or an engine nobody watches |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`EventObserver`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::archive::ClosedTabEntry;
use crate::error::WrangleError;
use crate::eviction::TickReport;
use crate::settings::SettingKey;
use crate::tab::{TabId, TabInfo};

// ── Events ─────────────────────────────────────────────────────────

/// Which host command failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSignal {
    Close,
    Open,
}

impl HostSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Open => "open",
        }
    }
}

impl std::fmt::Display for HostSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the engine.
#[derive(Debug)]
pub enum WrangleEvent<'a> {
    /// A tab started being tracked.
    TabRegistered { tab: &'a TabInfo },
    /// A tab stopped being tracked because the host closed it.
    TabUnregistered { id: TabId },
    /// A tick finished.
    TickCompleted { report: &'a TickReport },
    /// A tab was closed and archived (by a tick or a manual wrangle).
    TabEvicted { entry: &'a ClosedTabEntry },
    /// The host rejected a command. A failed close leaves the tab archived;
    /// a failed open puts the entry back into the archive.
    HostSignalFailed {
        id: TabId,
        signal: HostSignal,
        error: &'a WrangleError,
    },
    /// An archived tab was reopened.
    TabRestored { entry: &'a ClosedTabEntry },
    /// An archived tab was permanently deleted.
    EntryRemoved { entry: &'a ClosedTabEntry },
    /// Entries dropped to keep the archive within capacity.
    ArchivePruned { count: usize },
    /// The archive was emptied.
    ArchiveCleared { count: usize },
    LockChanged { id: TabId, locked: bool },
    SettingChanged { key: SettingKey },
}

// ── Handler trait ─────────────────────────────────────────────────

/// Trait for observing engine events.
///
/// Handlers run while the engine is mid-operation, so they must be quick and
/// must not call back into the engine.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, _event: &WrangleEvent<'_>) {}
}

/// An event handler that does nothing.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// Adapter that turns a closure into an [`EventHandler`].
///
/// ```ignore
/// let evicted = Arc::new(AtomicUsize::new(0));
/// let counter = evicted.clone();
/// let handler = EventObserver::new(move |event| {
///     if let WrangleEvent::TabEvicted { .. } = event {
///         counter.fetch_add(1, Ordering::Relaxed);
///     }
/// });
/// ```
pub struct EventObserver<F>(F)
where
    F: Fn(&WrangleEvent<'_>) + Send + Sync;

impl<F> EventObserver<F>
where
    F: Fn(&WrangleEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for EventObserver<F>
where
    F: Fn(&WrangleEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &WrangleEvent<'_>) {
        (self.0)(event);
    }
}

/// Dispatches each event to several handlers in registration order.
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a handler to the chain.
    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &WrangleEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs every event through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &WrangleEvent<'_>) {
        match event {
            WrangleEvent::TabRegistered { tab } => {
                trace!("Registered tab {} ({})", tab.id, tab.url.as_deref().unwrap_or("-"));
            }
            WrangleEvent::TabUnregistered { id } => {
                trace!("Unregistered tab {id}");
            }
            WrangleEvent::TickCompleted { report } => {
                if report.evicted.is_empty() {
                    trace!("Tick at {}: nothing to evict ({} tracked)", report.at, report.tracked);
                } else {
                    debug!(
                        "Tick at {}: evicted {}, deferred {} by floor, {} tracked",
                        report.at,
                        report.evicted.len(),
                        report.deferred_by_floor,
                        report.tracked
                    );
                }
            }
            WrangleEvent::TabEvicted { entry } => {
                info!(
                    "Wrangled tab {}: {}",
                    entry.id,
                    entry.title.as_deref().or(entry.url.as_deref()).unwrap_or("(untitled)")
                );
            }
            // The engine already warns when a signal fails.
            WrangleEvent::HostSignalFailed { id, signal, error } => {
                debug!("Host {signal} signal for tab {id} failed: {error}");
            }
            WrangleEvent::TabRestored { entry } => {
                info!("Restored tab {}", entry.id);
            }
            WrangleEvent::EntryRemoved { entry } => {
                debug!("Removed closed tab {} from archive", entry.id);
            }
            WrangleEvent::ArchivePruned { count } => {
                info!("Pruned {count} oldest closed tab(s)");
            }
            WrangleEvent::ArchiveCleared { count } => {
                info!("Cleared {count} closed tab(s)");
            }
            WrangleEvent::LockChanged { id, locked } => {
                debug!("Tab {id} {}", if *locked { "locked" } else { "unlocked" });
            }
            WrangleEvent::SettingChanged { key } => {
                debug!("Setting {key} changed");
            }
        }
    }
}
