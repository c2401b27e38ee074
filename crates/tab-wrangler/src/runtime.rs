//! Sharing the engine across tasks and driving it on a timer.
//!
//! The engine is synchronous. A tokio program wraps it in one
//! [`SharedWrangler`] mutex so every stimulus (tick, host notification, UI
//! call) runs to completion before the next starts. The lock is never held
//! across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::wrangler::Wrangler;

/// Default tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5);

/// The engine behind its single mutual-exclusion lock.
pub type SharedWrangler = Arc<Mutex<Wrangler>>;

/// Wrap an engine for sharing.
pub fn shared(wrangler: Wrangler) -> SharedWrangler {
    Arc::new(Mutex::new(wrangler))
}

/// Lock the engine, recovering from a poisoned mutex.
pub fn lock(shared: &SharedWrangler) -> MutexGuard<'_, Wrangler> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// A background task calling [`Wrangler::tick`] every `period`.
///
/// Cancelling (or dropping) the ticker stops all automatic eviction. A tick
/// already running finishes, since it holds no await point.
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn the tick loop on the current tokio runtime. The first tick
    /// fires one `period` after spawning.
    pub fn spawn(shared: SharedWrangler, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let report = lock(&shared).tick();
                if !report.evicted.is_empty() {
                    debug!("Ticker evicted {} tab(s)", report.evicted.len());
                }
            }
        });
        Self { handle }
    }

    /// Stop ticking.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
