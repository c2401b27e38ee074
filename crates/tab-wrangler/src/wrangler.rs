//! The [`Wrangler`]: owns the tracker and archive, reacts to the tab host,
//! runs eviction ticks and serves every UI-facing operation.
//!
//! All state lives behind `&mut self`. In a multi-threaded program the whole
//! engine is shared as one [`SharedWrangler`](crate::runtime::SharedWrangler)
//! so ticks, host notifications and UI calls never interleave.
//!
//! # Example
//!
//! ```ignore
//! let clock = ManualClock::new(0);
//! let host = RecordingHost::new();
//! let settings = MemorySettingsStore::new(
//!     Settings::default().with_inactivity_threshold(Duration::from_secs(60)),
//! );
//! let mut wrangler = Wrangler::new(host.clone(), settings, clock.clone())
//!     .with_event_handler(LoggingHandler);
//!
//! wrangler.on_tab_created(TabInfo::new(1).with_url("https://example.com"));
//! clock.advance(Duration::from_secs(61));
//! let report = wrangler.tick();
//! assert_eq!(report.evicted_ids(), vec![TabId(1)]);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveQuery, ClosedTabArchive, ClosedTabEntry, ClosedTabGroup, TimeBucket};
use crate::clock::{Clock, Millis};
use crate::error::{Result, WrangleError};
use crate::events::{EventHandler, HostSignal, NoopHandler, WrangleEvent};
use crate::eviction::{TickReport, plan_evictions};
use crate::exemption::{ExemptionReason, exemption_for};
use crate::host::{HostEvent, TabHost};
use crate::settings::{SettingKey, Settings, SettingsStore, validate_pattern};
use crate::tab::{TabId, TabInfo, TabRecord};
use crate::tracker::ActivityTracker;

/// The tab lifecycle engine.
pub struct Wrangler {
    tracker: ActivityTracker,
    archive: ClosedTabArchive,
    host: Box<dyn TabHost>,
    settings: Box<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    handler: Box<dyn EventHandler>,
}

impl Wrangler {
    /// Create an engine with an empty archive sized from the settings.
    pub fn new(
        host: impl TabHost + 'static,
        settings: impl SettingsStore + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        let archive = ClosedTabArchive::new(settings.snapshot().max_archive_size);
        Self {
            tracker: ActivityTracker::new(),
            archive,
            host: Box::new(host),
            settings: Box::new(settings),
            clock: Arc::new(clock),
            handler: Box::new(NoopHandler),
        }
    }

    /// Start from a previously persisted archive.
    pub fn with_archive(mut self, mut archive: ClosedTabArchive) -> Self {
        let max = self.settings.snapshot().max_archive_size;
        if archive.max_size() != max {
            archive.set_max_size(max);
        }
        self.archive = archive;
        self
    }

    pub fn with_event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────

    pub fn now(&self) -> Millis {
        self.clock.now()
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Settings {
        self.settings.snapshot()
    }

    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    pub fn archive(&self) -> &ClosedTabArchive {
        &self.archive
    }

    // ── Host notifications ────────────────────────────────────────────

    /// A tab was opened. Returns `false` if it was already tracked.
    pub fn on_tab_created(&mut self, tab: TabInfo) -> bool {
        let now = self.now();
        let added = self.tracker.register(tab.clone(), now);
        if added {
            self.emit(WrangleEvent::TabRegistered { tab: &tab });
        }
        added
    }

    /// A tab gained focus. Ignored for untracked tabs.
    pub fn on_tab_activated(&mut self, id: TabId) -> bool {
        let now = self.now();
        self.tracker.record_activity(id, now)
    }

    /// A tab's URL, title or pin state changed. An unknown tab is
    /// registered, since the host may report tabs opened before the engine
    /// started.
    pub fn on_tab_updated(&mut self, tab: TabInfo) {
        if !self.tracker.update(tab.clone()) {
            self.on_tab_created(tab);
        }
    }

    /// A tab was closed by the host. Its lock, if any, is dropped.
    pub fn on_tab_removed(&mut self, id: TabId) -> Option<TabRecord> {
        let record = self.tracker.unregister(id);
        if record.is_some() {
            self.emit(WrangleEvent::TabUnregistered { id });
        }
        if self.settings.snapshot().is_locked(id)
            && let Err(e) = self.write_locks(|locks| {
                locks.remove(&id);
            })
        {
            warn!("Could not drop lock for closed tab {id}: {e}");
        }
        record
    }

    /// Reconcile with the host's full list of open tabs: register new ones,
    /// refresh metadata for known ones, forget tabs no longer open and
    /// prune locks that point at them.
    pub fn sync_open_tabs(&mut self, tabs: Vec<TabInfo>) {
        let open: HashSet<TabId> = tabs.iter().map(|t| t.id).collect();
        for tab in tabs {
            self.on_tab_updated(tab);
        }
        for id in self.tracker.retain_open(&open) {
            self.emit(WrangleEvent::TabUnregistered { id });
        }

        let stale = self
            .settings
            .snapshot()
            .locked_ids
            .iter()
            .filter(|id| !open.contains(id))
            .count();
        if stale > 0 {
            match self.write_locks(|locks| locks.retain(|id| open.contains(id))) {
                Ok(()) => debug!("Pruned {stale} stale lock(s)"),
                Err(e) => warn!("Could not prune stale locks: {e}"),
            }
        }
        debug!("Synced {} open tabs", self.tracker.len());
    }

    /// Dispatch one host notification.
    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::TabCreated { tab } => {
                self.on_tab_created(tab);
            }
            HostEvent::TabActivated { id } => {
                self.on_tab_activated(id);
            }
            HostEvent::TabUpdated { tab } => self.on_tab_updated(tab),
            HostEvent::TabRemoved { id } => {
                self.on_tab_removed(id);
            }
            HostEvent::OpenTabs { tabs } => self.sync_open_tabs(tabs),
        }
    }

    // ── Eviction ──────────────────────────────────────────────────────

    /// Run one eviction pass against a fresh settings snapshot.
    ///
    /// Every planned tab is unregistered, archived with `closed_at = now`
    /// and then closed on the host. A failed close is logged and reported
    /// but the eviction stands.
    pub fn tick(&mut self) -> TickReport {
        let now = self.now();
        let settings = self.settings.snapshot();
        self.sync_capacity(&settings);

        let plan = plan_evictions(&self.tracker, &settings, now);
        let mut report = TickReport {
            at: now,
            deferred_by_floor: plan.deferred_by_floor,
            ..TickReport::default()
        };

        for id in plan.evict {
            let Some(record) = self.tracker.unregister(id) else {
                continue;
            };
            let (entry, closed) = self.close_and_archive(&record.tab, now);
            if !closed {
                report.host_failures.push(id);
            }
            report.evicted.push(entry);
        }
        report.tracked = self.tracker.len();

        if !report.evicted.is_empty() {
            self.update_closed_count();
        }
        self.emit(WrangleEvent::TickCompleted { report: &report });
        report
    }

    /// Close and archive a tracked tab right away, ignoring exemptions.
    pub fn wrangle_now(&mut self, id: TabId) -> Result<ClosedTabEntry> {
        let record = self
            .tracker
            .unregister(id)
            .ok_or(WrangleError::UnknownTab(id))?;
        let now = self.now();
        let (entry, _) = self.close_and_archive(&record.tab, now);
        self.update_closed_count();
        Ok(entry)
    }

    // ── Tab queries ───────────────────────────────────────────────────

    /// Signed time left before `id` becomes eligible for eviction.
    pub fn time_remaining(&self, id: TabId) -> Result<Millis> {
        let threshold = self.settings.snapshot().inactivity_threshold_ms;
        self.tracker.time_remaining(id, self.now(), threshold)
    }

    /// Why `id` is exempt, or `None` if it may be evicted.
    pub fn exemption(&self, id: TabId) -> Result<Option<ExemptionReason>> {
        let record = self.tracker.get(id).ok_or(WrangleError::UnknownTab(id))?;
        Ok(exemption_for(&record.tab, &self.settings.snapshot()))
    }

    // ── Locks, allow-list, pause ──────────────────────────────────────

    /// Lock a tab against eviction. Returns `false` if it was already locked.
    pub fn lock(&mut self, id: TabId) -> Result<bool> {
        self.set_lock(id, true)
    }

    /// Remove a tab's lock. Returns `false` if it wasn't locked.
    pub fn unlock(&mut self, id: TabId) -> Result<bool> {
        self.set_lock(id, false)
    }

    /// Append a pattern to the allow-list. Duplicates are ignored and
    /// reported as `Ok(false)`.
    pub fn add_allow_pattern(&mut self, pattern: &str) -> Result<bool> {
        validate_pattern(pattern)?;
        let mut list = self.settings.snapshot().allow_list;
        if list.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        list.push(pattern.to_string());
        self.update_setting(SettingKey::AllowList, json!(list))?;
        Ok(true)
    }

    /// Remove a pattern from the allow-list. Returns `false` if absent.
    pub fn remove_allow_pattern(&mut self, pattern: &str) -> Result<bool> {
        let mut list = self.settings.snapshot().allow_list;
        let before = list.len();
        list.retain(|p| p != pattern);
        if list.len() == before {
            return Ok(false);
        }
        self.update_setting(SettingKey::AllowList, json!(list))?;
        Ok(true)
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        self.update_setting(SettingKey::Paused, json!(paused))
    }

    /// Validate and store one setting, then apply its side effects.
    pub fn update_setting(&mut self, key: SettingKey, value: serde_json::Value) -> Result<()> {
        self.settings.set(key, value)?;
        self.emit(WrangleEvent::SettingChanged { key });
        match key {
            SettingKey::MaxArchiveSize => {
                let settings = self.settings.snapshot();
                if self.sync_capacity(&settings) > 0 {
                    self.update_closed_count();
                }
            }
            SettingKey::ShowBadgeCount => {
                self.update_closed_count();
            }
            _ => {}
        }
        Ok(())
    }

    // ── Archive ───────────────────────────────────────────────────────

    /// Archived tabs matching `query`, newest first.
    pub fn search(&self, query: &ArchiveQuery) -> Vec<ClosedTabEntry> {
        self.archive.search(query, self.now())
    }

    /// Archived tabs matching `query`, grouped by time bucket.
    pub fn closed_groups(&self, query: &ArchiveQuery) -> Vec<ClosedTabGroup> {
        self.archive.grouped(query, self.now())
    }

    /// Take the most recent entry for `id` out of the archive and reopen it
    /// in the background.
    ///
    /// If the host cannot open the tab, the entry goes back into the archive
    /// and the host error is returned.
    pub fn restore(&mut self, id: TabId) -> Result<ClosedTabEntry> {
        let entry = self.archive.restore(id)?;
        let result = self.reopen(entry);
        self.update_closed_count();
        result
    }

    /// Restore every entry in `bucket` matching `keyword`. One failed reopen
    /// does not stop the rest; entries that fail stay archived and are left
    /// out of the result.
    pub fn restore_all(&mut self, bucket: TimeBucket, keyword: &str) -> Vec<ClosedTabEntry> {
        let now = self.now();
        let taken = self.archive.restore_all(bucket, keyword, now);
        if taken.is_empty() {
            return taken;
        }
        let attempted = taken.len();
        let restored: Vec<ClosedTabEntry> = taken
            .into_iter()
            .filter_map(|entry| self.reopen(entry).ok())
            .collect();
        if restored.len() < attempted {
            info!(
                "Restored {} of {attempted} tab(s) from '{bucket}'",
                restored.len()
            );
        } else {
            info!("Restored {attempted} tab(s) from '{bucket}'");
        }
        self.update_closed_count();
        restored
    }

    /// Permanently delete the most recent entry for `id`. Idempotent.
    pub fn remove_closed(&mut self, id: TabId) -> Option<ClosedTabEntry> {
        let entry = self.archive.remove(id)?;
        self.emit(WrangleEvent::EntryRemoved { entry: &entry });
        self.update_closed_count();
        Some(entry)
    }

    /// Delete every archived entry. Returns how many were removed.
    pub fn clear_archive(&mut self) -> usize {
        let count = self.archive.clear();
        self.emit(WrangleEvent::ArchiveCleared { count });
        self.update_closed_count();
        count
    }

    /// Push the archive size to the host badge (or clear the badge when
    /// badge display is off). Returns the archive size.
    pub fn update_closed_count(&mut self) -> usize {
        let count = self.archive.len();
        let badge = self.settings.snapshot().show_badge_count.then_some(count);
        if let Err(e) = self.host.set_badge(badge) {
            warn!("Could not update badge: {e}");
        }
        count
    }

    /// Final bookkeeping before the engine is dropped: empties the archive
    /// when `purge_closed_tabs` is set.
    pub fn shutdown(&mut self) {
        if self.settings.snapshot().purge_closed_tabs {
            let count = self.clear_archive();
            info!("Purged {count} closed tab(s) on shutdown");
        }
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn emit(&self, event: WrangleEvent<'_>) {
        self.handler.on_event(&event);
    }

    /// Archive `tab` and ask the host to close it. Returns the entry and
    /// whether the host accepted the close.
    fn close_and_archive(&mut self, tab: &TabInfo, now: Millis) -> (ClosedTabEntry, bool) {
        let entry = ClosedTabEntry::from_tab(tab, now);
        let pruned = self.archive.archive(entry.clone());
        if !pruned.is_empty() {
            self.emit(WrangleEvent::ArchivePruned {
                count: pruned.len(),
            });
        }
        self.emit(WrangleEvent::TabEvicted { entry: &entry });

        let closed = match self.host.close_tab(tab.id) {
            Ok(()) => true,
            Err(error) => {
                warn!("Close signal for tab {} failed, keeping it archived: {error}", tab.id);
                self.emit(WrangleEvent::HostSignalFailed {
                    id: tab.id,
                    signal: HostSignal::Close,
                    error: &error,
                });
                false
            }
        };
        (entry, closed)
    }

    /// Ask the host to open `entry`. On failure the entry is archived again.
    fn reopen(&mut self, entry: ClosedTabEntry) -> Result<ClosedTabEntry> {
        match self.host.open_tab(&entry) {
            Ok(()) => {
                self.emit(WrangleEvent::TabRestored { entry: &entry });
                Ok(entry)
            }
            Err(error) => {
                warn!("Open signal for tab {} failed, returning it to the archive: {error}", entry.id);
                self.emit(WrangleEvent::HostSignalFailed {
                    id: entry.id,
                    signal: HostSignal::Open,
                    error: &error,
                });
                let pruned = self.archive.archive(entry);
                if !pruned.is_empty() {
                    self.emit(WrangleEvent::ArchivePruned {
                        count: pruned.len(),
                    });
                }
                Err(error)
            }
        }
    }

    /// Match the archive capacity to the settings. Returns how many entries
    /// were pruned.
    fn sync_capacity(&mut self, settings: &Settings) -> usize {
        if self.archive.max_size() == settings.max_archive_size {
            return 0;
        }
        let pruned = self.archive.set_max_size(settings.max_archive_size).len();
        if pruned > 0 {
            self.emit(WrangleEvent::ArchivePruned { count: pruned });
        }
        pruned
    }

    fn set_lock(&mut self, id: TabId, locked: bool) -> Result<bool> {
        if self.settings.snapshot().is_locked(id) == locked {
            return Ok(false);
        }
        self.write_locks(|locks| {
            if locked {
                locks.insert(id);
            } else {
                locks.remove(&id);
            }
        })?;
        self.emit(WrangleEvent::LockChanged { id, locked });
        Ok(true)
    }

    fn write_locks(
        &mut self,
        edit: impl FnOnce(&mut std::collections::BTreeSet<TabId>),
    ) -> Result<()> {
        let mut locks = self.settings.snapshot().locked_ids;
        edit(&mut locks);
        self.settings.set(SettingKey::LockedIds, json!(locks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::EventObserver;
    use crate::host::RecordingHost;
    use crate::settings::MemorySettingsStore;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Fixture {
        wrangler: Wrangler,
        clock: ManualClock,
        host: RecordingHost,
    }

    fn fixture(settings: Settings) -> Fixture {
        let clock = ManualClock::new(0);
        let host = RecordingHost::new();
        let wrangler = Wrangler::new(
            host.clone(),
            MemorySettingsStore::new(settings),
            clock.clone(),
        );
        Fixture {
            wrangler,
            clock,
            host,
        }
    }

    fn one_minute() -> Settings {
        Settings::default()
            .with_inactivity_threshold(Duration::from_secs(60))
            .with_min_tabs_open(0)
    }

    #[test]
    fn tick_evicts_expired_tab_and_updates_badge() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1).with_title("A"));
        f.clock.set(61_000);

        let report = f.wrangler.tick();
        assert_eq!(report.evicted_ids(), vec![TabId(1)]);
        assert_eq!(report.evicted[0].closed_at, 61_000);
        assert_eq!(f.host.closed(), vec![TabId(1)]);
        assert_eq!(f.host.badge(), Some(1));
        assert!(matches!(
            f.wrangler.time_remaining(TabId(1)),
            Err(WrangleError::UnknownTab(_))
        ));
    }

    #[test]
    fn activity_postpones_eviction() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.clock.set(50_000);
        f.wrangler.on_tab_activated(TabId(1));
        f.clock.set(61_000);
        assert!(f.wrangler.tick().evicted.is_empty());
        assert_eq!(f.wrangler.time_remaining(TabId(1)).unwrap(), 49_000);
    }

    #[test]
    fn host_failure_still_archives() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.host.mark_gone(TabId(1));
        f.clock.set(120_000);

        let report = f.wrangler.tick();
        assert_eq!(report.host_failures, vec![TabId(1)]);
        assert_eq!(f.wrangler.archive().len(), 1);
        assert!(!f.wrangler.tracker().contains(TabId(1)));
    }

    #[test]
    fn evicted_tab_is_not_evaluated_twice() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.clock.set(120_000);
        assert_eq!(f.wrangler.tick().evicted.len(), 1);
        assert!(f.wrangler.tick().evicted.is_empty());
        assert_eq!(f.wrangler.archive().len(), 1);
    }

    #[test]
    fn lock_and_unlock_toggle_exemption() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        assert!(f.wrangler.lock(TabId(1)).unwrap());
        assert!(!f.wrangler.lock(TabId(1)).unwrap());
        assert_eq!(
            f.wrangler.exemption(TabId(1)).unwrap(),
            Some(ExemptionReason::Locked)
        );

        f.clock.set(120_000);
        assert!(f.wrangler.tick().evicted.is_empty());

        assert!(f.wrangler.unlock(TabId(1)).unwrap());
        assert_eq!(f.wrangler.exemption(TabId(1)).unwrap(), None);
        assert_eq!(f.wrangler.tick().evicted.len(), 1);
    }

    #[test]
    fn exemption_of_untracked_tab_is_unknown() {
        let f = fixture(one_minute());
        assert!(matches!(
            f.wrangler.exemption(TabId(4)),
            Err(WrangleError::UnknownTab(TabId(4)))
        ));
    }

    #[test]
    fn removing_tab_drops_its_lock() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.wrangler.lock(TabId(1)).unwrap();
        f.wrangler.on_tab_removed(TabId(1));
        assert!(!f.wrangler.settings().is_locked(TabId(1)));
        assert!(f.wrangler.tracker().is_empty());
    }

    #[test]
    fn sync_open_tabs_reconciles_and_prunes_locks() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.wrangler.on_tab_created(TabInfo::new(2));
        f.wrangler.lock(TabId(2)).unwrap();
        f.wrangler.lock(TabId(9)).unwrap();

        f.wrangler.sync_open_tabs(vec![
            TabInfo::new(1).with_title("renamed"),
            TabInfo::new(3),
        ]);

        let tracked: HashSet<TabId> = f.wrangler.tracker().records().map(|r| r.id()).collect();
        assert_eq!(tracked, [TabId(1), TabId(3)].into_iter().collect());
        assert_eq!(
            f.wrangler.tracker().get(TabId(1)).unwrap().tab.title.as_deref(),
            Some("renamed")
        );
        assert!(f.wrangler.settings().locked_ids.is_empty());
    }

    #[test]
    fn pin_change_via_update_takes_effect() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.wrangler.handle_host_event(HostEvent::TabUpdated {
            tab: TabInfo::new(1).pinned(true),
        });
        f.clock.set(120_000);
        assert!(f.wrangler.tick().evicted.is_empty());
    }

    #[test]
    fn allow_list_editing() {
        let mut f = fixture(one_minute());
        assert!(f.wrangler.add_allow_pattern("cnn").unwrap());
        assert!(!f.wrangler.add_allow_pattern("cnn").unwrap());
        assert!(matches!(
            f.wrangler.add_allow_pattern("  "),
            Err(WrangleError::InvalidPattern(_))
        ));
        assert!(f.wrangler.settings().allow_list.contains(&"cnn".to_string()));

        assert!(f.wrangler.remove_allow_pattern("cnn").unwrap());
        assert!(!f.wrangler.remove_allow_pattern("cnn").unwrap());
    }

    #[test]
    fn pause_exempts_everything() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.wrangler.set_paused(true).unwrap();
        f.clock.set(120_000);
        assert!(f.wrangler.tick().evicted.is_empty());
        assert_eq!(
            f.wrangler.exemption(TabId(1)).unwrap(),
            Some(ExemptionReason::Paused)
        );
    }

    #[test]
    fn restore_reopens_in_background() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1).with_url("https://a.test"));
        f.clock.set(120_000);
        f.wrangler.tick();

        let entry = f.wrangler.restore(TabId(1)).unwrap();
        assert_eq!(f.host.opened(), vec![entry]);
        assert_eq!(f.host.badge(), Some(0));
        assert!(matches!(
            f.wrangler.restore(TabId(1)),
            Err(WrangleError::NotFound(TabId(1)))
        ));
    }

    #[test]
    fn restore_all_reopens_every_entry() {
        let mut f = fixture(one_minute());
        for id in 1..=3i64 {
            f.wrangler.on_tab_created(TabInfo::new(id));
        }
        f.clock.set(120_000);
        f.wrangler.tick();

        let restored = f.wrangler.restore_all(TimeBucket::Last30Minutes, "");
        assert_eq!(restored.len(), 3);
        assert_eq!(f.host.opened().len(), 3);
        assert!(f.wrangler.archive().is_empty());
    }

    fn record_restore_events(mut f: Fixture) -> (Fixture, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        f.wrangler = f.wrangler.with_event_handler(EventObserver::new(move |e| {
            let name = match e {
                WrangleEvent::TabRestored { entry } => format!("restored {}", entry.id),
                WrangleEvent::HostSignalFailed { id, signal, .. } => {
                    format!("{signal} failed {id}")
                }
                _ => return,
            };
            sink.lock().unwrap().push(name);
        }));
        (f, seen)
    }

    #[test]
    fn failed_reopen_keeps_entry_archived() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1).with_title("Keep me"));
        f.clock.set(120_000);
        f.wrangler.tick();
        let (mut f, seen) = record_restore_events(f);
        f.host.mark_open_fails(TabId(1));

        let err = f.wrangler.restore(TabId(1)).unwrap_err();
        assert!(matches!(err, WrangleError::HostSignalFailure { id: TabId(1), .. }));
        assert!(f.host.opened().is_empty());
        assert_eq!(f.wrangler.archive().len(), 1);
        let entry = f.wrangler.archive().entries().next().unwrap();
        assert_eq!(entry.title.as_deref(), Some("Keep me"));
        assert_eq!(entry.closed_at, 120_000);
        assert_eq!(f.host.badge(), Some(1));
        assert_eq!(*seen.lock().unwrap(), vec!["open failed 1"]);
    }

    #[test]
    fn restore_all_continues_past_failed_reopen() {
        let mut f = fixture(one_minute());
        for id in 1..=3i64 {
            f.wrangler.on_tab_created(TabInfo::new(id));
        }
        f.clock.set(120_000);
        f.wrangler.tick();
        let (mut f, seen) = record_restore_events(f);
        f.host.mark_open_fails(TabId(2));

        let restored = f.wrangler.restore_all(TimeBucket::Last30Minutes, "");
        let mut ids: Vec<TabId> = restored.iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec![TabId(1), TabId(3)]);
        assert_eq!(f.host.opened().len(), 2);

        let left: Vec<TabId> = f.wrangler.archive().entries().map(|e| e.id).collect();
        assert_eq!(left, vec![TabId(2)]);
        assert_eq!(f.host.badge(), Some(1));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(&"open failed 2".to_string()));
        assert!(!seen.contains(&"restored 2".to_string()));
    }

    #[test]
    fn wrangle_now_ignores_exemptions() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1).pinned(true));
        let entry = f.wrangler.wrangle_now(TabId(1)).unwrap();
        assert_eq!(entry.id, TabId(1));
        assert_eq!(f.host.closed(), vec![TabId(1)]);
        assert!(matches!(
            f.wrangler.wrangle_now(TabId(1)),
            Err(WrangleError::UnknownTab(_))
        ));
    }

    #[test]
    fn lowering_archive_size_prunes_now() {
        let mut f = fixture(one_minute());
        for id in 1..=4i64 {
            f.wrangler.on_tab_created(TabInfo::new(id));
            f.wrangler.wrangle_now(TabId(id)).unwrap();
            f.clock.advance(Duration::from_secs(1));
        }
        f.wrangler
            .update_setting(SettingKey::MaxArchiveSize, json!(2))
            .unwrap();
        assert_eq!(f.wrangler.archive().len(), 2);
        assert_eq!(f.host.badge(), Some(2));
    }

    #[test]
    fn badge_cleared_when_display_disabled() {
        let mut f = fixture(one_minute());
        f.wrangler
            .update_setting(SettingKey::ShowBadgeCount, json!(false))
            .unwrap();
        assert_eq!(f.host.badge(), None);
        assert_eq!(f.wrangler.update_closed_count(), 0);
    }

    #[test]
    fn shutdown_purges_only_when_configured() {
        let mut f = fixture(one_minute());
        f.wrangler.on_tab_created(TabInfo::new(1));
        f.wrangler.wrangle_now(TabId(1)).unwrap();
        f.wrangler.shutdown();
        assert_eq!(f.wrangler.archive().len(), 1);

        f.wrangler
            .update_setting(SettingKey::PurgeClosedTabs, json!(true))
            .unwrap();
        f.wrangler.shutdown();
        assert!(f.wrangler.archive().is_empty());
    }

    #[test]
    fn events_are_reported() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut f = fixture(one_minute());
        f.wrangler = f.wrangler.with_event_handler(EventObserver::new(move |e| {
            let name = match e {
                WrangleEvent::TabEvicted { .. } => "evicted",
                WrangleEvent::TickCompleted { .. } => "tick",
                WrangleEvent::HostSignalFailed { .. } => "host_failed",
                _ => return,
            };
            sink.lock().unwrap().push(name);
        }));

        f.wrangler.on_tab_created(TabInfo::new(1));
        f.host.mark_gone(TabId(1));
        f.clock.set(120_000);
        f.wrangler.tick();

        assert_eq!(*seen.lock().unwrap(), vec!["evicted", "host_failed", "tick"]);
    }
}
