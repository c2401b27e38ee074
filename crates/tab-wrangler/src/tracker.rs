//! Per-tab activity tracking.
//!
//! The [`ActivityTracker`] owns exactly one [`TabRecord`] per open, tracked
//! tab. Host notifications register and unregister tabs; focus changes
//! refresh `last_active_at`, which restarts that tab's eviction countdown.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::clock::Millis;
use crate::error::{Result, WrangleError};
use crate::tab::{TabId, TabInfo, TabRecord};

/// Last-active timestamps for every tracked tab.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    records: HashMap<TabId, TabRecord>,
}

impl ActivityTracker {
    /// Create a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `tab` with `last_active_at = now`.
    ///
    /// Idempotent: an already-registered tab keeps its record untouched, so
    /// focus churn that re-announces a tab never resets its timer. Returns
    /// `true` if the tab was newly registered.
    pub fn register(&mut self, tab: TabInfo, now: Millis) -> bool {
        if self.records.contains_key(&tab.id) {
            return false;
        }
        trace!("Tracking tab {} from {now}", tab.id);
        self.records.insert(
            tab.id,
            TabRecord {
                tab,
                last_active_at: now,
            },
        );
        true
    }

    /// Refresh `last_active_at` for a tracked tab.
    ///
    /// No-op (returns `false`) for untracked ids. Activity never moves the
    /// timestamp backwards.
    pub fn record_activity(&mut self, id: TabId, at: Millis) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.last_active_at = record.last_active_at.max(at);
                true
            }
            None => false,
        }
    }

    /// Replace a tracked tab's host metadata (URL, title, pin state) while
    /// keeping its activity time. Returns `false` for untracked ids.
    pub fn update(&mut self, tab: TabInfo) -> bool {
        match self.records.get_mut(&tab.id) {
            Some(record) => {
                record.tab = tab;
                true
            }
            None => false,
        }
    }

    /// Stop tracking a tab. Unregistering an unknown id is a no-op.
    pub fn unregister(&mut self, id: TabId) -> Option<TabRecord> {
        self.records.remove(&id)
    }

    /// Signed time left before the tab becomes eligible for eviction:
    /// `threshold_ms - (now - last_active_at)`. Zero or negative means
    /// eligible.
    pub fn time_remaining(&self, id: TabId, now: Millis, threshold_ms: Millis) -> Result<Millis> {
        let record = self.records.get(&id).ok_or(WrangleError::UnknownTab(id))?;
        Ok(record.remaining(now, threshold_ms))
    }

    /// Drop every record whose id is not in `open`. Returns the dropped ids.
    pub fn retain_open(&mut self, open: &HashSet<TabId>) -> Vec<TabId> {
        let stale: Vec<TabId> = self
            .records
            .keys()
            .filter(|id| !open.contains(id))
            .copied()
            .collect();
        for id in &stale {
            self.records.remove(id);
        }
        stale
    }

    pub fn get(&self, id: TabId) -> Option<&TabRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.records.contains_key(&id)
    }

    /// All tracked records, in no particular order.
    pub fn records(&self) -> impl Iterator<Item = &TabRecord> {
        self.records.values()
    }

    /// Number of tracked tabs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Millis = 60_000;

    #[test]
    fn new_tracker_is_empty() {
        let tracker = ActivityTracker::new();
        assert!(tracker.is_empty());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn register_sets_last_active() {
        let mut tracker = ActivityTracker::new();
        assert!(tracker.register(TabInfo::new(1), 5_000));
        assert_eq!(tracker.get(TabId(1)).unwrap().last_active_at, 5_000);
    }

    #[test]
    fn reregister_does_not_reset_timer() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1).with_title("first"), 0);
        assert!(!tracker.register(TabInfo::new(1).with_title("second"), 10 * MINUTE));

        let record = tracker.get(TabId(1)).unwrap();
        assert_eq!(record.last_active_at, 0);
        assert_eq!(record.tab.title.as_deref(), Some("first"));
    }

    #[test]
    fn activity_resets_countdown() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1), 0);
        assert_eq!(tracker.time_remaining(TabId(1), 50_000, MINUTE).unwrap(), 10_000);

        assert!(tracker.record_activity(TabId(1), 50_000));
        assert_eq!(tracker.time_remaining(TabId(1), 50_000, MINUTE).unwrap(), MINUTE);
    }

    #[test]
    fn activity_on_untracked_tab_is_noop() {
        let mut tracker = ActivityTracker::new();
        assert!(!tracker.record_activity(TabId(9), 1_000));
        assert!(!tracker.contains(TabId(9)));
    }

    #[test]
    fn activity_never_moves_backwards() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1), 10_000);
        tracker.record_activity(TabId(1), 4_000);
        assert_eq!(tracker.get(TabId(1)).unwrap().last_active_at, 10_000);
    }

    #[test]
    fn time_remaining_goes_negative() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1), 0);
        assert_eq!(tracker.time_remaining(TabId(1), 61_000, MINUTE).unwrap(), -1_000);
    }

    #[test]
    fn time_remaining_unknown_tab_errors() {
        let tracker = ActivityTracker::new();
        let err = tracker.time_remaining(TabId(3), 0, MINUTE).unwrap_err();
        assert!(matches!(err, WrangleError::UnknownTab(TabId(3))));
    }

    #[test]
    fn update_keeps_activity_time() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1), 7_000);
        assert!(tracker.update(TabInfo::new(1).with_url("https://a.test").pinned(true)));

        let record = tracker.get(TabId(1)).unwrap();
        assert!(record.tab.pinned);
        assert_eq!(record.last_active_at, 7_000);
        assert!(!tracker.update(TabInfo::new(2)));
    }

    #[test]
    fn unregister_twice_is_harmless() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1), 0);
        assert!(tracker.unregister(TabId(1)).is_some());
        assert!(tracker.unregister(TabId(1)).is_none());
    }

    #[test]
    fn retain_open_drops_missing_tabs() {
        let mut tracker = ActivityTracker::new();
        tracker.register(TabInfo::new(1), 0);
        tracker.register(TabInfo::new(2), 0);
        tracker.register(TabInfo::new(3), 0);

        let open: HashSet<TabId> = [TabId(1), TabId(3)].into_iter().collect();
        let dropped = tracker.retain_open(&open);
        assert_eq!(dropped, vec![TabId(2)]);
        assert_eq!(tracker.len(), 2);
    }
}
