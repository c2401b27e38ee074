//! Tab eviction planning: pick which expired tabs to close this tick.
//!
//! A tab is a candidate when no exemption applies and its time-to-live has
//! run out. Candidates are taken oldest activity first, and only as many
//! as the eviction floor allows: the count of open tabs that are neither
//! pinned nor locked never drops below `min_tabs_open`. The floor wins over
//! expiry, so when there are too few such tabs nothing is closed.
//!
//! Planning is pure. [`Wrangler::tick`](crate::Wrangler::tick) carries out
//! the plan (unregister, archive, close on the host).

use serde::Serialize;

use crate::archive::ClosedTabEntry;
use crate::clock::Millis;
use crate::exemption::is_exempt;
use crate::settings::Settings;
use crate::tab::{TabId, TabRecord};
use crate::tracker::ActivityTracker;

/// Which tabs to evict this tick, in eviction order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    /// Tabs to evict, oldest `last_active_at` first.
    pub evict: Vec<TabId>,
    /// Number of expired, non-exempt tabs found.
    pub expired: usize,
    /// Expired tabs held back to respect the eviction floor.
    pub deferred_by_floor: usize,
}

impl EvictionPlan {
    pub fn is_empty(&self) -> bool {
        self.evict.is_empty()
    }
}

/// Build the eviction plan for `now` from the current tracker state and a
/// settings snapshot.
pub fn plan_evictions(tracker: &ActivityTracker, settings: &Settings, now: Millis) -> EvictionPlan {
    // Tabs that count towards the floor: open and neither pinned nor locked.
    let floor_pool = tracker
        .records()
        .filter(|r| !r.tab.pinned && !settings.is_locked(r.id()))
        .count();
    let budget = floor_pool.saturating_sub(settings.min_tabs_open);

    let mut expired: Vec<&TabRecord> = tracker
        .records()
        .filter(|r| !is_exempt(&r.tab, settings))
        .filter(|r| r.remaining(now, settings.inactivity_threshold_ms) <= 0)
        .collect();
    // Oldest activity first; id breaks ties so the order is deterministic.
    expired.sort_by_key(|r| (r.last_active_at, r.id()));

    let found = expired.len();
    let evict: Vec<TabId> = expired.iter().take(budget).map(|r| r.id()).collect();

    EvictionPlan {
        deferred_by_floor: found - evict.len(),
        expired: found,
        evict,
    }
}

/// Outcome of one executed tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Time of the tick.
    pub at: Millis,
    /// Archive entries created this tick, in eviction order.
    pub evicted: Vec<ClosedTabEntry>,
    /// Expired tabs kept open because of the eviction floor.
    pub deferred_by_floor: usize,
    /// Evicted tabs whose close signal the host rejected. They are archived
    /// and untracked regardless.
    pub host_failures: Vec<TabId>,
    /// Tabs still tracked after the tick.
    pub tracked: usize,
}

impl TickReport {
    pub fn evicted_ids(&self) -> Vec<TabId> {
        self.evicted.iter().map(|e| e.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::TabInfo;
    use std::time::Duration;

    const SEC: Millis = 1_000;

    fn settings(min_tabs: usize) -> Settings {
        Settings::default()
            .with_inactivity_threshold(Duration::from_secs(60))
            .with_min_tabs_open(min_tabs)
            .with_allow_list(&["cnn"])
    }

    fn tracker(tabs: &[(TabInfo, Millis)]) -> ActivityTracker {
        let mut t = ActivityTracker::new();
        for (tab, at) in tabs {
            t.register(tab.clone(), *at);
        }
        t
    }

    #[test]
    fn expired_tab_is_planned() {
        let t = tracker(&[(TabInfo::new(1), 0)]);
        let plan = plan_evictions(&t, &settings(0), 61 * SEC);
        assert_eq!(plan.evict, vec![TabId(1)]);
        assert_eq!(plan.expired, 1);
    }

    #[test]
    fn zero_remaining_is_eligible() {
        let t = tracker(&[(TabInfo::new(1), 0)]);
        assert_eq!(plan_evictions(&t, &settings(0), 60 * SEC).evict, vec![TabId(1)]);
        assert!(plan_evictions(&t, &settings(0), 59 * SEC).is_empty());
    }

    #[test]
    fn exempt_tabs_are_never_planned() {
        let t = tracker(&[
            (TabInfo::new(1).pinned(true), 0),
            (TabInfo::new(2), 0),
            (TabInfo::new(3).with_url("https://edition.cnn.com/x"), 0),
            (TabInfo::new(4).with_url("https://example.com"), 0),
        ]);
        let s = settings(0).with_locked(2);
        let plan = plan_evictions(&t, &s, 120 * SEC);
        assert_eq!(plan.evict, vec![TabId(4)]);

        let plan = plan_evictions(&t, &s.with_paused(true), 120 * SEC);
        assert!(plan.is_empty());
        assert_eq!(plan.expired, 0);
    }

    #[test]
    fn floor_limits_evictions_oldest_first() {
        let t = tracker(&[
            (TabInfo::new(1), 2 * SEC),
            (TabInfo::new(2), 0),
            (TabInfo::new(3), SEC),
        ]);
        let plan = plan_evictions(&t, &settings(2), 120 * SEC);
        assert_eq!(plan.evict, vec![TabId(2)]);
        assert_eq!(plan.deferred_by_floor, 2);
    }

    #[test]
    fn floor_ignores_pinned_and_locked_tabs() {
        // Two pinned/locked tabs plus two plain ones; floor of 2 means the
        // plain ones must both stay.
        let t = tracker(&[
            (TabInfo::new(1).pinned(true), 0),
            (TabInfo::new(2), 0),
            (TabInfo::new(3), 0),
            (TabInfo::new(4), 0),
        ]);
        let s = settings(2).with_locked(2);
        let plan = plan_evictions(&t, &s, 120 * SEC);
        assert!(plan.is_empty());
        assert_eq!(plan.deferred_by_floor, 2);
    }

    #[test]
    fn allow_listed_tabs_count_towards_floor() {
        let t = tracker(&[
            (TabInfo::new(1).with_url("https://cnn.com"), 0),
            (TabInfo::new(2), 0),
        ]);
        let plan = plan_evictions(&t, &settings(1), 120 * SEC);
        assert_eq!(plan.evict, vec![TabId(2)]);
    }

    #[test]
    fn ties_break_by_id() {
        let t = tracker(&[(TabInfo::new(9), 0), (TabInfo::new(4), 0), (TabInfo::new(6), 0)]);
        let plan = plan_evictions(&t, &settings(0), 120 * SEC);
        assert_eq!(plan.evict, vec![TabId(4), TabId(6), TabId(9)]);
    }
}
