//! Serializable view of the engine for WebSocket and REST transport.

use serde::Serialize;
use tab_wrangler::archive::{ArchiveQuery, ClosedTabGroup};
use tab_wrangler::exemption::exemption_for;
use tab_wrangler::{ExemptionReason, Millis, Settings, TabRecord, Wrangler};

/// Everything a UI needs to draw itself in one round trip.
#[derive(Debug, Serialize)]
pub struct WranglerSnapshot {
    /// Engine time the snapshot was taken at.
    pub now: Millis,
    pub paused: bool,
    /// Open tabs ordered by id.
    pub open_tabs: Vec<OpenTabSnapshot>,
    /// Every archived tab, grouped by time bucket.
    pub closed: Vec<ClosedTabGroup>,
    pub closed_count: usize,
    pub settings: Settings,
}

/// One open tab with its countdown and exemption.
#[derive(Debug, Serialize)]
pub struct OpenTabSnapshot {
    #[serde(flatten)]
    pub record: TabRecord,
    /// Milliseconds until eviction; zero or negative means eligible.
    pub remaining_ms: Millis,
    pub exemption: Option<ExemptionReason>,
}

impl WranglerSnapshot {
    /// Build a snapshot. Call while holding the engine lock.
    pub fn from_wrangler(wrangler: &Wrangler) -> Self {
        let now = wrangler.now();
        let settings = wrangler.settings();

        let mut open_tabs: Vec<OpenTabSnapshot> = wrangler
            .tracker()
            .records()
            .map(|record| OpenTabSnapshot {
                remaining_ms: record.remaining(now, settings.inactivity_threshold_ms),
                exemption: exemption_for(&record.tab, &settings),
                record: record.clone(),
            })
            .collect();
        open_tabs.sort_by_key(|t| t.record.id());

        Self {
            now,
            paused: settings.paused,
            open_tabs,
            closed: wrangler.closed_groups(&ArchiveQuery::default()),
            closed_count: wrangler.archive().len(),
            settings,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tab_wrangler::settings::MemorySettingsStore;
    use tab_wrangler::{ManualClock, RecordingHost, TabId, TabInfo};

    #[test]
    fn snapshot_lists_tabs_with_countdown() {
        let clock = ManualClock::new(0);
        let settings = Settings::default()
            .with_inactivity_threshold(Duration::from_secs(60))
            .with_min_tabs_open(0);
        let mut wrangler = Wrangler::new(
            RecordingHost::new(),
            MemorySettingsStore::new(settings),
            clock.clone(),
        );
        wrangler.on_tab_created(TabInfo::new(2).pinned(true));
        wrangler.on_tab_created(TabInfo::new(1).with_title("plain"));
        clock.set(20_000);

        let snap = WranglerSnapshot::from_wrangler(&wrangler);
        assert_eq!(snap.open_tabs.len(), 2);
        assert_eq!(snap.open_tabs[0].record.id(), TabId(1));
        assert_eq!(snap.open_tabs[0].remaining_ms, 40_000);
        assert_eq!(snap.open_tabs[1].exemption, Some(ExemptionReason::Pinned));

        let json = snap.to_json();
        assert_eq!(json["open_tabs"][0]["title"], "plain");
        assert_eq!(json["open_tabs"][1]["exemption"]["kind"], "pinned");
        assert_eq!(json["closed_count"], 0);
    }

    #[test]
    fn countdown_matches_remaining_endpoint() {
        let clock = ManualClock::new(10_000);
        let settings = Settings::default()
            .with_inactivity_threshold(Duration::from_secs(60))
            .with_min_tabs_open(0);
        let mut wrangler = Wrangler::new(
            RecordingHost::new(),
            MemorySettingsStore::new(settings),
            clock.clone(),
        );
        wrangler.on_tab_created(TabInfo::new(1));
        // Clock stepped backwards: activity now lies in the future.
        clock.set(4_000);

        let snap = WranglerSnapshot::from_wrangler(&wrangler);
        assert_eq!(
            snap.open_tabs[0].remaining_ms,
            wrangler.time_remaining(TabId(1)).unwrap()
        );
        assert_eq!(snap.open_tabs[0].remaining_ms, 66_000);
    }

    #[test]
    fn extreme_threshold_does_not_overflow() {
        let clock = ManualClock::new(0);
        let settings = Settings {
            inactivity_threshold_ms: i64::MIN,
            ..Settings::default()
        };
        let mut wrangler = Wrangler::new(
            RecordingHost::new(),
            MemorySettingsStore::new(settings),
            clock.clone(),
        );
        wrangler.on_tab_created(TabInfo::new(1));
        clock.set(5_000);

        let snap = WranglerSnapshot::from_wrangler(&wrangler);
        assert_eq!(snap.open_tabs[0].remaining_ms, i64::MIN);
    }
}
