//! Wrangler configuration and the key/value settings store contract.
//!
//! The engine never holds on to settings between ticks. Each evaluation reads
//! a fresh [`Settings`] snapshot from a [`SettingsStore`], so writes coming
//! from the UI (toggling a lock, editing the allow-list, pausing) take effect
//! on the next tick without racing an in-flight scan.
//!
//! # Examples
//!
//! ```ignore
//! let mut store = MemorySettingsStore::default();
//! store.set(SettingKey::MinTabsOpen, serde_json::json!(3))?;
//! store.set(SettingKey::AllowList, serde_json::json!(["cnn", "localhost"]))?;
//! assert_eq!(store.snapshot().min_tabs_open, 3);
//! ```

mod file;

pub use file::FileSettingsStore;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::{Millis, duration_ms};
use crate::error::{Result, WrangleError};
use crate::tab::TabId;

/// Default time-to-live for an inactive tab: 20 minutes.
pub const DEFAULT_INACTIVITY_THRESHOLD_MS: Millis = 20 * 60 * 1000;
/// Shortest accepted time-to-live: 1 minute.
pub const MIN_INACTIVITY_THRESHOLD_MS: Millis = 60 * 1000;
/// Default eviction floor.
pub const DEFAULT_MIN_TABS_OPEN: usize = 5;
/// Default archive capacity.
pub const DEFAULT_MAX_ARCHIVE_SIZE: usize = 100;

// ── Settings snapshot ─────────────────────────────────────────────

/// Typed configuration snapshot read once per tick.
///
/// Missing keys deserialize to their defaults, so a partially written
/// settings file still yields a usable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inactivity time after which a non-exempt tab is evicted.
    /// Default: 20 minutes.
    pub inactivity_threshold_ms: Millis,
    /// Never evict below this many open tabs, not counting pinned or locked
    /// tabs. Default: `5`.
    pub min_tabs_open: usize,
    /// Maximum number of closed tabs remembered. Default: `100`.
    pub max_archive_size: usize,
    /// Global suspend: when set, every tab is exempt. Default: `false`.
    pub paused: bool,
    /// Tabs explicitly locked by the user. May contain ids of tabs that are
    /// already gone.
    pub locked_ids: BTreeSet<TabId>,
    /// URL substrings that auto-lock matching tabs.
    /// Default: `["about:", "chrome://"]`.
    pub allow_list: Vec<String>,
    /// Whether allow-list matching is case-sensitive. Default: `true`.
    pub allow_list_case_sensitive: bool,
    /// Clear the archive when the wrangler shuts down. Default: `false`.
    pub purge_closed_tabs: bool,
    /// Show the closed-tab count on the host badge. Default: `true`.
    pub show_badge_count: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inactivity_threshold_ms: DEFAULT_INACTIVITY_THRESHOLD_MS,
            min_tabs_open: DEFAULT_MIN_TABS_OPEN,
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
            paused: false,
            locked_ids: BTreeSet::new(),
            allow_list: vec!["about:".into(), "chrome://".into()],
            allow_list_case_sensitive: true,
            purge_closed_tabs: false,
            show_badge_count: true,
        }
    }
}

impl Settings {
    pub fn is_locked(&self, id: TabId) -> bool {
        self.locked_ids.contains(&id)
    }

    /// The inactivity threshold as a [`Duration`].
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.inactivity_threshold_ms).unwrap_or(0))
    }

    /// Set the inactivity threshold.
    pub fn with_inactivity_threshold(mut self, threshold: Duration) -> Self {
        self.inactivity_threshold_ms = duration_ms(threshold);
        self
    }

    /// Set the eviction floor.
    pub fn with_min_tabs_open(mut self, min: usize) -> Self {
        self.min_tabs_open = min;
        self
    }

    /// Set the archive capacity.
    pub fn with_max_archive_size(mut self, max: usize) -> Self {
        self.max_archive_size = max;
        self
    }

    /// Replace the allow-list.
    pub fn with_allow_list(mut self, patterns: &[&str]) -> Self {
        self.allow_list = patterns.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Lock a tab id.
    pub fn with_locked(mut self, id: impl Into<TabId>) -> Self {
        self.locked_ids.insert(id.into());
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Check every field against its constraints.
    pub fn validate(&self) -> Result<()> {
        check_threshold(self.inactivity_threshold_ms)?;
        for pattern in &self.allow_list {
            validate_pattern(pattern)?;
        }
        Ok(())
    }

    /// Replace invalid fields with their defaults and drop blank allow-list
    /// patterns. Returns the keys that were changed.
    pub fn repair(&mut self) -> Vec<SettingKey> {
        let mut repaired = Vec::new();
        if check_threshold(self.inactivity_threshold_ms).is_err() {
            self.inactivity_threshold_ms = DEFAULT_INACTIVITY_THRESHOLD_MS;
            repaired.push(SettingKey::InactivityThresholdMs);
        }
        let before = self.allow_list.len();
        self.allow_list.retain(|p| validate_pattern(p).is_ok());
        if self.allow_list.len() != before {
            repaired.push(SettingKey::AllowList);
        }
        repaired
    }

    /// Read one setting as a JSON value.
    pub fn get(&self, key: SettingKey) -> serde_json::Value {
        match key {
            SettingKey::InactivityThresholdMs => json!(self.inactivity_threshold_ms),
            SettingKey::MinTabsOpen => json!(self.min_tabs_open),
            SettingKey::MaxArchiveSize => json!(self.max_archive_size),
            SettingKey::Paused => json!(self.paused),
            SettingKey::LockedIds => json!(self.locked_ids),
            SettingKey::AllowList => json!(self.allow_list),
            SettingKey::AllowListCaseSensitive => json!(self.allow_list_case_sensitive),
            SettingKey::PurgeClosedTabs => json!(self.purge_closed_tabs),
            SettingKey::ShowBadgeCount => json!(self.show_badge_count),
        }
    }

    /// Validate and write one setting. On error the snapshot is unchanged.
    pub fn set(&mut self, key: SettingKey, value: serde_json::Value) -> Result<()> {
        match key {
            SettingKey::InactivityThresholdMs => {
                let ms: Millis = parse_value(key, value)?;
                check_threshold(ms)?;
                self.inactivity_threshold_ms = ms;
            }
            SettingKey::MinTabsOpen => self.min_tabs_open = parse_value(key, value)?,
            SettingKey::MaxArchiveSize => self.max_archive_size = parse_value(key, value)?,
            SettingKey::Paused => self.paused = parse_value(key, value)?,
            SettingKey::LockedIds => self.locked_ids = parse_value(key, value)?,
            SettingKey::AllowList => {
                let patterns: Vec<String> = parse_value(key, value)?;
                let mut deduped: Vec<String> = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    validate_pattern(&pattern)?;
                    if !deduped.contains(&pattern) {
                        deduped.push(pattern);
                    }
                }
                self.allow_list = deduped;
            }
            SettingKey::AllowListCaseSensitive => {
                self.allow_list_case_sensitive = parse_value(key, value)?
            }
            SettingKey::PurgeClosedTabs => self.purge_closed_tabs = parse_value(key, value)?,
            SettingKey::ShowBadgeCount => self.show_badge_count = parse_value(key, value)?,
        }
        Ok(())
    }
}

/// Reject empty or whitespace-only allow-list patterns.
pub fn validate_pattern(pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() {
        return Err(WrangleError::InvalidPattern(pattern.to_string()));
    }
    Ok(())
}

fn check_threshold(ms: Millis) -> Result<()> {
    if ms < MIN_INACTIVITY_THRESHOLD_MS {
        return Err(WrangleError::InvalidSetting {
            key: SettingKey::InactivityThresholdMs,
            reason: format!("must be at least {MIN_INACTIVITY_THRESHOLD_MS} ms, got {ms}"),
        });
    }
    Ok(())
}

fn parse_value<T: DeserializeOwned>(key: SettingKey, value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| WrangleError::InvalidSetting {
        key,
        reason: e.to_string(),
    })
}

// ── Keys ──────────────────────────────────────────────────────────

/// Names of the individual settings in the key/value contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    InactivityThresholdMs,
    MinTabsOpen,
    MaxArchiveSize,
    Paused,
    LockedIds,
    AllowList,
    AllowListCaseSensitive,
    PurgeClosedTabs,
    ShowBadgeCount,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::InactivityThresholdMs,
        SettingKey::MinTabsOpen,
        SettingKey::MaxArchiveSize,
        SettingKey::Paused,
        SettingKey::LockedIds,
        SettingKey::AllowList,
        SettingKey::AllowListCaseSensitive,
        SettingKey::PurgeClosedTabs,
        SettingKey::ShowBadgeCount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InactivityThresholdMs => "inactivity_threshold_ms",
            Self::MinTabsOpen => "min_tabs_open",
            Self::MaxArchiveSize => "max_archive_size",
            Self::Paused => "paused",
            Self::LockedIds => "locked_ids",
            Self::AllowList => "allow_list",
            Self::AllowListCaseSensitive => "allow_list_case_sensitive",
            Self::PurgeClosedTabs => "purge_closed_tabs",
            Self::ShowBadgeCount => "show_badge_count",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = WrangleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| WrangleError::UnknownSetting(s.to_string()))
    }
}

// ── Store contract ────────────────────────────────────────────────

/// Key/value access to the persisted configuration.
///
/// Implementations validate on `set`; a rejected write leaves the store
/// unchanged.
pub trait SettingsStore: Send {
    fn get(&self, key: SettingKey) -> serde_json::Value;

    fn set(&mut self, key: SettingKey, value: serde_json::Value) -> Result<()>;

    /// Materialize the full typed configuration.
    fn snapshot(&self) -> Settings;
}

/// Settings kept in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    settings: Settings,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: SettingKey) -> serde_json::Value {
        self.settings.get(key)
    }

    fn set(&mut self, key: SettingKey, value: serde_json::Value) -> Result<()> {
        // Validate against a copy so a failed write can't leave partial state.
        let mut next = self.settings.clone();
        next.set(key, value)?;
        self.settings = next;
        Ok(())
    }

    fn snapshot(&self) -> Settings {
        self.settings.clone()
    }
}
