//! Tab identity and metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;

/// Host-assigned tab identifier.
///
/// Unique among open tabs but not stable across browser restarts, so the
/// archive may hold several historical entries for the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TabId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// Unsuffixed integer literals default to i32.
impl From<i32> for TabId {
    fn from(id: i32) -> Self {
        Self(i64::from(id))
    }
}

/// A tab as described by the host environment.
///
/// Display metadata is optional: a freshly opened new-tab page may have no
/// URL or title yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

impl TabInfo {
    /// A tab with no metadata and not pinned.
    pub fn new(id: impl Into<TabId>) -> Self {
        Self {
            id: id.into(),
            url: None,
            title: None,
            favicon_url: None,
            pinned: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_favicon(mut self, favicon_url: impl Into<String>) -> Self {
        self.favicon_url = Some(favicon_url.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

/// One tracked open tab: host metadata plus the last time it was active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabRecord {
    #[serde(flatten)]
    pub tab: TabInfo,
    pub last_active_at: Millis,
}

impl TabRecord {
    pub fn id(&self) -> TabId {
        self.tab.id
    }

    /// Time left before the record expires under `threshold_ms`. Zero or
    /// negative means eligible for eviction.
    pub fn remaining(&self, now: Millis, threshold_ms: Millis) -> Millis {
        threshold_ms.saturating_sub(now.saturating_sub(self.last_active_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_info_deserializes_with_missing_metadata() {
        let tab: TabInfo = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(tab, TabInfo::new(7));
    }

    #[test]
    fn record_flattens_tab_fields() {
        let record = TabRecord {
            tab: TabInfo::new(3).with_url("https://example.com").pinned(true),
            last_active_at: 42,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["url"], "https://example.com");
        assert_eq!(json["pinned"], true);
        assert_eq!(json["last_active_at"], 42);
    }

    #[test]
    fn remaining_saturates() {
        let record = TabRecord {
            tab: TabInfo::new(1),
            last_active_at: 10_000,
        };
        assert_eq!(record.remaining(15_000, 60_000), 55_000);
        // Activity stamped after `now` extends the countdown.
        assert_eq!(record.remaining(9_000, 60_000), 61_000);
        assert_eq!(record.remaining(15_000, i64::MIN), i64::MIN);
    }
}
