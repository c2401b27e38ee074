//! Time-window buckets for grouping closed tabs.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ClosedTabEntry;
use crate::clock::{Millis, duration_ms};

/// A named window of close times, most recent first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    #[serde(rename = "last_30_minutes")]
    Last30Minutes,
    LastHour,
    #[serde(rename = "last_2_hours")]
    Last2Hours,
    LastDay,
    Older,
}

impl TimeBucket {
    /// Every bucket in display order.
    pub const ALL: [TimeBucket; 5] = [
        TimeBucket::Last30Minutes,
        TimeBucket::LastHour,
        TimeBucket::Last2Hours,
        TimeBucket::LastDay,
        TimeBucket::Older,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Last30Minutes => "last 30 minutes",
            Self::LastHour => "last hour",
            Self::Last2Hours => "last 2 hours",
            Self::LastDay => "last day",
            Self::Older => "older",
        }
    }

    fn snake_name(self) -> &'static str {
        match self {
            Self::Last30Minutes => "last_30_minutes",
            Self::LastHour => "last_hour",
            Self::Last2Hours => "last_2_hours",
            Self::LastDay => "last_day",
            Self::Older => "older",
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for a bucket name that matches neither a label nor a snake_case name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time window '{0}'")]
pub struct UnknownBucket(pub String);

impl FromStr for TimeBucket {
    type Err = UnknownBucket;

    /// Accepts the display label (`"last hour"`) or the snake_case name
    /// (`"last_hour"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.label().eq_ignore_ascii_case(s) || b.snake_name() == s)
            .ok_or_else(|| UnknownBucket(s.to_string()))
    }
}

/// Upper age limits of the bounded buckets.
///
/// Must be ascending. An entry belongs to the first bucket whose cutoff it
/// is strictly younger than; anything else is [`TimeBucket::Older`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketCutoffs {
    /// Default: 30 minutes.
    pub last_30_minutes: Duration,
    /// Default: 1 hour.
    pub last_hour: Duration,
    /// Default: 2 hours.
    pub last_2_hours: Duration,
    /// Default: 24 hours.
    pub last_day: Duration,
}

impl Default for BucketCutoffs {
    fn default() -> Self {
        Self {
            last_30_minutes: Duration::from_secs(30 * 60),
            last_hour: Duration::from_secs(60 * 60),
            last_2_hours: Duration::from_secs(2 * 60 * 60),
            last_day: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl BucketCutoffs {
    /// Cutoff for a bounded bucket; `None` for [`TimeBucket::Older`].
    pub fn cutoff(&self, bucket: TimeBucket) -> Option<Duration> {
        match bucket {
            TimeBucket::Last30Minutes => Some(self.last_30_minutes),
            TimeBucket::LastHour => Some(self.last_hour),
            TimeBucket::Last2Hours => Some(self.last_2_hours),
            TimeBucket::LastDay => Some(self.last_day),
            TimeBucket::Older => None,
        }
    }

    /// The bucket a tab closed at `closed_at` falls into at `now`.
    pub fn bucket_for(&self, closed_at: Millis, now: Millis) -> TimeBucket {
        TimeBucket::ALL
            .into_iter()
            .find(|&b| match self.cutoff(b) {
                Some(cutoff) => closed_at > now.saturating_sub(duration_ms(cutoff)),
                None => true,
            })
            .unwrap_or(TimeBucket::Older)
    }

    /// Whether `closed_at` lies inside the search window `bucket`.
    ///
    /// Bounded windows are cumulative ("last hour" includes the last 30
    /// minutes). `Older` is everything outside the last day.
    pub fn in_window(&self, closed_at: Millis, now: Millis, bucket: TimeBucket) -> bool {
        match self.cutoff(bucket) {
            Some(cutoff) => closed_at > now.saturating_sub(duration_ms(cutoff)),
            None => closed_at <= now.saturating_sub(duration_ms(self.last_day)),
        }
    }
}

/// Closed tabs sharing one time bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTabGroup {
    pub bucket: TimeBucket,
    pub label: &'static str,
    pub entries: Vec<ClosedTabEntry>,
}

/// Partition `entries` into buckets relative to `now`.
///
/// Groups come out most recent bucket first; empty buckets are omitted.
/// Within a group, entries keep their input order.
pub fn group_by_time_window(
    entries: impl IntoIterator<Item = ClosedTabEntry>,
    now: Millis,
    cutoffs: &BucketCutoffs,
) -> Vec<ClosedTabGroup> {
    let mut groups: Vec<ClosedTabGroup> = TimeBucket::ALL
        .into_iter()
        .map(|bucket| ClosedTabGroup {
            bucket,
            label: bucket.label(),
            entries: Vec::new(),
        })
        .collect();

    for entry in entries {
        let bucket = cutoffs.bucket_for(entry.closed_at, now);
        // ALL is in declaration order, so the discriminant is the index.
        groups[bucket as usize].entries.push(entry);
    }

    groups.retain(|g| !g.entries.is_empty());
    groups
}
