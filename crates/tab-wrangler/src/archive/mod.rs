//! Closed-tab archive: a bounded, searchable history of evicted tabs.
//!
//! Entries keep the metadata captured at close time. The archive is capped
//! at `max_size`; inserting past the cap prunes the chronologically oldest
//! entries first. The same tab id may appear more than once because hosts
//! reuse ids across sessions. Single-entry operations (`remove`, `restore`)
//! act on the most recent entry for an id.

mod buckets;
mod store;

pub use buckets::{
    BucketCutoffs, ClosedTabGroup, TimeBucket, UnknownBucket, group_by_time_window,
};
pub use store::{ARCHIVE_FILE_VERSION, ArchiveFile};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Millis;
use crate::error::{Result, WrangleError};
use crate::tab::{TabId, TabInfo};

/// One archived tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTabEntry {
    pub id: TabId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,
    pub closed_at: Millis,
}

impl ClosedTabEntry {
    /// Capture a tab's display metadata at `closed_at`.
    pub fn from_tab(tab: &TabInfo, closed_at: Millis) -> Self {
        Self {
            id: tab.id,
            url: tab.url.clone(),
            title: tab.title.clone(),
            favicon_url: tab.favicon_url.clone(),
            closed_at,
        }
    }

    /// Case-insensitive substring match over title and URL. `needle` must
    /// already be lowercase; an empty needle matches everything.
    fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        [self.title.as_deref(), self.url.as_deref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Keyword and optional time-window filter for [`ClosedTabArchive::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArchiveQuery {
    /// Case-insensitive substring; whitespace is matched as typed.
    pub keyword: String,
    pub window: Option<TimeBucket>,
}

impl ArchiveQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            window: None,
        }
    }

    pub fn in_window(mut self, window: TimeBucket) -> Self {
        self.window = Some(window);
        self
    }
}

/// An entry plus its insertion sequence number, used to break ties between
/// entries closed in the same millisecond.
#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    entry: ClosedTabEntry,
}

/// Bounded store of closed tabs.
#[derive(Debug, Clone)]
pub struct ClosedTabArchive {
    slots: Vec<Slot>,
    next_seq: u64,
    max_size: usize,
    cutoffs: BucketCutoffs,
}

impl Default for ClosedTabArchive {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_MAX_ARCHIVE_SIZE)
    }
}

impl ClosedTabArchive {
    /// Create an empty archive holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            next_seq: 0,
            max_size,
            cutoffs: BucketCutoffs::default(),
        }
    }

    /// Use custom time-bucket cutoffs for grouping and windowed search.
    pub fn with_cutoffs(mut self, cutoffs: BucketCutoffs) -> Self {
        self.cutoffs = cutoffs;
        self
    }

    /// Rebuild an archive from persisted entries, in their stored order.
    /// Entries beyond `max_size` are pruned oldest first.
    pub fn from_entries(entries: impl IntoIterator<Item = ClosedTabEntry>, max_size: usize) -> Self {
        let mut archive = Self::new(max_size);
        for entry in entries {
            archive.push(entry);
        }
        let pruned = archive.prune(None);
        if !pruned.is_empty() {
            debug!("Dropped {} stored entries over capacity", pruned.len());
        }
        archive
    }

    pub fn cutoffs(&self) -> &BucketCutoffs {
        &self.cutoffs
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the capacity. Returns entries pruned to fit the new cap.
    pub fn set_max_size(&mut self, max_size: usize) -> Vec<ClosedTabEntry> {
        self.max_size = max_size;
        self.prune(None)
    }

    /// Append an entry. Returns any entries pruned to stay within the cap.
    ///
    /// The entry just added is never the one pruned while the cap is at
    /// least one, even if its `closed_at` is older than everything else.
    pub fn archive(&mut self, entry: ClosedTabEntry) -> Vec<ClosedTabEntry> {
        let seq = self.push(entry);
        self.prune(Some(seq))
    }

    /// Permanently delete the most recent entry for `id`. Idempotent:
    /// removing an absent id returns `None`.
    pub fn remove(&mut self, id: TabId) -> Option<ClosedTabEntry> {
        let index = self.latest_index(id)?;
        Some(self.slots.remove(index).entry)
    }

    /// Take the most recent entry for `id` out of the archive so the caller
    /// can reopen it.
    pub fn restore(&mut self, id: TabId) -> Result<ClosedTabEntry> {
        self.remove(id).ok_or(WrangleError::NotFound(id))
    }

    /// Entries matching `query`, newest first (ties: newest inserted first).
    pub fn search(&self, query: &ArchiveQuery, now: Millis) -> Vec<ClosedTabEntry> {
        self.matching_slots(query, now)
            .into_iter()
            .map(|slot| slot.entry.clone())
            .collect()
    }

    /// Search results partitioned into time buckets.
    pub fn grouped(&self, query: &ArchiveQuery, now: Millis) -> Vec<ClosedTabGroup> {
        group_by_time_window(self.search(query, now), now, &self.cutoffs)
    }

    /// Restore every entry in `bucket` that matches `keyword`, in the
    /// bucket's display order.
    ///
    /// Each entry is restored independently; an entry that has vanished in
    /// the meantime is skipped and the rest continue.
    pub fn restore_all(&mut self, bucket: TimeBucket, keyword: &str, now: Millis) -> Vec<ClosedTabEntry> {
        let query = ArchiveQuery::keyword(keyword);
        let targets: Vec<u64> = self
            .matching_slots(&query, now)
            .into_iter()
            .filter(|slot| self.cutoffs.bucket_for(slot.entry.closed_at, now) == bucket)
            .map(|slot| slot.seq)
            .collect();

        let mut restored = Vec::with_capacity(targets.len());
        for seq in targets {
            match self.slots.iter().position(|s| s.seq == seq) {
                Some(index) => restored.push(self.slots.remove(index).entry),
                None => warn!("Closed tab vanished before it could be restored"),
            }
        }
        restored
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &ClosedTabEntry> {
        self.slots.iter().map(|s| &s.entry)
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn push(&mut self, entry: ClosedTabEntry) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.push(Slot { seq, entry });
        seq
    }

    /// Drop oldest entries until within the cap, sparing `protect`.
    fn prune(&mut self, protect: Option<u64>) -> Vec<ClosedTabEntry> {
        let mut pruned = Vec::new();
        while self.slots.len() > self.max_size {
            let victim = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, s)| Some(s.seq) != protect)
                .min_by_key(|(_, s)| (s.entry.closed_at, s.seq))
                .map(|(i, _)| i);
            match victim {
                Some(index) => pruned.push(self.slots.remove(index).entry),
                // Only the protected slot is left and the cap is zero.
                None => {
                    pruned.extend(self.slots.drain(..).map(|s| s.entry));
                    break;
                }
            }
        }
        pruned
    }

    fn latest_index(&self, id: TabId) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.entry.id == id)
            .max_by_key(|(_, s)| (s.entry.closed_at, s.seq))
            .map(|(i, _)| i)
    }

    fn matching_slots(&self, query: &ArchiveQuery, now: Millis) -> Vec<&Slot> {
        let needle = query.keyword.to_lowercase();
        let mut hits: Vec<&Slot> = self
            .slots
            .iter()
            .filter(|s| s.entry.matches(&needle))
            .filter(|s| match query.window {
                Some(window) => self.cutoffs.in_window(s.entry.closed_at, now, window),
                None => true,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.entry
                .closed_at
                .cmp(&a.entry.closed_at)
                .then(b.seq.cmp(&a.seq))
        });
        hits
    }
}
