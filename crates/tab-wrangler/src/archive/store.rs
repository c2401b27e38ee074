//! Archive persistence as a versioned JSON document.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ClosedTabArchive, ClosedTabEntry};
use crate::error::Result;
use crate::persist::{read_json, write_json_atomic};

/// Current on-disk format version.
pub const ARCHIVE_FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: u32,
    #[serde(default)]
    entries: Vec<ClosedTabEntry>,
}

/// Loads and saves a [`ClosedTabArchive`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    path: PathBuf,
}

impl ArchiveFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the archive, capped at `max_size`. A missing file yields an
    /// empty archive.
    pub fn load(&self, max_size: usize) -> Result<ClosedTabArchive> {
        let Some(doc) = read_json::<Document>(&self.path)? else {
            debug!("No archive at {}, starting empty", self.path.display());
            return Ok(ClosedTabArchive::new(max_size));
        };
        if doc.version != ARCHIVE_FILE_VERSION {
            warn!(
                "Archive {} has version {}, expected {ARCHIVE_FILE_VERSION}; reading anyway",
                self.path.display(),
                doc.version
            );
        }
        debug!("Loaded {} closed tabs from {}", doc.entries.len(), self.path.display());
        Ok(ClosedTabArchive::from_entries(doc.entries, max_size))
    }

    /// Write every entry, in insertion order.
    pub fn save(&self, archive: &ClosedTabArchive) -> Result<()> {
        let doc = Document {
            version: ARCHIVE_FILE_VERSION,
            entries: archive.entries().cloned().collect(),
        };
        write_json_atomic(&self.path, &doc)
    }
}
