//! Settings persisted as a JSON file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{Settings, SettingKey, SettingsStore};
use crate::error::Result;
use crate::persist::{read_json, write_json_atomic};

/// A [`SettingsStore`] backed by a JSON file.
///
/// Every successful `set` rewrites the file atomically. A missing file
/// starts from [`Settings::default`]; keys absent from an existing file fall
/// back to their defaults.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl FileSettingsStore {
    /// Load settings from `path`, or start from defaults if it doesn't exist.
    ///
    /// Invalid values in an existing file (a threshold under one minute,
    /// blank allow-list patterns) are replaced by their defaults and the
    /// repaired file is written back.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Some(mut settings) = read_json::<Settings>(&path)? else {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self {
                path,
                settings: Settings::default(),
            });
        };

        let repaired = settings.repair();
        let store = Self { path, settings };
        if !repaired.is_empty() {
            let keys: Vec<&str> = repaired.iter().map(|k| k.as_str()).collect();
            warn!(
                "Settings file {} held invalid values for {}; reset to defaults",
                store.path.display(),
                keys.join(", ")
            );
            if let Err(e) = store.save() {
                warn!("Could not write repaired settings: {e}");
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current settings to disk.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.settings)
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: SettingKey) -> serde_json::Value {
        self.settings.get(key)
    }

    fn set(&mut self, key: SettingKey, value: serde_json::Value) -> Result<()> {
        let mut next = self.settings.clone();
        next.set(key, value)?;
        write_json_atomic(&self.path, &next)?;
        self.settings = next;
        Ok(())
    }

    fn snapshot(&self) -> Settings {
        self.settings.clone()
    }
}
