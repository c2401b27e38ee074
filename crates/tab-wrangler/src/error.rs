//! Typed errors for the wrangler engine.
//!
//! Callers at the crate boundary match on [`WrangleError`] variants. Contract
//! violations ([`UnknownTab`](WrangleError::UnknownTab),
//! [`InvalidPattern`](WrangleError::InvalidPattern)) are returned
//! synchronously; host failures are logged by the engine and never stop a
//! tick.

use std::path::PathBuf;

use thiserror::Error;

use crate::settings::SettingKey;
use crate::tab::TabId;

/// Top-level error type for the engine and its stores.
#[derive(Debug, Error)]
pub enum WrangleError {
    /// The tab id is not currently tracked (e.g. queried before `register`).
    #[error("tab {0} is not tracked")]
    UnknownTab(TabId),

    /// No archived entry exists for the tab id.
    #[error("no closed tab with id {0} in the archive")]
    NotFound(TabId),

    /// The host environment could not act on a tab (already gone, no host
    /// connected, ...).
    #[error("host signal for tab {id} failed: {reason}")]
    HostSignalFailure { id: TabId, reason: String },

    /// Allow-list patterns must contain at least one non-whitespace character.
    #[error("invalid allow-list pattern {0:?}: pattern is empty or whitespace")]
    InvalidPattern(String),

    /// A setting value failed validation.
    #[error("invalid value for setting '{key}': {reason}")]
    InvalidSetting { key: SettingKey, reason: String },

    /// The setting name does not match any [`SettingKey`].
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    /// Reading or writing a backing file failed.
    #[error("storage error at '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backing file holds malformed JSON.
    #[error("malformed JSON in '{}': {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl WrangleError {
    /// Shorthand for a [`HostSignalFailure`](Self::HostSignalFailure).
    pub fn host(id: TabId, reason: impl Into<String>) -> Self {
        Self::HostSignalFailure {
            id,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = WrangleError> = std::result::Result<T, E>;
