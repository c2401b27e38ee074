//! Convenience re-exports for common `tab-wrangler` types.
//!
//! ```ignore
//! use tab_wrangler::prelude::*;
//! ```

// ── Engine ──────────────────────────────────────────────────────────
pub use crate::runtime::{SharedWrangler, Ticker};
pub use crate::wrangler::Wrangler;
pub use crate::{Result, WrangleError};

// ── Tabs and host ───────────────────────────────────────────────────
pub use crate::clock::{Clock, ManualClock, Millis, SystemClock};
pub use crate::host::{HostEvent, RecordingHost, TabHost};
pub use crate::tab::{TabId, TabInfo, TabRecord};

// ── Policy ──────────────────────────────────────────────────────────
pub use crate::eviction::TickReport;
pub use crate::exemption::ExemptionReason;
pub use crate::settings::{
    FileSettingsStore, MemorySettingsStore, SettingKey, Settings, SettingsStore,
};

// ── Archive ─────────────────────────────────────────────────────────
pub use crate::archive::{
    ArchiveFile, ArchiveQuery, ClosedTabArchive, ClosedTabEntry, ClosedTabGroup, TimeBucket,
};

// ── Events and logging ──────────────────────────────────────────────
pub use crate::events::{
    CompositeEventHandler, EventHandler, EventObserver, LoggingHandler, NoopHandler, WrangleEvent,
};
pub use crate::logging::{CaptureLayer, LogBuffer};
