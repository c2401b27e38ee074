//! Inactivity-based tab eviction with a searchable closed-tab archive.
//!
//! `tab-wrangler` closes ("wrangles") browser tabs that have sat idle longer
//! than a configurable time-to-live, unless they are pinned, explicitly
//! locked, match a URL allow-list, or the whole engine is paused. Every
//! closed tab goes into a bounded archive that can be searched by keyword,
//! grouped into time buckets, restored or discarded.
//!
//! The engine is a synchronous state machine. It never talks to a browser:
//! commands go out through the [`TabHost`] trait and notifications come in
//! as [`HostEvent`]s. Time comes from a [`Clock`], configuration from a
//! [`SettingsStore`] snapshot read fresh on every tick.
//!
//! # Getting started
//!
//! ```ignore
//! use std::time::Duration;
//! use tab_wrangler::prelude::*;
//!
//! let host = RecordingHost::new();
//! let settings = MemorySettingsStore::new(
//!     Settings::default()
//!         .with_inactivity_threshold(Duration::from_secs(60))
//!         .with_allow_list(&["cnn"]),
//! );
//! let clock = ManualClock::new(0);
//! let mut wrangler = Wrangler::new(host.clone(), settings, clock.clone())
//!     .with_event_handler(LoggingHandler);
//!
//! wrangler.on_tab_created(TabInfo::new(1).with_url("https://example.com"));
//! wrangler.on_tab_created(TabInfo::new(2).with_url("https://edition.cnn.com/x"));
//!
//! clock.advance(Duration::from_secs(120));
//! let report = wrangler.tick();
//! assert_eq!(report.evicted_ids(), vec![TabId(1)]);
//!
//! let hits = wrangler.search(&ArchiveQuery::keyword("example"));
//! assert_eq!(hits.len(), 1);
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tracker`] | Per-tab last-active timestamps and remaining time-to-live |
//! | [`exemption`] | Pause / pin / lock / allow-list rules |
//! | [`eviction`] | Choosing which expired tabs to close, respecting the floor |
//! | [`archive`] | Bounded closed-tab history, search, time buckets, persistence |
//! | [`wrangler`] | The [`Wrangler`] facade tying everything together |
//! | [`settings`] | Typed settings and the key/value store contract |
//! | [`runtime`] | [`SharedWrangler`](runtime::SharedWrangler) and the periodic [`Ticker`](runtime::Ticker) |
//! | [`events`] | Engine events and handlers |
//! | [`logging`] | In-memory capture of recent log lines |

pub mod archive;
pub mod clock;
pub mod error;
pub mod events;
pub mod eviction;
pub mod exemption;
pub mod host;
pub mod logging;
mod persist;
pub mod prelude;
pub mod runtime;
pub mod settings;
pub mod tab;
pub mod tracker;
pub mod wrangler;

pub use archive::{ArchiveQuery, ClosedTabArchive, ClosedTabEntry, TimeBucket};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use error::{Result, WrangleError};
pub use exemption::ExemptionReason;
pub use host::{HostEvent, RecordingHost, TabHost};
pub use settings::{Settings, SettingsStore};
pub use tab::{TabId, TabInfo, TabRecord};
pub use wrangler::Wrangler;
