//! Exemption rules: which tabs the eviction engine must leave alone.
//!
//! Exemption is a pure function of the tab and the settings snapshot. Rules
//! are checked in priority order and the first match supplies the reason
//! shown in the UI:
//!
//! 1. global pause
//! 2. pinned
//! 3. explicitly locked
//! 4. URL contains an allow-list pattern

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::tab::TabInfo;

/// Why a tab is exempt from eviction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum ExemptionReason {
    Paused,
    Pinned,
    Locked,
    /// Carries the matching pattern so the UI can show which rule applied.
    AllowListed(String),
}

impl ExemptionReason {
    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::Pinned => "pinned",
            Self::Locked => "locked",
            Self::AllowListed(_) => "allow-listed",
        }
    }
}

impl fmt::Display for ExemptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllowListed(pattern) => write!(f, "allow-listed ({pattern})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Evaluate every rule for `tab`. `None` means the tab may be evicted.
pub fn exemption_for(tab: &TabInfo, settings: &Settings) -> Option<ExemptionReason> {
    if settings.paused {
        return Some(ExemptionReason::Paused);
    }
    if tab.pinned {
        return Some(ExemptionReason::Pinned);
    }
    if settings.is_locked(tab.id) {
        return Some(ExemptionReason::Locked);
    }
    allow_list_match(
        tab.url.as_deref(),
        &settings.allow_list,
        settings.allow_list_case_sensitive,
    )
    .map(|pattern| ExemptionReason::AllowListed(pattern.to_string()))
}

/// Whether any rule exempts `tab`.
pub fn is_exempt(tab: &TabInfo, settings: &Settings) -> bool {
    exemption_for(tab, settings).is_some()
}

/// First allow-list pattern contained in `url`.
///
/// A tab without a URL never matches. Blank patterns never match even if
/// they slipped past validation.
pub fn allow_list_match<'a>(
    url: Option<&str>,
    patterns: &'a [String],
    case_sensitive: bool,
) -> Option<&'a str> {
    let url = url?;
    if case_sensitive {
        patterns
            .iter()
            .find(|p| !p.trim().is_empty() && url.contains(p.as_str()))
            .map(String::as_str)
    } else {
        let url = url.to_lowercase();
        patterns
            .iter()
            .find(|p| !p.trim().is_empty() && url.contains(&p.to_lowercase()))
            .map(String::as_str)
    }
}
