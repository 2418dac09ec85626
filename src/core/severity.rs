//! Severity level of an extracted finding.

use serde::{Deserialize, Serialize};

/// Severity of a finding, ordered from most to least severe.
///
/// Discriminants are inverted (`Danger = 0`, `Info = 2`) so that the
/// derived [`Ord`] sorts the most severe findings first.
/// [`meets_threshold`](FindingKind::meets_threshold) relies on this:
/// `(self as u8) <= (threshold as u8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    /// Serious red flag.
    Danger = 0,
    /// Concerning behaviour.
    Warning = 1,
    /// General observation.
    Info = 2,
}

impl FindingKind {
    /// Parses a severity string (case-insensitive). Returns `None` for
    /// anything other than `danger`, `warning`, or `info`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "danger" => Some(Self::Danger),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Returns `true` if this severity is at least as severe as `threshold`.
    #[must_use]
    pub const fn meets_threshold(self, threshold: Self) -> bool {
        (self as u8) <= (threshold as u8)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
