//! Findings extracted from script text.

use serde::{Deserialize, Serialize};

use super::severity::FindingKind;

/// Maximum title length in characters; longer titles are truncated.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum description length in characters; longer descriptions are truncated.
pub const MAX_DESCRIPTION_LEN: usize = 5_000;

/// A structured unit of extracted insight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Severity of the finding.
    #[serde(rename = "type", alias = "kind")]
    pub kind: FindingKind,
    /// Short title.
    pub title: String,
    /// Detailed explanation.
    pub description: String,
    /// Name of the matched typology, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

impl Finding {
    /// Creates a finding without a matched pattern.
    pub fn new(kind: FindingKind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: description.into(),
            matched_pattern: None,
        }
    }

    /// Sets the matched typology name.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.matched_pattern = Some(pattern.into());
        self
    }

    /// Trims whitespace, truncates oversized fields, and rejects empty ones.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the title or description is
    /// empty after trimming.
    pub fn normalized(self) -> Result<Self, String> {
        let title = truncate_chars(self.title.trim(), MAX_TITLE_LEN);
        let description = truncate_chars(self.description.trim(), MAX_DESCRIPTION_LEN);
        if title.is_empty() {
            return Err("finding title is empty".to_string());
        }
        if description.is_empty() {
            return Err("finding description is empty".to_string());
        }
        let matched_pattern = self
            .matched_pattern
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Ok(Self {
            kind: self.kind,
            title,
            description,
            matched_pattern,
        })
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// A finding as persisted by a finding store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFinding {
    /// Store-assigned identifier.
    pub id: i64,
    /// Caller the finding is attributed to.
    pub caller_key: String,
    /// Document the finding was mined from.
    pub source: String,
    /// The finding itself.
    #[serde(flatten)]
    pub finding: Finding,
    /// Creation timestamp as reported by the store.
    pub created_at: String,
}

/// Query filter for listing stored findings.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    /// Restrict to one caller.
    pub caller_key: Option<String>,
    /// Restrict to one source document.
    pub source: Option<String>,
    /// Minimum severity.
    pub min_kind: Option<FindingKind>,
    /// Maximum rows to return (0 = unlimited).
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_deserialization_uses_type_key() {
        let json = r#"{
            "type": "danger",
            "title": "Isolation",
            "description": "Cuts her off from friends",
            "matched_pattern": "The Isolator"
        }"#;
        let finding: Finding = serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        assert_eq!(finding.kind, FindingKind::Danger);
        assert_eq!(finding.matched_pattern.as_deref(), Some("The Isolator"));
    }

    #[test]
    fn test_finding_serialization_omits_empty_pattern() {
        let finding = Finding::new(FindingKind::Info, "t", "d");
        let json = serde_json::to_string(&finding).unwrap_or_default();
        assert!(json.contains("\"type\":\"info\""));
        assert!(!json.contains("matched_pattern"));
    }

    #[test]
    fn test_normalized_truncates_and_trims() {
        let finding = Finding::new(FindingKind::Warning, "  title  ", "x".repeat(6_000))
            .with_pattern("   ");
        let normalized = finding.normalized().unwrap_or_else(|_| unreachable!());
        assert_eq!(normalized.title, "title");
        assert_eq!(normalized.description.len(), MAX_DESCRIPTION_LEN);
        assert!(normalized.matched_pattern.is_none());
    }

    #[test]
    fn test_normalized_rejects_empty_title() {
        let finding = Finding::new(FindingKind::Warning, " ", "desc");
        assert!(finding.normalized().is_err());
    }
}
