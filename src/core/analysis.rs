//! Result of analysing a personal narrative.

use serde::{Deserialize, Serialize};

use super::finding::Finding;

/// Analysis of a user's story against known manipulation patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Main response text.
    pub content: String,
    /// Specific findings.
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Names of the patterns detected.
    #[serde(default)]
    pub patterns_detected: Vec<String>,
    /// Confidence in the analysis, within `0.0..=1.0`.
    #[serde(default)]
    pub confidence_score: Option<f32>,
}

impl AnalysisResult {
    /// Drops an out-of-range confidence score and deduplicates pattern names
    /// while keeping their first-seen order.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.confidence_score = self
            .confidence_score
            .filter(|c| c.is_finite() && (0.0..=1.0).contains(c));
        let mut seen = std::collections::HashSet::new();
        self.patterns_detected
            .retain(|p| seen.insert(p.trim().to_lowercase()));
        self
    }
}
