//! Manipulation pattern typology.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// One category of interpersonal manipulation pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typology {
    /// Pattern name (e.g. "Mr. Always Right").
    #[serde(alias = "player_type")]
    pub name: String,
    /// Detailed description.
    pub description: String,
    /// Main tactics used.
    #[serde(default)]
    pub core_tactics: Vec<String>,
    /// Warning signs.
    #[serde(default)]
    pub red_flags: Vec<String>,
    /// Contrasting healthy behaviours.
    #[serde(default)]
    pub opposites: Vec<String>,
    /// Illustrative scenarios.
    #[serde(default)]
    pub examples: Vec<String>,
    /// Link to the original catalogue entry.
    #[serde(default, alias = "notion_url", skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
}

impl Typology {
    /// Renders the typology as a compact text block for prompts.
    #[must_use]
    pub fn to_prompt_block(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Pattern: {}", self.name);
        let _ = writeln!(out, "Description: {}", self.description);
        if !self.core_tactics.is_empty() {
            let _ = writeln!(out, "Tactics: {}", self.core_tactics.join("; "));
        }
        if !self.red_flags.is_empty() {
            let _ = writeln!(out, "Red Flags: {}", self.red_flags.join("; "));
        }
        out.push_str("---\n");
        out
    }
}
