//! Output rendering for CLI commands.
//!
//! Every command returns a `String`; these helpers turn domain values into
//! either human-readable text or pretty JSON.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::RunReport;
use crate::core::{AnalysisResult, StoredFinding, Typology};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, falling back to [`OutputFormat::Text`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes a value as pretty JSON with a trailing newline.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
        out.push('\n');
        out
    }
}

/// Renders a pipeline run report.
///
/// The first line is always the sentinel so scripts can match on it.
#[must_use]
pub fn format_run_report(report: &RunReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(report),
        OutputFormat::Text => {
            let mut out = format!("{}\n", report.sentinel());
            let _ = writeln!(
                out,
                "---\nSource: {} | Status: {} | Turns: {} | Chunks: {}/{} read | Delegations: {} | Tokens: {} | Time: {:.1}s",
                report.source,
                report.status,
                report.turns,
                report.chunks_total - report.chunks_skipped,
                report.chunks_total,
                report.delegations,
                report.total_tokens,
                report.elapsed.as_secs_f64()
            );
            if report.is_partial() {
                let _ = writeln!(
                    out,
                    "Note: turn cap reached, {} chunk(s) were not analyzed",
                    report.chunks_skipped
                );
            }
            out
        }
    }
}

/// Renders a story analysis.
#[must_use]
pub fn format_analysis(result: &AnalysisResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(result),
        OutputFormat::Text => {
            let mut out = result.content.trim_end().to_string();
            out.push('\n');
            if !result.findings.is_empty() {
                out.push_str("\nFindings:\n");
                for finding in &result.findings {
                    let _ = writeln!(out, "  [{}] {}", finding.kind, finding.title);
                    let _ = writeln!(out, "      {}", finding.description);
                }
            }
            if !result.patterns_detected.is_empty() {
                let _ = writeln!(
                    out,
                    "\nPatterns: {}",
                    result.patterns_detected.join(", ")
                );
            }
            if let Some(score) = result.confidence_score {
                let _ = writeln!(out, "Confidence: {:.0}%", score * 100.0);
            }
            out
        }
    }
}

/// Renders a list of stored findings.
#[must_use]
pub fn format_findings(findings: &[StoredFinding], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(findings),
        OutputFormat::Text => {
            if findings.is_empty() {
                return "No findings.\n".to_string();
            }
            let mut out = format!(
                "{:<6} {:<8} {:<40} {}\n",
                "ID", "Type", "Title", "Source"
            );
            out.push_str(&"-".repeat(80));
            out.push('\n');
            for stored in findings {
                let _ = writeln!(
                    out,
                    "{:<6} {:<8} {:<40} {}",
                    stored.id,
                    stored.finding.kind,
                    truncate_str(&stored.finding.title, 40),
                    stored.source
                );
            }
            out
        }
    }
}

/// Renders one stored finding in full.
#[must_use]
pub fn format_finding(stored: &StoredFinding, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(stored),
        OutputFormat::Text => {
            let finding = &stored.finding;
            let mut out = format!("Finding #{}\n", stored.id);
            let _ = writeln!(out, "Type:        {}", finding.kind);
            let _ = writeln!(out, "Title:       {}", finding.title);
            if let Some(pattern) = &finding.matched_pattern {
                let _ = writeln!(out, "Pattern:     {pattern}");
            }
            let _ = writeln!(out, "Source:      {}", stored.source);
            let _ = writeln!(out, "Created:     {}", stored.created_at);
            let _ = writeln!(out, "\n{}", finding.description);
            out
        }
    }
}

/// Renders the typology catalogue as a name list.
#[must_use]
pub fn format_typology_list(typologies: &[Typology], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let names: Vec<&str> = typologies.iter().map(|t| t.name.as_str()).collect();
            format.to_json(&names)
        }
        OutputFormat::Text => {
            if typologies.is_empty() {
                return "No typologies. Import some with `script-lens typologies import`.\n"
                    .to_string();
            }
            let mut out = String::new();
            for typology in typologies {
                let _ = writeln!(out, "{}", typology.name);
            }
            out
        }
    }
}

/// Renders script search hits, one URL per line.
#[must_use]
pub fn format_search_results(urls: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(urls),
        OutputFormat::Text => {
            let mut out = String::new();
            for url in urls {
                let _ = writeln!(out, "{url}");
            }
            out
        }
    }
}

/// Renders one typology in full.
#[must_use]
pub fn format_typology(typology: &Typology, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(typology),
        OutputFormat::Text => {
            let mut out = format!("{}\n\n{}\n", typology.name, typology.description);
            for (label, items) in [
                ("Core tactics", &typology.core_tactics),
                ("Red flags", &typology.red_flags),
                ("Healthy opposites", &typology.opposites),
                ("Examples", &typology.examples),
            ] {
                if items.is_empty() {
                    continue;
                }
                let _ = writeln!(out, "\n{label}:");
                for item in items {
                    let _ = writeln!(out, "  - {item}");
                }
            }
            if let Some(url) = &typology.reference_url {
                let _ = writeln!(out, "\nReference: {url}");
            }
            out
        }
    }
}

/// Truncates to `max_chars` characters, ending with `...` when cut.
fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
