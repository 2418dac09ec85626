//! Personal story analysis.
//!
//! Compares a person's account of a relationship against the typology
//! catalogue and the findings already mined from scripts. The model is asked
//! for JSON; if it answers in prose instead, findings are recovered with a
//! keyword heuristic over the typology names it mentions.

use super::config::AgentConfig;
use super::prompt::build_story_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::{AnalysisResult, Finding, FindingKind, StoredFinding, Typology};
use crate::error::AgentError;

/// Maximum story length in bytes.
pub const MAX_STORY_LEN: usize = 20_000;

const DANGER_WORDS: [&str; 4] = ["dangerous", "serious", "urgent", "abuse"];
const WARNING_WORDS: [&str; 3] = ["concerning", "warning", "red flag"];

/// Single-shot JSON agent for story analysis.
#[derive(Debug, Clone)]
pub struct StoryAnalyst {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl StoryAnalyst {
    /// Creates the analyst from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: &str) -> Self {
        Self {
            model: config.delegate_model.clone(),
            max_tokens: config.delegate_max_tokens,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Analyzes a story.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidInput`] for an empty or oversized story
    /// and [`AgentError`] on API failures.
    pub async fn analyze(
        &self,
        provider: &dyn LlmProvider,
        story: &str,
        typologies: &[Typology],
        findings: &[StoredFinding],
    ) -> Result<AnalysisResult, AgentError> {
        let story = validate_story(story)?;
        let message = build_story_prompt(story, typologies, findings);
        let response = self.execute(provider, &message).await?;
        Ok(parse_analysis(&response.content, typologies))
    }
}

impl Agent for StoryAnalyst {
    fn name(&self) -> &'static str {
        "story"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Trims a story and checks its size.
///
/// # Errors
///
/// Returns [`AgentError::InvalidInput`] if the story is blank or longer
/// than [`MAX_STORY_LEN`] bytes.
pub fn validate_story(story: &str) -> Result<&str, AgentError> {
    let trimmed = story.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidInput {
            message: "story cannot be empty".to_string(),
        });
    }
    if trimmed.len() > MAX_STORY_LEN {
        return Err(AgentError::InvalidInput {
            message: format!(
                "story exceeds maximum length ({} bytes, max {MAX_STORY_LEN})",
                trimmed.len()
            ),
        });
    }
    Ok(trimmed)
}

/// Parses a model answer into an [`AnalysisResult`].
///
/// Accepts bare JSON or JSON inside a markdown code block. Anything else is
/// treated as prose and scanned with [`heuristic_findings`].
#[must_use]
pub fn parse_analysis(content: &str, typologies: &[Typology]) -> AnalysisResult {
    let trimmed = content.trim();

    // Handle markdown code blocks
    let json_str = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    match serde_json::from_str::<AnalysisResult>(json_str) {
        Ok(mut result) => {
            result.findings = result
                .findings
                .into_iter()
                .filter_map(|f| f.normalized().ok())
                .collect();
            result.sanitized()
        }
        Err(e) => {
            tracing::debug!(error = %e, "story answer is not JSON, using keyword heuristic");
            let (findings, patterns_detected) = heuristic_findings(trimmed, typologies);
            AnalysisResult {
                content: trimmed.to_string(),
                findings,
                patterns_detected,
                confidence_score: None,
            }
        }
    }
}

/// Severity implied by the words in a prose answer.
#[must_use]
pub fn heuristic_kind(text: &str) -> FindingKind {
    let lower = text.to_lowercase();
    if DANGER_WORDS.iter().any(|w| lower.contains(w)) {
        FindingKind::Danger
    } else if WARNING_WORDS.iter().any(|w| lower.contains(w)) {
        FindingKind::Warning
    } else {
        FindingKind::Info
    }
}

/// One finding per typology named in `text`, all at the heuristic severity.
#[must_use]
pub fn heuristic_findings(text: &str, typologies: &[Typology]) -> (Vec<Finding>, Vec<String>) {
    let lower = text.to_lowercase();
    let kind = heuristic_kind(text);

    typologies
        .iter()
        .filter(|t| !t.name.trim().is_empty() && lower.contains(&t.name.to_lowercase()))
        .map(|t| {
            let finding = Finding::new(
                kind,
                format!("Pattern detected: {}", t.name),
                "This behaviour matches known manipulation tactics.",
            )
            .with_pattern(t.name.clone());
            (finding, t.name.clone())
        })
        .unzip()
}
