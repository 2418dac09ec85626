//! Delegate (pattern analyst) agent.
//!
//! Classifies one excerpt against the typology catalogue and persists
//! findings. Each delegation runs in a fresh conversation.

use std::sync::Arc;

use tracing::debug;

use super::agentic_loop::LoopOutcome;
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::prompt::build_delegate_prompt;
use super::provider::LlmProvider;
use super::tools::{GetTypologyTool, ListTypologiesTool, SaveFindingTool};
use super::traits::{Agent, converse};
use crate::credentials::CallerKey;
use crate::error::AgentError;
use crate::storage::{FindingStore, TypologyStore};

/// Agent that classifies excerpts and saves findings.
pub struct DelegateAgent {
    model: String,
    system_prompt: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    executor: ToolExecutor,
}

impl DelegateAgent {
    /// Creates a delegate whose findings are attributed to `caller` and
    /// `source`.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        system_prompt: &str,
        findings: Arc<dyn FindingStore>,
        typologies: Arc<dyn TypologyStore>,
        caller: CallerKey,
        source: &str,
    ) -> Self {
        let executor = ToolExecutor::new()
            .with_tool(Arc::new(ListTypologiesTool::new(typologies.clone())))
            .with_tool(Arc::new(GetTypologyTool::new(typologies)))
            .with_tool(Arc::new(SaveFindingTool::new(findings, caller, source)));

        Self {
            model: config.delegate_model.clone(),
            system_prompt: system_prompt.to_string(),
            max_tokens: config.delegate_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            executor,
        }
    }

    /// Runs one delegation to completion.
    ///
    /// Store failures come back inside the answer text; only provider and
    /// tool-loop failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or tool loop overruns.
    pub async fn analyze(
        &self,
        provider: &dyn LlmProvider,
        instruction: &str,
        context: &str,
    ) -> Result<LoopOutcome, AgentError> {
        let mut conversation = self.start_conversation();
        conversation.push_user(&build_delegate_prompt(instruction, context));

        let outcome = converse(self, provider, &mut conversation).await?;
        debug!(
            saves = outcome.calls_to("save_finding"),
            tokens = outcome.usage.total_tokens,
            "delegate finished"
        );
        Ok(outcome)
    }
}

impl Agent for DelegateAgent {
    fn name(&self) -> &'static str {
        "delegate"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Option<&ToolExecutor> {
        Some(&self.executor)
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

impl std::fmt::Debug for DelegateAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateAgent")
            .field("model", &self.model)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
