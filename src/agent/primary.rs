//! Primary (script reader) agent.
//!
//! Reads one chunk per turn inside a continuing conversation and delegates
//! actionable excerpts through the `analyze_pattern` tool.

use std::sync::Arc;

use super::agentic_loop::LoopOutcome;
use super::config::AgentConfig;
use super::conversation::Conversation;
use super::executor::ToolExecutor;
use super::provider::LlmProvider;
use super::tools::DelegationTool;
use super::tools::delegation::DELEGATION_TOOL_NAME;
use super::traits::{Agent, converse};
use crate::error::AgentError;

/// Outcome of one primary agent turn.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    /// Loop outcome (answer, usage and tools called).
    pub loop_outcome: LoopOutcome,
    /// Delegations issued during this turn.
    pub delegations: usize,
}

/// Agent that reads the document chunk by chunk.
pub struct PrimaryAgent {
    model: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
    delegation: Arc<DelegationTool>,
    executor: ToolExecutor,
}

impl PrimaryAgent {
    /// Creates a primary agent holding one delegation tool.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: &str, delegation: Arc<DelegationTool>) -> Self {
        let executor = ToolExecutor::new().with_tool(delegation.clone());
        Self {
            model: config.primary_model.clone(),
            max_tokens: config.primary_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt: system_prompt.to_string(),
            delegation,
            executor,
        }
    }

    /// Runs one turn: appends `message` to the conversation and drives the
    /// tool loop until the agent answers.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, fatal delegate failures, or
    /// tool loop overruns.
    pub async fn turn(
        &self,
        provider: &dyn LlmProvider,
        conversation: &mut Conversation,
        message: &str,
    ) -> Result<TurnOutcome, AgentError> {
        conversation.push_user(message);
        let loop_outcome = converse(self, provider, conversation).await?;
        let delegations = loop_outcome.calls_to(DELEGATION_TOOL_NAME);
        Ok(TurnOutcome {
            loop_outcome,
            delegations,
        })
    }

    /// Tokens spent inside delegations so far.
    #[must_use]
    pub fn delegated_tokens(&self) -> u64 {
        self.delegation.tokens()
    }
}

impl Agent for PrimaryAgent {
    fn name(&self) -> &'static str {
        "primary"
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

impl std::fmt::Debug for PrimaryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryAgent")
            .field("model", &self.model)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
