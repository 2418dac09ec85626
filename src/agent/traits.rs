//! Agent trait definition.
//!
//! The primary agent, the delegate agent and the story analyst implement
//! this trait, which gives the orchestrator one way to run any of them.

use async_trait::async_trait;

use super::agentic_loop::{LoopOutcome, agentic_loop};
use super::conversation::Conversation;
use super::executor::ToolExecutor;
use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from a single-shot agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a role with a fixed system prompt and model
/// configuration. Tool-using agents return their executor from
/// [`Agent::tools`] and are driven with [`converse`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature; `None` uses the model default.
    fn temperature(&self) -> Option<f32> {
        None
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tools available to this agent, if any.
    fn tools(&self) -> Option<&ToolExecutor> {
        None
    }

    /// Maximum tool-calling loop iterations before aborting.
    fn max_tool_iterations(&self) -> usize {
        10
    }

    /// Starts a conversation seeded with this agent's system prompt.
    fn start_conversation(&self) -> Conversation {
        Conversation::new(self.system_prompt())
    }

    /// Executes the agent once with the given user message (no tools).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut request = ChatRequest::new(self.model());
        request.messages = vec![system_message(self.system_prompt()), user_message(user_msg)];
        request.temperature = self.temperature();
        request.max_tokens = Some(self.max_tokens());
        request.json_mode = self.json_mode();

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Runs an agent over an existing conversation until it produces a text
/// answer.
///
/// The conversation must already end with the new user message. Every
/// message the loop produces is appended to it, including on failure.
///
/// # Errors
///
/// Returns [`AgentError`] on API failures, fatal tool errors, or if the
/// tool loop exceeds the agent's max iterations.
pub async fn converse(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    conversation: &mut Conversation,
) -> Result<LoopOutcome, AgentError> {
    let no_tools = ToolExecutor::new();
    let executor = agent.tools().unwrap_or(&no_tools);

    let mut request = ChatRequest::new(agent.model());
    request.messages = conversation.take();
    request.temperature = agent.temperature();
    request.max_tokens = Some(agent.max_tokens());
    request.json_mode = agent.json_mode();
    request.tools = executor.definitions();

    let result = agentic_loop(provider, &mut request, executor, agent.max_tool_iterations()).await;
    conversation.restore(request.messages);
    result
}
