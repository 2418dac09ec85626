//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached.

use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, TokenUsage, assistant_message, assistant_tool_calls_message, tool_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Result of a completed loop.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// Final assistant text.
    pub content: String,
    /// Usage summed over every model call in the loop.
    pub usage: TokenUsage,
    /// Names of the tools called, in call order.
    pub tool_calls: Vec<String>,
    /// Finish reason of the last model call.
    pub finish_reason: Option<String>,
}

impl LoopOutcome {
    /// Number of calls to the named tool.
    #[must_use]
    pub fn calls_to(&self, name: &str) -> usize {
        self.tool_calls.iter().filter(|n| *n == name).count()
    }
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// `request.messages` is mutated in place: assistant tool-call messages,
/// tool results, and the final assistant answer are all appended.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`. Propagates provider errors and fatal tool
/// errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_iterations: usize,
) -> Result<LoopOutcome, AgentError> {
    let mut outcome = LoopOutcome::default();

    for iteration in 0..max_iterations {
        let response = provider.chat(request).await?;
        outcome.usage.add(&response.usage);
        outcome.finish_reason.clone_from(&response.finish_reason);

        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            request.messages.push(assistant_message(&response.content));
            outcome.content = response.content;
            return Ok(outcome);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request.messages.push(assistant_tool_calls_message(
            &response.content,
            response.tool_calls.clone(),
        ));

        for call in &response.tool_calls {
            let result = executor.execute(call).await?;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            outcome.tool_calls.push(call.name.clone());
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}
