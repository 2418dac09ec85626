//! Tool executor that dispatches tool calls to registered [`Tool`]s.

use std::sync::Arc;

use tracing::debug;

use super::tool::{Tool, ToolCall, ToolDefinition, ToolResult};
use crate::error::AgentError;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Dispatches tool calls by name.
#[derive(Clone, Default)]
pub struct ToolExecutor {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolExecutor {
    /// Creates an executor with no tools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Definitions of every registered tool, in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Executes one tool call.
    ///
    /// Oversized payloads, unknown tools and non-fatal tool failures are
    /// returned as `is_error` results so the model can react to them.
    ///
    /// # Errors
    ///
    /// Propagates fatal errors (see [`AgentError::is_fatal`]) raised by a tool.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, AgentError> {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Ok(error_result(
                call,
                format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            ));
        }

        let Some(tool) = self.tools.iter().find(|t| t.definition().name == call.name) else {
            return Ok(error_result(
                call,
                AgentError::tool(&call.name, "unknown tool").to_string(),
            ));
        };

        match tool.invoke(&call.arguments).await {
            Ok(content) => Ok(ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            }),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                debug!(tool = call.name, error = %e, "tool returned error");
                Ok(error_result(call, e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.tools.iter().map(|t| t.definition().name).collect();
        f.debug_struct("ToolExecutor").field("tools", &names).finish()
    }
}

fn error_result(call: &ToolCall, content: String) -> ToolResult {
    ToolResult {
        tool_call_id: call.id.clone(),
        content,
        is_error: true,
    }
}
