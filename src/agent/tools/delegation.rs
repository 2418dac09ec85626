//! Delegation tool: the delegate agent exposed as a primary-agent tool.
//!
//! This is the only nesting level. The delegate's own tool set has no
//! delegation tool, so delegation cannot recurse.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::agent::delegate::DelegateAgent;
use crate::agent::provider::LlmProvider;
use crate::agent::tool::{Tool, ToolDefinition, parse_args};
use crate::error::AgentError;

/// Tool name advertised to the primary agent.
pub const DELEGATION_TOOL_NAME: &str = "analyze_pattern";

#[derive(Deserialize)]
struct DelegationArgs {
    instruction: String,
    #[serde(default)]
    context: String,
}

/// Adapter that runs a [`DelegateAgent`] as a tool call.
pub struct DelegationTool {
    delegate: Arc<DelegateAgent>,
    provider: Arc<dyn LlmProvider>,
    invocations: AtomicUsize,
    tokens: AtomicU64,
}

impl DelegationTool {
    /// Wraps a delegate and the provider it runs against.
    #[must_use]
    pub fn new(delegate: Arc<DelegateAgent>, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            delegate,
            provider,
            invocations: AtomicUsize::new(0),
            tokens: AtomicU64::new(0),
        }
    }

    /// Number of delegations started so far.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Tokens consumed by completed delegations.
    #[must_use]
    pub fn tokens(&self) -> u64 {
        self.tokens.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Tool for DelegationTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: DELEGATION_TOOL_NAME.to_string(),
            description: "Hand an excerpt showing a possible manipulation pattern to the \
                          pattern analyst, which classifies it and stores findings. Returns \
                          the analyst's summary."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "instruction": {
                        "type": "string",
                        "description": "What to classify, naming the characters involved."
                    },
                    "context": {
                        "type": "string",
                        "description": "The script lines that show the behaviour."
                    }
                },
                "required": ["instruction", "context"],
                "additionalProperties": false
            }),
        }
    }

    async fn invoke(&self, arguments: &str) -> Result<String, AgentError> {
        let args: DelegationArgs = parse_args(DELEGATION_TOOL_NAME, arguments)?;
        if args.instruction.trim().is_empty() {
            return Err(AgentError::tool(DELEGATION_TOOL_NAME, "instruction is empty"));
        }

        let n = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(delegation = n, "delegating to pattern analyst");

        match self
            .delegate
            .analyze(self.provider.as_ref(), &args.instruction, &args.context)
            .await
        {
            Ok(outcome) => {
                self.tokens
                    .fetch_add(u64::from(outcome.usage.total_tokens), Ordering::Relaxed);
                if outcome.content.trim().is_empty() {
                    Ok("The analyst finished without a summary.".to_string())
                } else {
                    Ok(outcome.content)
                }
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "delegate failed softly");
                Ok(format!("The analyst could not complete this delegation: {e}"))
            }
        }
    }
}

impl std::fmt::Debug for DelegationTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationTool")
            .field("provider", &self.provider.name())
            .field("invocations", &self.invocations())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::config::AgentConfig;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::tool::ToolCall;
    use crate::credentials::CallerKey;
    use crate::storage::SqliteStorage;

    /// Keeps requesting tools forever, or fails every call.
    struct BadProvider {
        fatal: bool,
    }

    #[async_trait]
    impl LlmProvider for BadProvider {
        fn name(&self) -> &'static str {
            "bad"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if self.fatal {
                return Err(AgentError::ApiRequest {
                    message: "quota exceeded".to_string(),
                    status: Some(429),
                });
            }
            Ok(ChatResponse {
                content: String::new(),
                usage: TokenUsage::default(),
                tool_calls: vec![ToolCall {
                    id: "c".to_string(),
                    name: "list_typologies".to_string(),
                    arguments: "{}".to_string(),
                }],
                finish_reason: None,
            })
        }
    }

    fn tool(fatal: bool) -> DelegationTool {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!()));
        let config = AgentConfig::builder()
            .max_tool_iterations(2)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let delegate = DelegateAgent::new(
            &config,
            "analyst",
            storage.clone(),
            storage,
            CallerKey::new("c"),
            "x",
        );
        DelegationTool::new(Arc::new(delegate), Arc::new(BadProvider { fatal }))
    }

    const ARGS: &str = r#"{"instruction":"classify","context":"HE: stay home"}"#;

    #[tokio::test]
    async fn test_soft_failure_becomes_narrative() {
        let out = tool(false)
            .invoke(ARGS)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(out.contains("could not complete"));
    }

    #[tokio::test]
    async fn test_fatal_failure_propagates() {
        let tool = tool(true);
        let result = tool.invoke(ARGS).await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
        assert_eq!(tool.invocations(), 1);
    }

    #[tokio::test]
    async fn test_empty_instruction_rejected() {
        let result = tool(false)
            .invoke(r#"{"instruction":"  ","context":"x"}"#)
            .await;
        assert!(matches!(result, Err(AgentError::ToolExecution { .. })));
    }
}
