//! Agent pipeline for script analysis.
//!
//! A primary agent reads a script chunk by chunk inside one continuing
//! conversation and delegates excerpts that show manipulation patterns to a
//! delegate agent, which classifies them against the typology catalogue and
//! persists findings.
//!
//! # Architecture
//!
//! ```text
//! analyze(url) → Orchestrator
//!   ├── CredentialProvider → ApiKey → ProviderFactory → LlmProvider
//!   ├── DocumentSource::fetch → Document → chunk_text
//!   └── for each chunk, until exhausted or capped:
//!       PrimaryAgent::turn (Conversation grows)
//!         └── analyze_pattern → DelegationTool → DelegateAgent (fresh conversation)
//!               ├── list_typologies / get_typology → TypologyStore
//!               └── save_finding → FindingStore (SaveOutcome, never raises)
//! ```

pub mod agentic_loop;
pub mod client;
pub mod config;
pub mod conversation;
pub mod delegate;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod primary;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod run;
pub mod story;
pub mod tool;
pub mod tools;
pub mod traits;

// Re-export key types
pub use agentic_loop::LoopOutcome;
pub use client::{DefaultProviderFactory, ProviderFactory, create_provider};
pub use config::AgentConfig;
pub use conversation::Conversation;
pub use delegate::DelegateAgent;
pub use executor::ToolExecutor;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use primary::{PrimaryAgent, TurnOutcome};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use run::{DONE_SENTINEL, PipelineRun, RunReport, RunState, RunStatus};
pub use story::StoryAnalyst;
pub use tool::{Tool, ToolCall, ToolDefinition, ToolResult};
pub use tools::{DelegationTool, SaveOutcome};
pub use traits::{Agent, AgentResponse, converse};
