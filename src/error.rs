//! Error types for script-lens.
//!
//! Each layer owns a `thiserror` enum; [`Error`] unifies them for the CLI.
//! [`AgentError::is_fatal`] decides which failures unwind a pipeline run and
//! which are fed back to the model as tool output.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent, provider, or orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Document source failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Chunker misuse.
    #[error(transparent)]
    Chunking(#[from] ChunkingError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure outside the storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by agents, providers, tools, and the orchestrator.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was supplied by the credential provider.
    #[error("no API key set (use --api-key, SCRIPT_LENS_API_KEY or OPENAI_API_KEY)")]
    ApiKeyMissing,

    /// The supplied API key is malformed.
    #[error("invalid API key: {reason}")]
    InvalidApiKey {
        /// Why the key was rejected.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Caller input rejected before any model call.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem.
        message: String,
    },

    /// Unknown provider name in configuration.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The model API rejected or failed the request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The model response could not be parsed.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Parse error description.
        message: String,
        /// Raw response content.
        content: String,
    },

    /// A tool call failed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The model kept requesting tools past the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured limit.
        max_iterations: usize,
    },

    /// The document could not be fetched.
    #[error("document fetch failed: {0}")]
    DocumentFetch(#[from] SourceError),

    /// A primary agent turn failed and the run was aborted.
    #[error("turn {turn} failed: {source}")]
    TurnFailed {
        /// Zero-based chunk index of the failed turn.
        turn: usize,
        /// Underlying failure.
        source: Box<AgentError>,
    },

    /// Orchestration-level failure.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure description.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` for failures that must abort a pipeline run.
    ///
    /// Configuration, credential, fetch, and model API errors are fatal.
    /// Tool failures, parse failures, and nested tool-loop overruns are not;
    /// they are reported back to the calling model as text.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ApiKeyMissing
                | Self::InvalidApiKey { .. }
                | Self::InvalidConfig { .. }
                | Self::InvalidInput { .. }
                | Self::UnsupportedProvider { .. }
                | Self::ApiRequest { .. }
                | Self::DocumentFetch(_)
                | Self::TurnFailed { .. }
        )
    }

    /// Shorthand for a [`AgentError::ToolExecution`] error.
    pub fn tool(name: &str, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Errors from the finding and typology stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON (de)serialization of a stored column failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// A record failed validation before being written.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Filesystem failure while opening or importing.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Errors from document sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The locator is not acceptable to this source.
    #[error("invalid document locator '{locator}': {reason}")]
    InvalidLocator {
        /// Rejected locator.
        locator: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Transport-level failure.
    #[error("request to {url} failed: {message}")]
    Request {
        /// Requested URL.
        url: String,
        /// Transport error message.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("{url}: HTTP {status}")]
    Http {
        /// Requested URL.
        url: String,
        /// Status code.
        status: u16,
    },

    /// Script search was given a blank title.
    #[error("search query cannot be empty")]
    EmptyQuery,

    /// Script search matched nothing.
    #[error("no scripts found for '{query}'")]
    NoResults {
        /// Title searched for.
        query: String,
    },

    /// Search results page could not be parsed.
    #[error("failed to parse search results: {0}")]
    Parse(String),

    /// Local file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Errors from the chunker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Chunk size must be positive.
    #[error("chunk size must be greater than zero")]
    ZeroSize,
}

/// Errors specific to CLI command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command failed for a reason described in the message.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AgentError::ApiKeyMissing.is_fatal());
        assert!(
            AgentError::ApiRequest {
                message: "quota".to_string(),
                status: Some(429),
            }
            .is_fatal()
        );
        assert!(!AgentError::tool("save_finding", "store offline").is_fatal());
        assert!(!AgentError::ToolLoopExceeded { max_iterations: 3 }.is_fatal());
    }

    #[test]
    fn test_turn_failed_display() {
        let err = AgentError::TurnFailed {
            turn: 4,
            source: Box::new(AgentError::ApiRequest {
                message: "boom".to_string(),
                status: None,
            }),
        };
        assert_eq!(err.to_string(), "turn 4 failed: API request failed: boom");
    }

    #[test]
    fn test_source_error_wraps_into_agent_error() {
        let err: AgentError = SourceError::Http {
            url: "https://example.com".to_string(),
            status: 404,
        }
        .into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("HTTP 404"));
    }
}
