//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The API key is not part of the configuration; it is resolved per run from a
//! [`CredentialProvider`](crate::credentials::CredentialProvider).

use std::path::PathBuf;

use crate::chunking::DEFAULT_CHUNK_SIZE;
use crate::credentials::DEFAULT_KEY_PREFIX;
use crate::error::AgentError;

/// Default model for both agents.
const DEFAULT_MODEL: &str = "gpt-5-nano";
/// Default primary agent max tokens.
const DEFAULT_PRIMARY_MAX_TOKENS: u32 = 4096;
/// Default delegate agent max tokens.
const DEFAULT_DELEGATE_MAX_TOKENS: u32 = 4096;
/// Default retries performed by the provider client.
const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Default turn cap per pipeline run.
pub const DEFAULT_TURN_CAP: usize = 10;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the primary (chunk-reading) agent.
    pub primary_model: String,
    /// Model for the delegate (pattern analyst) agent and story analysis.
    pub delegate_model: String,
    /// Maximum tokens for primary agent responses.
    pub primary_max_tokens: u32,
    /// Maximum tokens for delegate responses.
    pub delegate_max_tokens: u32,
    /// Maximum retry attempts per model request.
    pub max_retries: u32,
    /// Maximum tool-calling loop iterations per agent invocation.
    pub max_tool_iterations: usize,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Maximum primary agent turns per run.
    pub turn_cap: usize,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
    /// Required API key prefix. `None` disables the check.
    pub key_prefix: Option<String>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] for zero chunk size or turn cap.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: None,
            primary_model: DEFAULT_MODEL.to_string(),
            delegate_model: DEFAULT_MODEL.to_string(),
            primary_max_tokens: DEFAULT_PRIMARY_MAX_TOKENS,
            delegate_max_tokens: DEFAULT_DELEGATE_MAX_TOKENS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            turn_cap: DEFAULT_TURN_CAP,
            prompt_dir: None,
            key_prefix: Some(DEFAULT_KEY_PREFIX.to_string()),
        }
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    base_url: Option<String>,
    primary_model: Option<String>,
    delegate_model: Option<String>,
    primary_max_tokens: Option<u32>,
    delegate_max_tokens: Option<u32>,
    max_retries: Option<u32>,
    max_tool_iterations: Option<usize>,
    chunk_size: Option<usize>,
    turn_cap: Option<usize>,
    prompt_dir: Option<PathBuf>,
    key_prefix: Option<Option<String>>,
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("SCRIPT_LENS_PROVIDER").ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("SCRIPT_LENS_BASE_URL"))
                .ok();
        }
        if self.primary_model.is_none() {
            self.primary_model = std::env::var("SCRIPT_LENS_PRIMARY_MODEL").ok();
        }
        if self.delegate_model.is_none() {
            self.delegate_model = std::env::var("SCRIPT_LENS_DELEGATE_MODEL").ok();
        }
        if self.max_retries.is_none() {
            self.max_retries = env_parse("SCRIPT_LENS_MAX_RETRIES");
        }
        if self.max_tool_iterations.is_none() {
            self.max_tool_iterations = env_parse("SCRIPT_LENS_MAX_TOOL_ITERATIONS");
        }
        if self.chunk_size.is_none() {
            self.chunk_size = env_parse("SCRIPT_LENS_CHUNK_SIZE");
        }
        if self.turn_cap.is_none() {
            self.turn_cap = env_parse("SCRIPT_LENS_TURN_CAP");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("SCRIPT_LENS_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        if self.key_prefix.is_none()
            && let Ok(prefix) = std::env::var("SCRIPT_LENS_KEY_PREFIX")
        {
            self.key_prefix = Some(Some(prefix).filter(|p| !p.is_empty()));
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the primary agent model.
    #[must_use]
    pub fn primary_model(mut self, model: impl Into<String>) -> Self {
        self.primary_model = Some(model.into());
        self
    }

    /// Sets the delegate agent model.
    #[must_use]
    pub fn delegate_model(mut self, model: impl Into<String>) -> Self {
        self.delegate_model = Some(model.into());
        self
    }

    /// Sets the primary agent max tokens.
    #[must_use]
    pub const fn primary_max_tokens(mut self, n: u32) -> Self {
        self.primary_max_tokens = Some(n);
        self
    }

    /// Sets the delegate agent max tokens.
    #[must_use]
    pub const fn delegate_max_tokens(mut self, n: u32) -> Self {
        self.delegate_max_tokens = Some(n);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the chunk size in characters.
    #[must_use]
    pub const fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    /// Sets the turn cap.
    #[must_use]
    pub const fn turn_cap(mut self, n: usize) -> Self {
        self.turn_cap = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the required API key prefix; `None` disables the check.
    #[must_use]
    pub fn key_prefix(mut self, prefix: Option<&str>) -> Self {
        self.key_prefix = Some(prefix.map(str::to_string));
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if the chunk size, turn cap, or
    /// tool iteration limit is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let defaults = AgentConfig::default();
        let config = AgentConfig {
            provider: self.provider.unwrap_or(defaults.provider),
            base_url: self.base_url,
            primary_model: self.primary_model.unwrap_or(defaults.primary_model),
            delegate_model: self.delegate_model.unwrap_or(defaults.delegate_model),
            primary_max_tokens: self
                .primary_max_tokens
                .unwrap_or(defaults.primary_max_tokens),
            delegate_max_tokens: self
                .delegate_max_tokens
                .unwrap_or(defaults.delegate_max_tokens),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(defaults.max_tool_iterations),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            turn_cap: self.turn_cap.unwrap_or(defaults.turn_cap),
            prompt_dir: self.prompt_dir,
            key_prefix: self.key_prefix.unwrap_or(defaults.key_prefix),
        };

        for (name, value) in [
            ("chunk_size", config.chunk_size),
            ("turn_cap", config.turn_cap),
            ("max_tool_iterations", config.max_tool_iterations),
        ] {
            if value == 0 {
                return Err(AgentError::InvalidConfig {
                    message: format!("{name} must be greater than zero"),
                });
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.primary_model, "gpt-5-nano");
        assert_eq!(config.delegate_model, "gpt-5-nano");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.turn_cap, 10);
        assert_eq!(config.key_prefix.as_deref(), Some("sk-"));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .provider("custom")
            .primary_model("gpt-4o-mini")
            .chunk_size(100)
            .turn_cap(3)
            .key_prefix(None)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.primary_model, "gpt-4o-mini");
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.turn_cap, 3);
        assert!(config.key_prefix.is_none());
    }

    #[test]
    fn test_builder_rejects_zero() {
        assert!(matches!(
            AgentConfig::builder().chunk_size(0).build(),
            Err(AgentError::InvalidConfig { .. })
        ));
        assert!(matches!(
            AgentConfig::builder().turn_cap(0).build(),
            Err(AgentError::InvalidConfig { .. })
        ));
    }
}
