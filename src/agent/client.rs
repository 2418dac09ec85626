//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations. A
//! provider is built per run because the API key arrives with the request.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::credentials::ApiKey;
use crate::error::AgentError;

/// Builds a provider for a validated API key.
pub trait ProviderFactory: Send + Sync {
    /// Creates the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
    fn create(
        &self,
        config: &AgentConfig,
        key: &ApiKey,
    ) -> Result<Arc<dyn LlmProvider>, AgentError>;
}

impl<F> ProviderFactory for F
where
    F: Fn(&AgentConfig, &ApiKey) -> Result<Arc<dyn LlmProvider>, AgentError> + Send + Sync,
{
    fn create(
        &self,
        config: &AgentConfig,
        key: &ApiKey,
    ) -> Result<Arc<dyn LlmProvider>, AgentError> {
        self(config, key)
    }
}

/// Factory for the providers compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProviderFactory;

impl ProviderFactory for DefaultProviderFactory {
    fn create(
        &self,
        config: &AgentConfig,
        key: &ApiKey,
    ) -> Result<Arc<dyn LlmProvider>, AgentError> {
        create_provider(config, key)
    }
}

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(
    config: &AgentConfig,
    key: &ApiKey,
) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config, key))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ApiKey {
        ApiKey::parse("sk-test", None).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_create_openai_provider() {
        let config = AgentConfig::builder()
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = DefaultProviderFactory
            .create(&config, &key())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = AgentConfig::builder()
            .provider("unknown")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            create_provider(&config, &key()),
            Err(AgentError::UnsupportedProvider { .. })
        ));
    }
}
