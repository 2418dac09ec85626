//! API credentials and caller attribution.
//!
//! Credentials are resolved per run through a [`CredentialProvider`], so a
//! server can serve several callers with different keys. Findings are
//! attributed to a [`CallerKey`] derived from the API key; the key itself is
//! never persisted.

use sha2::{Digest, Sha256};

use crate::error::AgentError;

/// Environment variables consulted by [`EnvCredentials`], in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["SCRIPT_LENS_API_KEY", "OPENAI_API_KEY"];

/// Default required API key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "sk-";

/// Source of the API key used to construct the model client.
pub trait CredentialProvider: Send + Sync {
    /// Returns the raw API key, if one is available.
    fn api_key(&self) -> Option<String>;
}

/// Reads the API key from [`API_KEY_ENV_VARS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
    }
}

/// A fixed, possibly absent, API key.
#[derive(Clone, Default)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    /// Wraps an optional key.
    #[must_use]
    pub const fn new(key: Option<String>) -> Self {
        Self(key)
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticCredentials")
            .field(&self.0.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A validated API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validates a raw key.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidApiKey`] if the key is empty, contains
    /// whitespace, or lacks `required_prefix`.
    pub fn parse(raw: &str, required_prefix: Option<&str>) -> Result<Self, AgentError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(AgentError::InvalidApiKey {
                reason: "key is empty".to_string(),
            });
        }
        if key.chars().any(char::is_whitespace) {
            return Err(AgentError::InvalidApiKey {
                reason: "key contains whitespace".to_string(),
            });
        }
        if let Some(prefix) = required_prefix.filter(|p| !p.is_empty())
            && !key.starts_with(prefix)
        {
            return Err(AgentError::InvalidApiKey {
                reason: format!("wrong key format (expected prefix '{prefix}')"),
            });
        }
        Ok(Self(key.to_string()))
    }

    /// Returns the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Opaque caller identity used to attribute stored findings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerKey(String);

impl CallerKey {
    /// Wraps an explicit caller identifier.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a stable caller identity from an API key.
    #[must_use]
    pub fn from_api_key(key: &ApiKey) -> Self {
        let digest = Sha256::digest(key.expose().as_bytes());
        let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", None; "empty")]
    #[test_case("   ", None; "blank")]
    #[test_case("sk-abc def", None; "inner whitespace")]
    #[test_case("abc123", Some("sk-"); "missing prefix")]
    fn test_parse_rejects(raw: &str, prefix: Option<&str>) {
        assert!(matches!(
            ApiKey::parse(raw, prefix),
            Err(AgentError::InvalidApiKey { .. })
        ));
    }

    #[test]
    fn test_parse_trims_and_accepts() {
        let key = ApiKey::parse("  sk-test-123\n", Some("sk-")).unwrap_or_else(|_| unreachable!());
        assert_eq!(key.expose(), "sk-test-123");
    }

    #[test]
    fn test_empty_prefix_disables_check() {
        assert!(ApiKey::parse("proxy-key", Some("")).is_ok());
        assert!(ApiKey::parse("proxy-key", None).is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let key = ApiKey::parse("sk-secret", None).unwrap_or_else(|_| unreachable!());
        assert!(!format!("{key:?}").contains("secret"));
        let creds = StaticCredentials::new(Some("sk-secret".to_string()));
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_caller_key_is_stable_and_opaque() {
        let key = ApiKey::parse("sk-one", None).unwrap_or_else(|_| unreachable!());
        let other = ApiKey::parse("sk-two", None).unwrap_or_else(|_| unreachable!());
        let caller = CallerKey::from_api_key(&key);
        assert_eq!(caller, CallerKey::from_api_key(&key));
        assert_ne!(caller, CallerKey::from_api_key(&other));
        assert_eq!(caller.as_str().len(), 16);
        assert!(!caller.as_str().contains("sk-"));
    }

    #[test]
    fn test_static_credentials() {
        assert!(StaticCredentials::default().api_key().is_none());
        assert_eq!(
            StaticCredentials::new(Some("sk-x".to_string())).api_key(),
            Some("sk-x".to_string())
        );
    }
}
