//! Document sources.
//!
//! The orchestrator fetches the document it analyzes through a
//! [`DocumentSource`]. Fetch failures are fatal for a run.

mod file;
mod http;
mod search;

pub use file::FileDocumentSource;
pub use http::{HttpDocumentSource, extract_script_body};
pub use search::{DEFAULT_SEARCH_URL, ScriptSearch, parse_results, script_url};

use async_trait::async_trait;

use crate::core::Document;
use crate::error::SourceError;

/// Fetches raw document text by locator (URL or path).
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Validates a locator without fetching it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidLocator`] if this source cannot serve it.
    fn check(&self, locator: &str) -> Result<(), SourceError> {
        if locator.trim().is_empty() {
            return Err(SourceError::InvalidLocator {
                locator: locator.to_string(),
                reason: "locator is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Fetches the document.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport, HTTP, or I/O failures.
    async fn fetch(&self, locator: &str) -> Result<Document, SourceError>;
}
