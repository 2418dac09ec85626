//! HTTP document source.

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::DocumentSource;
use crate::core::Document;
use crate::error::SourceError;

/// Marker opening the script body on script archive pages.
const SCRIPT_BODY_START: &str = "<td class=\"scrtext\">";
/// Marker closing the script body.
const SCRIPT_BODY_END: &str = "<table width=\"85%\" border=\"0\"";

/// Fetches documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpDocumentSource {
    client: Client,
}

impl HttpDocumentSource {
    /// Creates a source with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates a source using an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn parse_url(locator: &str) -> Result<Url, SourceError> {
        let url = Url::parse(locator.trim()).map_err(|e| SourceError::InvalidLocator {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SourceError::InvalidLocator {
                locator: locator.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }
}

impl Default for HttpDocumentSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    fn name(&self) -> &'static str {
        "http"
    }

    fn check(&self, locator: &str) -> Result<(), SourceError> {
        Self::parse_url(locator).map(|_| ())
    }

    async fn fetch(&self, locator: &str) -> Result<Document, SourceError> {
        let url = Self::parse_url(locator)?;

        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", concat!("script-lens/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let text = extract_script_body(&body).unwrap_or(&body).to_string();
        debug!(url = %url, bytes = body.len(), kept = text.len(), "fetched document");
        Ok(Document::new(url.as_str(), text))
    }
}

/// Returns the script body between the archive page markers, if both are
/// present in order.
#[must_use]
pub fn extract_script_body(html: &str) -> Option<&str> {
    let start = html.find(SCRIPT_BODY_START)? + SCRIPT_BODY_START.len();
    let end = start + html[start..].find(SCRIPT_BODY_END)?;
    Some(&html[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_script_body() {
        let html = "<html><td class=\"scrtext\"><pre>INT. KITCHEN - NIGHT</pre>\
                    <table width=\"85%\" border=\"0\">footer</table></html>";
        assert_eq!(
            extract_script_body(html),
            Some("<pre>INT. KITCHEN - NIGHT</pre>")
        );
    }

    #[test]
    fn test_extract_script_body_missing_markers() {
        assert_eq!(extract_script_body("<html>plain page</html>"), None);
        assert_eq!(
            extract_script_body("<table width=\"85%\" border=\"0\"><td class=\"scrtext\">x"),
            None
        );
    }

    #[test]
    fn test_check_rejects_non_http() {
        let source = HttpDocumentSource::new();
        assert!(source.check("https://imsdb.com/scripts/Heat.html").is_ok());
        assert!(matches!(
            source.check("ftp://example.com/file"),
            Err(SourceError::InvalidLocator { .. })
        ));
        assert!(matches!(
            source.check("not a url"),
            Err(SourceError::InvalidLocator { .. })
        ));
    }
}
