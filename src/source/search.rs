//! Script archive title search.
//!
//! Posts a title query to the archive's search form and turns the result
//! links into script page URLs that [`HttpDocumentSource`](super::HttpDocumentSource)
//! can fetch.

use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::SourceError;

/// Archive search form endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://imsdb.com/search.php";

/// Heading that opens the results block.
const RESULTS_START: &str = "<br><h1>Search results for ";
/// Script include that follows the results block.
const RESULTS_END: &str =
    "<script type=\"text/javascript\" src=\"/a/a_imsdb_rec_goo.js\"></script>";

/// Result link prefixes that point at script detail pages.
const LISTING_PREFIXES: [&str; 2] = ["/Movie Scripts/", "/TV Transcripts/"];

/// Searches the script archive by title.
#[derive(Debug, Clone)]
pub struct ScriptSearch {
    client: Client,
    endpoint: Url,
}

impl ScriptSearch {
    /// Creates a search client for the public archive.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in endpoint; the signature matches
    /// [`with_endpoint`](Self::with_endpoint).
    pub fn new() -> Result<Self, SourceError> {
        Self::with_endpoint(Client::new(), DEFAULT_SEARCH_URL)
    }

    /// Creates a search client posting to `endpoint`.
    ///
    /// Script URLs are built on the endpoint's origin.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidLocator`] if `endpoint` is not a URL.
    pub fn with_endpoint(client: Client, endpoint: &str) -> Result<Self, SourceError> {
        let endpoint = Url::parse(endpoint).map_err(|e| SourceError::InvalidLocator {
            locator: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { client, endpoint })
    }

    /// Searches for scripts whose title matches `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::EmptyQuery`] for a blank query,
    /// [`SourceError::NoResults`] when nothing matches, and transport or
    /// HTTP errors otherwise.
    pub async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SourceError::EmptyQuery);
        }

        let url = self.endpoint.to_string();
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("User-Agent", concat!("script-lens/", env!("CARGO_PKG_VERSION")))
            .form(&[("search_query", query), ("submit", "Go!")])
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| SourceError::Request {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let urls = parse_results(&body, &self.endpoint)?;
        debug!(query, hits = urls.len(), "script search finished");
        if urls.is_empty() {
            return Err(SourceError::NoResults {
                query: query.to_string(),
            });
        }
        Ok(urls)
    }
}

/// Returns the results block of a search page, or `None` if the page has
/// no results heading.
#[must_use]
pub fn results_block(html: &str) -> Option<&str> {
    let start = html.find(RESULTS_START)?;
    let rest = &html[start..];
    Some(rest.find(RESULTS_END).map_or(rest, |end| &rest[..end]))
}

/// Extracts script page URLs from a search results page, in page order and
/// without duplicates.
///
/// # Errors
///
/// Returns [`SourceError::Parse`] if the link selector cannot be built.
pub fn parse_results(html: &str, base: &Url) -> Result<Vec<String>, SourceError> {
    let Some(block) = results_block(html) else {
        return Ok(Vec::new());
    };

    let anchors = Selector::parse("a[href]").map_err(|e| SourceError::Parse(e.to_string()))?;
    let fragment = Html::parse_fragment(block);

    let mut urls: Vec<String> = Vec::new();
    for href in fragment.select(&anchors).filter_map(|a| a.value().attr("href")) {
        let Some(url) = script_url(base, href) else {
            continue;
        };
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    Ok(urls)
}

/// Rewrites a result link such as `/Movie Scripts/Gone Girl Script.html`
/// into the script page URL `/scripts/Gone-Girl.html` on `base`'s origin.
///
/// Links that do not point at a script listing yield `None`.
#[must_use]
pub fn script_url(base: &Url, href: &str) -> Option<String> {
    let href = href.replace("%20", " ");
    let title = LISTING_PREFIXES
        .iter()
        .copied()
        .find_map(|prefix| href.strip_prefix(prefix))?;
    let title = title.strip_suffix(" Script.html").unwrap_or(title);
    if title.trim().is_empty() {
        return None;
    }

    let slug = title.trim().replace(" - ", "-").replace(' ', "-");
    base.join(&format!("/scripts/{slug}.html"))
        .ok()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"<html><body>
<a href="/">Home</a>
<br><h1>Search results for 'gone'</h1>
<p><a href="/Movie Scripts/Gone Girl Script.html" title="Gone Girl Script">Gone Girl</a> (2014-09)<br>
Written by <a href="/writer.php?w=Gillian Flynn">Gillian Flynn</a></p>
<p><a href="/Movie Scripts/Gone Baby Gone Script.html">Gone Baby Gone</a></p>
<p><a href="/TV Transcripts/Lost - Pilot Script.html">Lost - Pilot</a></p>
<p><a href="/Movie Scripts/Gone Girl Script.html">Gone Girl</a></p>
<script type="text/javascript" src="/a/a_imsdb_rec_goo.js"></script>
<a href="/Movie Scripts/Footer Script.html">Footer</a>
</body></html>"#;

    fn base() -> Url {
        Url::parse(DEFAULT_SEARCH_URL).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_parse_results_rewrites_links() {
        let urls = parse_results(RESULTS_PAGE, &base()).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(
            urls,
            vec![
                "https://imsdb.com/scripts/Gone-Girl.html",
                "https://imsdb.com/scripts/Gone-Baby-Gone.html",
                "https://imsdb.com/scripts/Lost-Pilot.html",
            ]
        );
    }

    #[test]
    fn test_parse_results_without_results_heading() {
        let page = "<html><a href=\"/Movie Scripts/Heat Script.html\">Heat</a></html>";
        let urls = parse_results(page, &base()).unwrap_or_else(|e| unreachable!("{e}"));
        assert!(urls.is_empty());
    }

    #[test]
    fn test_script_url_skips_other_links() {
        assert_eq!(script_url(&base(), "/writer.php?w=Someone"), None);
        assert_eq!(script_url(&base(), "/Movie Scripts/ Script.html"), None);
        assert_eq!(
            script_url(&base(), "/Movie%20Scripts/Heat%20Script.html").as_deref(),
            Some("https://imsdb.com/scripts/Heat.html")
        );
    }

    fn search_against(server: &wiremock::MockServer) -> ScriptSearch {
        let endpoint = format!("{}/search.php", server.uri());
        ScriptSearch::with_endpoint(Client::new(), &endpoint)
            .unwrap_or_else(|e| unreachable!("{e}"))
    }

    #[tokio::test]
    async fn test_search_blank_query() {
        let search = ScriptSearch::new().unwrap_or_else(|e| unreachable!("{e}"));
        assert!(matches!(
            search.search("  ").await,
            Err(SourceError::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn test_search_posts_form() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/search.php"))
            .and(wiremock::matchers::body_string_contains("search_query=gone"))
            .and(wiremock::matchers::body_string_contains("submit=Go%21"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let search = search_against(&server);
        let urls = search.search("gone").await.unwrap_or_else(|e| unreachable!("{e}"));

        assert_eq!(urls.len(), 3);
        assert_eq!(urls[0], format!("{}/scripts/Gone-Girl.html", server.uri()));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<br><h1>Search results for 'zzz'</h1><p>Nothing</p>"),
            )
            .mount(&server)
            .await;

        let search = search_against(&server);
        assert!(matches!(
            search.search("zzz").await,
            Err(SourceError::NoResults { query }) if query == "zzz"
        ));
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let search = search_against(&server);
        assert!(matches!(
            search.search("heat").await,
            Err(SourceError::Http { status: 503, .. })
        ));
    }
}
