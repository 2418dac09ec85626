//! MCP server implementation for script-lens.
//!
//! Exposes the script pipeline and story analysis as MCP tools, and the
//! typology catalogue as MCP resources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
    ReadResourceRequestParams, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use tracing::info;

use crate::agent::{AgentConfig, DefaultProviderFactory, Orchestrator};
use crate::credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
use crate::error::{AgentError, CommandError, SourceError};
use crate::source::{HttpDocumentSource, ScriptSearch};
use crate::storage::{SqliteStorage, TypologyStore};

use super::params::{AnalyzeScriptParams, AnalyzeStoryParams, SearchScriptsParams};

const RESOURCE_PREFIX: &str = "script-lens://typologies/";

/// Maps a pipeline error to an MCP error: caller mistakes become
/// `invalid_params`, everything else `internal_error`.
fn to_mcp_error(e: &AgentError) -> McpError {
    match e {
        AgentError::ApiKeyMissing
        | AgentError::InvalidApiKey { .. }
        | AgentError::InvalidInput { .. } => McpError::invalid_params(e.to_string(), None),
        _ => McpError::internal_error(e.to_string(), None),
    }
}

fn credentials(api_key: Option<String>) -> Box<dyn CredentialProvider> {
    match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => Box::new(StaticCredentials::new(Some(key))),
        None => Box::new(EnvCredentials),
    }
}

/// script-lens MCP server.
///
/// Cloning is cheap: clones share the orchestrator and the storage
/// connection.
#[derive(Clone)]
pub struct ScriptLensServer {
    tool_router: ToolRouter<Self>,
    db_path: PathBuf,
    storage: Arc<SqliteStorage>,
    orchestrator: Arc<Orchestrator>,
    search: ScriptSearch,
}

#[tool_router]
impl ScriptLensServer {
    /// Run the script pipeline over one script URL.
    #[tool(
        name = "analyze_script",
        description = "Analyze a movie script for manipulation patterns. Fetches the script, reads it excerpt by excerpt (at most the configured turn cap), and stores every finding the analyst confirms. Returns a JSON run report whose `result` is always \"done\" on success; `status` is \"exhausted\" when the whole script was read and \"capped\" when excerpts were skipped."
    )]
    async fn analyze_script(
        &self,
        Parameters(params): Parameters<AnalyzeScriptParams>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = credentials(params.api_key);
        let report = self
            .orchestrator
            .analyze(&params.script_url, credentials.as_ref())
            .await
            .map_err(|e| to_mcp_error(&e))?;

        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Search the script archive by title.
    #[tool(
        name = "search_scripts",
        description = "Search the script archive by movie or episode title. Returns a JSON array of script page URLs that `analyze_script` accepts; the array is empty when nothing matches."
    )]
    async fn search_scripts(
        &self,
        Parameters(params): Parameters<SearchScriptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let urls = match self.search.search(&params.query).await {
            Ok(urls) => urls,
            Err(SourceError::NoResults { .. }) => Vec::new(),
            Err(e @ SourceError::EmptyQuery) => {
                return Err(McpError::invalid_params(e.to_string(), None));
            }
            Err(e) => return Err(McpError::internal_error(e.to_string(), None)),
        };

        let json = serde_json::to_string_pretty(&urls)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    /// Analyze a personal story against the typology catalogue.
    #[tool(
        name = "analyze_story",
        description = "Analyze a personal account of a relationship for manipulation patterns, using the typology catalogue and previously mined script findings as context. Returns JSON with `content`, `findings`, `patterns_detected` and an optional `confidence_score`."
    )]
    async fn analyze_story(
        &self,
        Parameters(params): Parameters<AnalyzeStoryParams>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = credentials(params.api_key);
        let result = self
            .orchestrator
            .analyze_story(&params.story, credentials.as_ref())
            .await
            .map_err(|e| to_mcp_error(&e))?;

        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for ScriptLensServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "script-lens".to_string(),
                title: Some("script-lens MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "script-lens mines movie scripts for interpersonal manipulation patterns. \
                 Find script URLs with `search_scripts`. \
                 Use `analyze_script` with a script URL to populate findings, then \
                 `analyze_story` to compare a personal account against them. \
                 Browse the typology catalogue via resources."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let storage = self.storage.clone();

        let typologies = tokio::task::spawn_blocking(move || storage.list_typologies())
            .await
            .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))?
            .map_err(|e| {
                McpError::internal_error(format!("Failed to list typologies: {e}"), None)
            })?;

        let resources = typologies
            .into_iter()
            .map(|t| {
                let mut raw = RawResource::new(
                    format!("{RESOURCE_PREFIX}{}", t.name),
                    format!("Typology: {}", t.name),
                );
                raw.description = Some(t.description);
                raw.mime_type = Some("application/json".to_string());
                raw.no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParams { uri, .. }: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let name = uri
            .strip_prefix(RESOURCE_PREFIX)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                McpError::invalid_params(
                    format!("Invalid URI, expected {RESOURCE_PREFIX}{{name}}: {uri}"),
                    None,
                )
            })?
            .to_string();

        let storage = self.storage.clone();
        let lookup = name.clone();
        let typology = tokio::task::spawn_blocking(move || storage.get_typology(&lookup))
            .await
            .map_err(|e| McpError::internal_error(format!("Task join error: {e}"), None))?
            .map_err(|e| McpError::internal_error(format!("Storage error: {e}"), None))?
            .ok_or_else(|| {
                McpError::resource_not_found(format!("Typology not found: {name}"), None)
            })?;

        let json = serde_json::to_string_pretty(&typology)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(json, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let template = RawResourceTemplate {
            uri_template: format!("{RESOURCE_PREFIX}{{name}}"),
            name: "Typology".to_string(),
            title: None,
            description: Some(
                "Returns the JSON entry for a manipulation pattern: description, core tactics, red flags, healthy opposites and examples."
                    .to_string(),
            ),
            mime_type: Some("application/json".to_string()),
            icons: None,
        };

        Ok(ListResourceTemplatesResult {
            resource_templates: vec![template.no_annotation()],
            next_cursor: None,
            meta: None,
        })
    }
}

impl ScriptLensServer {
    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates a new MCP server backed by the database at `db_path`.
    ///
    /// Credentials are not checked here; each tool call resolves its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent configuration cannot be loaded from
    /// environment variables or the database cannot be opened.
    pub fn new(db_path: &Path) -> Result<Self, crate::error::Error> {
        let config = AgentConfig::from_env().map_err(|e| {
            CommandError::ExecutionFailed(format!("Agent configuration error: {e}"))
        })?;

        let storage = Arc::new(SqliteStorage::open(db_path)?);
        storage.init()?;

        let search = ScriptSearch::new()?;
        let orchestrator = Arc::new(Orchestrator::new(
            config,
            Arc::new(DefaultProviderFactory),
            Arc::new(HttpDocumentSource::new()),
            storage.clone(),
            storage.clone(),
        ));
        info!(db = %db_path.display(), "mcp server ready");

        Ok(Self {
            tool_router: Self::tool_router(),
            db_path: db_path.to_path_buf(),
            storage,
            orchestrator,
            search,
        })
    }
}

impl std::fmt::Debug for ScriptLensServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptLensServer")
            .field("db_path", &self.db_path)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_caller_errors_are_invalid_params() {
        let missing = to_mcp_error(&AgentError::ApiKeyMissing);
        assert_eq!(missing.code, McpError::invalid_params("", None).code);

        let upstream = to_mcp_error(&AgentError::ApiRequest {
            message: "boom".to_string(),
            status: Some(500),
        });
        assert_eq!(upstream.code, McpError::internal_error("", None).code);
    }

    #[test]
    fn test_param_key_takes_precedence() {
        let creds = credentials(Some("sk-param".to_string()));
        assert_eq!(creds.api_key().as_deref(), Some("sk-param"));
    }

    #[tokio::test]
    async fn test_search_scripts_blank_query_is_invalid() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db_path = dir.path().join("mcp.db");
        let server = ScriptLensServer::new(&db_path).unwrap_or_else(|e| unreachable!("{e}"));
        let err = server
            .search_scripts(Parameters(SearchScriptsParams {
                query: " ".to_string(),
            }))
            .await
            .err()
            .unwrap_or_else(|| unreachable!());
        assert_eq!(err.code, McpError::invalid_params("", None).code);
    }

    #[test]
    fn test_new_creates_database() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db_path = dir.path().join("nested").join("mcp.db");
        let server = ScriptLensServer::new(&db_path).unwrap_or_else(|e| unreachable!("{e}"));
        assert!(db_path.exists());
        assert_eq!(server.db_path(), db_path);
        assert!(server.get_info().capabilities.tools.is_some());
    }
}
