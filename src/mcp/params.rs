//! MCP tool parameter types.
//!
//! Defines the input schemas for MCP tools using `schemars` for automatic
//! JSON Schema generation required by the MCP protocol.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `analyze_script` MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeScriptParams {
    /// URL of the script page (http or https).
    pub script_url: String,

    /// API key for the model provider. Falls back to the server environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Parameters for the `analyze_story` MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeStoryParams {
    /// The person's account of the relationship.
    pub story: String,

    /// API key for the model provider. Falls back to the server environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Parameters for the `search_scripts` MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchScriptsParams {
    /// Movie or episode title, or part of one.
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_is_optional() {
        let params: AnalyzeScriptParams =
            serde_json::from_str(r#"{"script_url":"https://imsdb.com/scripts/Rebecca.html"}"#)
                .unwrap_or_else(|_| unreachable!());
        assert!(params.api_key.is_none());

        let story: AnalyzeStoryParams =
            serde_json::from_str(r#"{"story":"He reads my texts","api_key":"sk-x"}"#)
                .unwrap_or_else(|_| unreachable!());
        assert_eq!(story.api_key.as_deref(), Some("sk-x"));
    }
}
