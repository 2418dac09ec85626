//! Read-only typology lookup tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::agent::tool::{Tool, ToolDefinition, parse_args};
use crate::error::AgentError;
use crate::storage::TypologyStore;

/// Lists every known typology.
pub struct ListTypologiesTool {
    store: Arc<dyn TypologyStore>,
}

impl ListTypologiesTool {
    /// Creates the tool over a typology store.
    #[must_use]
    pub fn new(store: Arc<dyn TypologyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTypologiesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_typologies".to_string(),
            description: "List every known manipulation pattern with description, tactics \
                          and red flags."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    async fn invoke(&self, _arguments: &str) -> Result<String, AgentError> {
        let typologies = self
            .store
            .list_typologies()
            .map_err(|e| AgentError::tool("list_typologies", e.to_string()))?;
        serde_json::to_string(&typologies)
            .map_err(|e| AgentError::tool("list_typologies", format!("serialization error: {e}")))
    }
}

/// Looks up one typology by name.
pub struct GetTypologyTool {
    store: Arc<dyn TypologyStore>,
}

impl GetTypologyTool {
    /// Creates the tool over a typology store.
    #[must_use]
    pub fn new(store: Arc<dyn TypologyStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct GetArgs {
    name: String,
}

#[async_trait]
impl Tool for GetTypologyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_typology".to_string(),
            description: "Get one manipulation pattern by name (case-insensitive).".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Pattern name, as returned by list_typologies."
                    }
                },
                "required": ["name"],
                "additionalProperties": false
            }),
        }
    }

    async fn invoke(&self, arguments: &str) -> Result<String, AgentError> {
        let args: GetArgs = parse_args("get_typology", arguments)?;
        let found = self
            .store
            .get_typology(args.name.trim())
            .map_err(|e| AgentError::tool("get_typology", e.to_string()))?;
        match found {
            Some(typology) => serde_json::to_string(&typology)
                .map_err(|e| AgentError::tool("get_typology", format!("serialization error: {e}"))),
            None => Err(AgentError::tool(
                "get_typology",
                format!("no pattern named '{}'", args.name),
            )),
        }
    }
}
