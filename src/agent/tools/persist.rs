//! Finding persistence tool.
//!
//! Store failures are never raised. The tool returns a [`SaveOutcome`] so the
//! delegate can report the failure in its answer and the run carries on.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::agent::tool::{Tool, ToolDefinition, parse_args};
use crate::core::{Finding, FindingKind};
use crate::credentials::CallerKey;
use crate::error::AgentError;
use crate::storage::FindingStore;

/// Result of a `save_finding` call, returned to the model as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SaveOutcome {
    /// The finding was stored.
    Saved {
        /// Store-assigned identifier.
        id: i64,
    },
    /// The store rejected or failed the write.
    Failed {
        /// Failure description.
        error: String,
    },
}

impl SaveOutcome {
    /// Returns `true` if the finding was stored.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

#[derive(Deserialize)]
struct SaveArgs {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    title: String,
    description: String,
    #[serde(default)]
    matched_pattern: Option<String>,
}

/// Writes findings for one caller and source document.
pub struct SaveFindingTool {
    store: Arc<dyn FindingStore>,
    caller: CallerKey,
    source: String,
}

impl SaveFindingTool {
    /// Creates the tool bound to a caller and document.
    pub fn new(store: Arc<dyn FindingStore>, caller: CallerKey, source: impl Into<String>) -> Self {
        Self {
            store,
            caller,
            source: source.into(),
        }
    }

    /// Attempts the write and reports the outcome.
    #[must_use]
    pub fn save(&self, finding: &Finding) -> SaveOutcome {
        match self.store.save_finding(&self.caller, &self.source, finding) {
            Ok(id) => {
                debug!(id, kind = %finding.kind, "finding saved");
                SaveOutcome::Saved { id }
            }
            Err(e) => {
                warn!(error = %e, caller = %self.caller, "failed to save finding");
                SaveOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl Tool for SaveFindingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "save_finding".to_string(),
            description: "Store one finding about a manipulation pattern observed in the \
                          script. Returns {\"status\":\"saved\",\"id\":..} or \
                          {\"status\":\"failed\",\"error\":..}."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["danger", "warning", "info"],
                        "description": "Severity of the finding."
                    },
                    "title": {
                        "type": "string",
                        "description": "Short title (max 200 characters)."
                    },
                    "description": {
                        "type": "string",
                        "description": "What happens in the excerpt and which red flags it matches."
                    },
                    "matched_pattern": {
                        "type": "string",
                        "description": "Exact typology name, if one matches."
                    }
                },
                "required": ["type", "title", "description"],
                "additionalProperties": false
            }),
        }
    }

    async fn invoke(&self, arguments: &str) -> Result<String, AgentError> {
        let args: SaveArgs = parse_args("save_finding", arguments)?;
        let kind = FindingKind::parse(&args.kind).ok_or_else(|| {
            AgentError::tool(
                "save_finding",
                format!("unknown type '{}' (expected danger, warning or info)", args.kind),
            )
        })?;

        let mut finding = Finding::new(kind, args.title, args.description);
        if let Some(pattern) = args.matched_pattern {
            finding = finding.with_pattern(pattern);
        }

        let outcome = self.save(&finding);
        serde_json::to_string(&outcome)
            .map_err(|e| AgentError::tool("save_finding", format!("serialization error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FindingFilter, StoredFinding};
    use crate::error::StorageError;
    use crate::storage::SqliteStorage;

    struct FailingStore;

    impl FindingStore for FailingStore {
        fn save_finding(
            &self,
            _caller: &CallerKey,
            _source: &str,
            _finding: &Finding,
        ) -> Result<i64, StorageError> {
            Err(StorageError::LockPoisoned)
        }

        fn list_findings(&self, _filter: &FindingFilter) -> Result<Vec<StoredFinding>, StorageError> {
            Ok(Vec::new())
        }

        fn get_finding(&self, _id: i64) -> Result<Option<StoredFinding>, StorageError> {
            Ok(None)
        }
    }

    const ARGS: &str = r#"{"type":"danger","title":"Threat","description":"He threatens her","matched_pattern":"Intimidator"}"#;

    #[tokio::test]
    async fn test_save_writes_finding() {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!()));
        let tool = SaveFindingTool::new(storage.clone(), CallerKey::new("c1"), "heat.html");

        let out = tool.invoke(ARGS).await.unwrap_or_else(|_| unreachable!());
        let outcome: SaveOutcome = serde_json::from_str(&out).unwrap_or_else(|_| unreachable!());
        assert!(outcome.is_saved());

        let rows = storage
            .list_findings(&FindingFilter::default())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].caller_key, "c1");
        assert_eq!(rows[0].source, "heat.html");
        assert_eq!(rows[0].finding.matched_pattern.as_deref(), Some("Intimidator"));
    }

    #[tokio::test]
    async fn test_store_failure_is_reported_not_raised() {
        let tool = SaveFindingTool::new(Arc::new(FailingStore), CallerKey::new("c1"), "x");
        let out = tool.invoke(ARGS).await.unwrap_or_else(|_| unreachable!());
        let outcome: SaveOutcome = serde_json::from_str(&out).unwrap_or_else(|_| unreachable!());
        assert!(matches!(outcome, SaveOutcome::Failed { ref error } if error.contains("poisoned")));
    }

    #[tokio::test]
    async fn test_unknown_type_is_soft_error() {
        let tool = SaveFindingTool::new(Arc::new(FailingStore), CallerKey::new("c1"), "x");
        let err = tool
            .invoke(r#"{"type":"fatal","title":"t","description":"d"}"#)
            .await
            .err()
            .unwrap_or_else(|| unreachable!());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_outcome_wire_format() {
        let json = serde_json::to_string(&SaveOutcome::Saved { id: 7 }).unwrap_or_default();
        assert_eq!(json, r#"{"status":"saved","id":7}"#);
    }
}
