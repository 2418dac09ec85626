//! Pipeline orchestrator.
//!
//! Drives one bounded run per document: validate inputs, fetch, chunk, then
//! feed chunks to the primary agent one turn at a time until the document is
//! exhausted, the turn cap is hit, or a turn fails. Findings written by
//! earlier turns stay persisted when a later turn fails.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use super::client::ProviderFactory;
use super::config::AgentConfig;
use super::delegate::DelegateAgent;
use super::message::TokenUsage;
use super::primary::PrimaryAgent;
use super::prompt::{PromptSet, build_turn_message};
use super::provider::LlmProvider;
use super::run::{DONE_SENTINEL, PipelineRun, RunReport};
use super::story::{StoryAnalyst, validate_story};
use super::tools::DelegationTool;
use super::traits::Agent;
use crate::chunking::chunk_text;
use crate::core::{AnalysisResult, Document, FindingFilter};
use crate::credentials::{ApiKey, CallerKey, CredentialProvider};
use crate::error::{AgentError, SourceError};
use crate::source::DocumentSource;
use crate::storage::{FindingStore, TypologyStore};

/// Maximum stored findings included as story context.
const STORY_CONTEXT_FINDINGS: usize = 50;

/// Orchestrates pipeline runs and story analysis.
pub struct Orchestrator {
    config: AgentConfig,
    prompts: PromptSet,
    factory: Arc<dyn ProviderFactory>,
    source: Arc<dyn DocumentSource>,
    findings: Arc<dyn FindingStore>,
    typologies: Arc<dyn TypologyStore>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling back
    /// to compiled-in defaults.
    pub fn new(
        config: AgentConfig,
        factory: Arc<dyn ProviderFactory>,
        source: Arc<dyn DocumentSource>,
        findings: Arc<dyn FindingStore>,
        typologies: Arc<dyn TypologyStore>,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            config,
            prompts,
            factory,
            source,
            findings,
            typologies,
        }
    }

    /// Replaces the prompt set.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Resolves and validates the API key.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] or [`AgentError::InvalidApiKey`].
    pub fn resolve_key(&self, credentials: &dyn CredentialProvider) -> Result<ApiKey, AgentError> {
        let raw = credentials.api_key().ok_or(AgentError::ApiKeyMissing)?;
        ApiKey::parse(&raw, self.config.key_prefix.as_deref())
    }

    /// Analyzes the document at `locator`.
    ///
    /// Returns a report whose sentinel is `"done"` for both complete and
    /// capped runs; [`RunReport::status`] tells them apart.
    ///
    /// # Errors
    ///
    /// Fails before any turn on an invalid locator, missing or malformed
    /// credential, unknown provider, or fetch failure. Fails with
    /// [`AgentError::TurnFailed`] if a turn fails.
    pub async fn analyze(
        &self,
        locator: &str,
        credentials: &dyn CredentialProvider,
    ) -> Result<RunReport, AgentError> {
        self.source.check(locator).map_err(|e| match e {
            SourceError::InvalidLocator { locator, reason } => AgentError::InvalidInput {
                message: format!("invalid document locator '{locator}': {reason}"),
            },
            other => AgentError::DocumentFetch(other),
        })?;
        let key = self.resolve_key(credentials)?;
        let provider = self.factory.create(&self.config, &key)?;
        let caller = CallerKey::from_api_key(&key);

        debug!(source = self.source.name(), locator, "fetching document");
        let document = self.source.fetch(locator).await?;
        self.run_document(provider, &document, &caller).await
    }

    /// Runs the turn loop over an already fetched document.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::TurnFailed`] wrapping the first failed turn.
    pub async fn run_document(
        &self,
        provider: Arc<dyn LlmProvider>,
        document: &Document,
        caller: &CallerKey,
    ) -> Result<RunReport, AgentError> {
        let start = Instant::now();
        let chunks = chunk_text(document.text(), self.config.chunk_size).map_err(|e| {
            AgentError::InvalidConfig {
                message: e.to_string(),
            }
        })?;

        let delegate = DelegateAgent::new(
            &self.config,
            &self.prompts.delegate,
            self.findings.clone(),
            self.typologies.clone(),
            caller.clone(),
            document.source(),
        );
        let delegation = Arc::new(DelegationTool::new(Arc::new(delegate), provider.clone()));
        let primary = PrimaryAgent::new(&self.config, &self.prompts.primary, delegation);
        let mut conversation = primary.start_conversation();

        let mut run = PipelineRun::new(chunks.len(), self.config.turn_cap);
        let mut usage = TokenUsage::default();
        let mut delegations = 0;

        run.start();
        info!(
            source = document.source(),
            chars = document.char_len(),
            chunks = chunks.len(),
            cap = self.config.turn_cap,
            provider = provider.name(),
            "pipeline run started"
        );

        while let Some(index) = run.next_chunk() {
            let chunk = chunks.get(index).ok_or_else(|| AgentError::Orchestration {
                message: format!("chunk {index} out of range"),
            })?;
            let message = build_turn_message(document.source(), index, chunks.len(), chunk);

            match primary.turn(provider.as_ref(), &mut conversation, &message).await {
                Ok(outcome) => {
                    usage.add(&outcome.loop_outcome.usage);
                    delegations += outcome.delegations;
                    run.record_turn();
                    debug!(
                        turn = index,
                        delegations = outcome.delegations,
                        tokens = outcome.loop_outcome.usage.total_tokens,
                        "turn complete"
                    );
                }
                Err(e) => {
                    run.fail();
                    error!(turn = index, error = %e, "turn failed, aborting run");
                    return Err(AgentError::TurnFailed {
                        turn: index,
                        source: Box::new(e),
                    });
                }
            }
        }

        let status = run.status().ok_or_else(|| AgentError::Orchestration {
            message: format!("run ended in state {:?}", run.state()),
        })?;

        let report = RunReport {
            result: DONE_SENTINEL,
            source: document.source().to_string(),
            status,
            turns: run.turns(),
            chunks_total: chunks.len(),
            chunks_skipped: run.chunks_skipped(),
            delegations,
            total_tokens: u64::from(usage.total_tokens) + primary.delegated_tokens(),
            elapsed: start.elapsed(),
        };

        info!(
            status = %report.status,
            turns = report.turns,
            skipped = report.chunks_skipped,
            delegations,
            elapsed_ms = report.elapsed.as_millis(),
            "pipeline run finished"
        );
        Ok(report)
    }

    /// Analyzes a personal story against the typology catalogue and the
    /// caller's stored findings.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on invalid input, credential problems, store
    /// failures, or API failures.
    pub async fn analyze_story(
        &self,
        story: &str,
        credentials: &dyn CredentialProvider,
    ) -> Result<AnalysisResult, AgentError> {
        let story = validate_story(story)?;
        let key = self.resolve_key(credentials)?;
        let provider = self.factory.create(&self.config, &key)?;
        let caller = CallerKey::from_api_key(&key);

        let store_err = |e: crate::error::StorageError| AgentError::Orchestration {
            message: format!("failed to load analysis context: {e}"),
        };
        let typologies = self.typologies.list_typologies().map_err(store_err)?;
        let findings = self
            .findings
            .list_findings(&FindingFilter {
                caller_key: Some(caller.as_str().to_string()),
                limit: STORY_CONTEXT_FINDINGS,
                ..FindingFilter::default()
            })
            .map_err(store_err)?;

        let analyst = StoryAnalyst::new(&self.config, &self.prompts.story);
        debug!(
            agent = analyst.name(),
            typologies = typologies.len(),
            findings = findings.len(),
            "analyzing story"
        );
        analyst
            .analyze(provider.as_ref(), story, &typologies, &findings)
            .await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::credentials::StaticCredentials;
    use crate::source::FileDocumentSource;
    use crate::storage::SqliteStorage;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct QuietProvider;

    #[async_trait]
    impl LlmProvider for QuietProvider {
        fn name(&self) -> &'static str {
            "quiet"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            Ok(ChatResponse {
                content: "{\"content\":\"ok\"}".to_string(),
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    fn orchestrator(created: Arc<AtomicUsize>) -> Orchestrator {
        let storage = Arc::new(SqliteStorage::in_memory().unwrap_or_else(|_| unreachable!()));
        let factory = move |_: &AgentConfig, _: &ApiKey| -> Result<Arc<dyn LlmProvider>, AgentError> {
            created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(QuietProvider))
        };
        let config = AgentConfig::builder()
            .chunk_size(4)
            .turn_cap(2)
            .build()
            .unwrap_or_else(|_| unreachable!());
        Orchestrator::new(
            config,
            Arc::new(factory),
            Arc::new(FileDocumentSource),
            storage.clone(),
            storage,
        )
        .with_prompts(PromptSet::defaults())
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_provider() {
        let created = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(created.clone());
        let result = orch.analyze("script.txt", &StaticCredentials::default()).await;
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wrong_key_format_rejected() {
        let created = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(created.clone());
        let creds = StaticCredentials::new(Some("pk-123".to_string()));
        let result = orch.analyze("script.txt", &creds).await;
        assert!(matches!(result, Err(AgentError::InvalidApiKey { .. })));
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let orch = orchestrator(Arc::new(AtomicUsize::new(0)));
        let creds = StaticCredentials::new(Some("sk-test".to_string()));
        let result = orch.analyze("/no/such/script.txt", &creds).await;
        assert!(matches!(result, Err(AgentError::DocumentFetch(_))));
    }

    #[tokio::test]
    async fn test_run_document_caps() {
        let orch = orchestrator(Arc::new(AtomicUsize::new(0)));
        let doc = Document::new("mem", "abcdefghijkl");
        let report = orch
            .run_document(Arc::new(QuietProvider), &doc, &CallerKey::new("c"))
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(report.sentinel(), "done");
        assert_eq!(report.turns, 2);
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_skipped, 1);
        assert!(report.is_partial());
    }

    #[tokio::test]
    async fn test_story_rejects_empty_before_key() {
        let orch = orchestrator(Arc::new(AtomicUsize::new(0)));
        let result = orch.analyze_story("  ", &StaticCredentials::default()).await;
        assert!(matches!(result, Err(AgentError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_story_uses_json_answer() {
        let orch = orchestrator(Arc::new(AtomicUsize::new(0)));
        let creds = StaticCredentials::new(Some("sk-test".to_string()));
        let result = orch
            .analyze_story("He reads my messages.", &creds)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(result.content, "ok");
    }
}
