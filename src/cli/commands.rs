//! CLI command implementations.
//!
//! Every command returns its rendered output as a `String`; `main` prints it.
//! Async work runs on a runtime created per command.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::{AgentConfig, DefaultProviderFactory, Orchestrator};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{
    Cli, Commands, FindingsCommands, ModelArgs, PromptCommands, TypologyCommands,
};
use crate::cli::output::{
    OutputFormat, format_analysis, format_finding, format_findings, format_run_report,
    format_search_results, format_typology, format_typology_list,
};
use crate::core::{FindingFilter, FindingKind};
use crate::credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
use crate::error::{CommandError, Result};
use crate::source::{DocumentSource, FileDocumentSource, HttpDocumentSource, ScriptSearch};
use crate::storage::{FindingStore, SqliteStorage, TypologyStore};

/// Pipeline overrides collected from `analyze` flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOverrides {
    /// Characters per excerpt.
    pub chunk_size: Option<usize>,
    /// Maximum turns per run.
    pub turn_cap: Option<usize>,
}

/// Executes the parsed CLI command and returns its output.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Analyze {
            url,
            file,
            chunk_size,
            turn_cap,
            model,
        } => {
            let overrides = RunOverrides {
                chunk_size: *chunk_size,
                turn_cap: *turn_cap,
            };
            cmd_analyze(
                &db_path,
                url.as_deref(),
                file.as_deref(),
                overrides,
                model,
                format,
            )
        }
        Commands::Search { query, search_url } => cmd_search(query, search_url, format),
        Commands::Story { file, model } => cmd_story(&db_path, file.as_deref(), model, format),
        Commands::Findings(sub) => execute_findings(sub, &db_path, format),
        Commands::Typologies(sub) => execute_typologies(sub, &db_path, format),
        Commands::Prompts(PromptCommands::Init { dir }) => cmd_init_prompts(dir.as_deref(), format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(sub) => cmd_mcp(sub, &db_path),
    }
}

fn execute_findings(cmd: &FindingsCommands, db_path: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    match cmd {
        FindingsCommands::List {
            min_severity,
            limit,
            source,
        } => {
            let min_kind = min_severity
                .as_deref()
                .map(|s| {
                    FindingKind::parse(s).ok_or_else(|| {
                        CommandError::ExecutionFailed(format!(
                            "Invalid severity '{s}'. Valid values: danger, warning, info"
                        ))
                    })
                })
                .transpose()?;
            let filter = FindingFilter {
                caller_key: None,
                source: source.clone(),
                min_kind,
                limit: *limit,
            };
            let findings = storage.list_findings(&filter)?;
            Ok(format_findings(&findings, format))
        }
        FindingsCommands::Show { id } => {
            let stored = storage
                .get_finding(*id)?
                .ok_or_else(|| CommandError::NotFound(format!("finding {id}")))?;
            Ok(format_finding(&stored, format))
        }
    }
}

fn execute_typologies(
    cmd: &TypologyCommands,
    db_path: &Path,
    format: OutputFormat,
) -> Result<String> {
    let storage = open_storage(db_path)?;
    match cmd {
        TypologyCommands::Import { path } => {
            let count = storage.import_typologies_file(path)?;
            match format {
                OutputFormat::Text => Ok(format!(
                    "Imported {count} typolog{} from: {}\n",
                    if count == 1 { "y" } else { "ies" },
                    path.display()
                )),
                OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
                    "imported": count,
                    "path": path.to_string_lossy(),
                }))),
            }
        }
        TypologyCommands::List => {
            let typologies = storage.list_typologies()?;
            Ok(format_typology_list(&typologies, format))
        }
        TypologyCommands::Show { name } => {
            let typology = storage
                .get_typology(name)?
                .ok_or_else(|| CommandError::NotFound(format!("typology '{name}'")))?;
            Ok(format_typology(&typology, format))
        }
    }
}

/// Opens the database, creating the schema if needed.
fn open_storage(db_path: &Path) -> Result<SqliteStorage> {
    let storage = SqliteStorage::open(db_path)?;
    storage.init()?;
    Ok(storage)
}

/// Builds the agent configuration from the environment plus CLI flags.
fn build_config(model: &ModelArgs, overrides: RunOverrides) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(name) = &model.model {
        builder = builder.primary_model(name.clone()).delegate_model(name.clone());
    }
    if let Some(dir) = &model.prompt_dir {
        builder = builder.prompt_dir(dir.clone());
    }
    if let Some(size) = overrides.chunk_size {
        builder = builder.chunk_size(size);
    }
    if let Some(cap) = overrides.turn_cap {
        builder = builder.turn_cap(cap);
    }
    Ok(builder.build()?)
}

/// Credentials from `--api-key`, falling back to the environment.
fn resolve_credentials(model: &ModelArgs) -> Box<dyn CredentialProvider> {
    match &model.api_key {
        Some(key) => Box::new(StaticCredentials::new(Some(key.clone()))),
        None => Box::new(EnvCredentials),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn build_orchestrator(
    config: AgentConfig,
    source: Arc<dyn DocumentSource>,
    storage: Arc<SqliteStorage>,
) -> Orchestrator {
    Orchestrator::new(
        config,
        Arc::new(DefaultProviderFactory),
        source,
        storage.clone(),
        storage,
    )
}

// ==================== Command Implementations ====================

fn cmd_analyze(
    db_path: &Path,
    url: Option<&str>,
    file: Option<&Path>,
    overrides: RunOverrides,
    model: &ModelArgs,
    format: OutputFormat,
) -> Result<String> {
    let (source, locator): (Arc<dyn DocumentSource>, String) = match (url, file) {
        (Some(url), _) => (Arc::new(HttpDocumentSource::new()), url.to_string()),
        (None, Some(path)) => (
            Arc::new(FileDocumentSource),
            path.to_string_lossy().into_owned(),
        ),
        (None, None) => {
            return Err(CommandError::ExecutionFailed(
                "Provide a script URL or --file".to_string(),
            )
            .into());
        }
    };

    let config = build_config(model, overrides)?;
    let storage = Arc::new(open_storage(db_path)?);
    let orchestrator = build_orchestrator(config, source, storage);
    let credentials = resolve_credentials(model);

    let report = runtime()?.block_on(orchestrator.analyze(&locator, credentials.as_ref()))?;
    Ok(format_run_report(&report, format))
}

fn cmd_search(query: &str, search_url: &str, format: OutputFormat) -> Result<String> {
    let search = ScriptSearch::with_endpoint(reqwest::Client::new(), search_url)?;
    let urls = runtime()?.block_on(search.search(query))?;
    Ok(format_search_results(&urls, format))
}

fn cmd_story(
    db_path: &Path,
    file: Option<&Path>,
    model: &ModelArgs,
    format: OutputFormat,
) -> Result<String> {
    let story = match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            CommandError::ExecutionFailed(format!("Failed to read {}: {e}", path.display()))
        })?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config = build_config(model, RunOverrides::default())?;
    let storage = Arc::new(open_storage(db_path)?);
    let orchestrator = build_orchestrator(config, Arc::new(FileDocumentSource), storage);
    let credentials = resolve_credentials(model);

    let result = runtime()?.block_on(orchestrator.analyze_story(&story, credentials.as_ref()))?;
    Ok(format_analysis(&result, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    use crate::agent::PromptSet;
    use std::fmt::Write;

    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the process is stopped
/// (HTTP).
#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands, db_path: &Path) -> Result<String> {
    use crate::mcp::{ScriptLensServer, serve_http, serve_stdio};

    let server = ScriptLensServer::new(db_path).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create MCP server: {e}"))
    })?;

    runtime()?
        .block_on(async {
            match cmd {
                McpCommands::Stdio => serve_stdio(server).await,
                McpCommands::Http { host, port } => serve_http(server, host, *port).await,
            }
        })
        .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Finding;
    use crate::credentials::CallerKey;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db_path = temp_dir.path().join("test.db");
        (temp_dir, db_path)
    }

    fn seed(db_path: &Path) {
        let storage = open_storage(db_path).unwrap_or_else(|_| unreachable!());
        storage
            .import_typologies(
                r#"[{"name":"The Gaslighter","description":"Denies reality","red_flags":["You're imagining it"]}]"#,
            )
            .unwrap_or_else(|_| unreachable!());
        let caller = CallerKey::new("c");
        for (kind, title) in [
            (FindingKind::Info, "Small talk"),
            (FindingKind::Danger, "Isolation"),
        ] {
            storage
                .save_finding(&caller, "script.txt", &Finding::new(kind, title, "d"))
                .unwrap_or_else(|_| unreachable!());
        }
    }

    #[test]
    fn test_findings_list_filters_by_severity() {
        let (_dir, db_path) = setup();
        seed(&db_path);

        let cmd = FindingsCommands::List {
            min_severity: Some("danger".to_string()),
            limit: 10,
            source: None,
        };
        let output = execute_findings(&cmd, &db_path, OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(output.contains("Isolation"));
        assert!(!output.contains("Small talk"));
    }

    #[test]
    fn test_findings_list_rejects_bad_severity() {
        let (_dir, db_path) = setup();
        let cmd = FindingsCommands::List {
            min_severity: Some("critical".to_string()),
            limit: 10,
            source: None,
        };
        assert!(execute_findings(&cmd, &db_path, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_findings_show_missing() {
        let (_dir, db_path) = setup();
        let result = execute_findings(&FindingsCommands::Show { id: 99 }, &db_path, OutputFormat::Text);
        assert!(matches!(
            result,
            Err(crate::error::Error::Command(CommandError::NotFound(_)))
        ));
    }

    #[test]
    fn test_typologies_show_case_insensitive() {
        let (_dir, db_path) = setup();
        seed(&db_path);
        let cmd = TypologyCommands::Show {
            name: "the gaslighter".to_string(),
        };
        let output = execute_typologies(&cmd, &db_path, OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(output.starts_with("The Gaslighter"));
        assert!(output.contains("You're imagining it"));
    }

    #[test]
    fn test_typologies_import_json_output() {
        let (dir, db_path) = setup();
        let path = dir.path().join("t.json");
        std::fs::write(&path, r#"[{"name":"A","description":"a"},{"name":"B","description":"b"}]"#)
            .unwrap_or_else(|_| unreachable!());
        let output = execute_typologies(
            &TypologyCommands::Import { path },
            &db_path,
            OutputFormat::Json,
        )
        .unwrap_or_else(|e| unreachable!("{e}"));
        let json: serde_json::Value =
            serde_json::from_str(&output).unwrap_or_else(|_| unreachable!());
        assert_eq!(json["imported"], 2);
    }

    #[test]
    fn test_init_prompts_writes_templates() {
        let (dir, _db_path) = setup();
        let target = dir.path().join("prompts");
        let output = cmd_init_prompts(Some(&target), OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(output.contains("Wrote 3 prompt template(s)"));
        assert!(target.join("primary.md").exists());

        let again = cmd_init_prompts(Some(&target), OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(again.starts_with("All prompt templates already exist"));
    }

    #[test]
    fn test_build_config_applies_overrides() {
        let model = ModelArgs {
            model: Some("gpt-4o-mini".to_string()),
            ..ModelArgs::default()
        };
        let config = build_config(
            &model,
            RunOverrides {
                chunk_size: Some(1000),
                turn_cap: Some(3),
            },
        )
        .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(config.primary_model, "gpt-4o-mini");
        assert_eq!(config.delegate_model, "gpt-4o-mini");
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.turn_cap, 3);

        let zero = build_config(
            &ModelArgs::default(),
            RunOverrides {
                chunk_size: None,
                turn_cap: Some(0),
            },
        );
        assert!(zero.is_err());
    }
}
