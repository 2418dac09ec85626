//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// script-lens: mine movie scripts for manipulation patterns.
///
/// Reads a script excerpt by excerpt with a primary agent that delegates
/// suspicious passages to an analyst agent, which stores classified
/// findings against a typology catalogue.
#[derive(Parser, Debug)]
#[command(name = "script-lens")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the findings database file.
    ///
    /// Defaults to `.script-lens/script-lens.db` in the current directory.
    #[arg(short, long, env = "SCRIPT_LENS_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Credential and prompt options shared by model-backed commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// API key for the model provider.
    ///
    /// Falls back to `SCRIPT_LENS_API_KEY`, then `OPENAI_API_KEY`.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Directory containing custom prompt templates.
    #[arg(long, env = "SCRIPT_LENS_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Model used by both agents, overriding configuration.
    #[arg(long)]
    pub model: Option<String>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a script for manipulation patterns.
    ///
    /// Fetches the script, splits it into excerpts and reads at most
    /// `--turn-cap` of them, storing every finding the analyst confirms.
    /// Prints `done` followed by a run summary.
    #[command(after_help = r#"Examples:
  script-lens analyze "https://imsdb.com/scripts/Gone-Girl.html"
  script-lens analyze --file ./scripts/gone-girl.txt
  script-lens analyze --file big.txt --turn-cap 25 --chunk-size 8000
  script-lens --format json analyze "https://imsdb.com/scripts/Rebecca.html" | jq .status
"#)]
    Analyze {
        /// Script URL (http or https).
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,

        /// Read the script from a local file instead of a URL.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Characters per excerpt.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Maximum number of excerpts read in one run.
        #[arg(long)]
        turn_cap: Option<usize>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Search the script archive by title.
    ///
    /// Prints the script URLs `analyze` accepts.
    #[command(after_help = r#"Examples:
  script-lens search "gone girl"
  script-lens analyze "$(script-lens search heat | head -n 1)"
"#)]
    Search {
        /// Title, or part of one.
        query: String,

        /// Search form endpoint.
        #[arg(
            long,
            env = "SCRIPT_LENS_SEARCH_URL",
            default_value = crate::source::DEFAULT_SEARCH_URL
        )]
        search_url: String,
    },

    /// Analyze a personal story against known patterns.
    ///
    /// Uses the typology catalogue and the findings already mined from
    /// scripts as context.
    #[command(after_help = r#"Examples:
  script-lens story ./my-story.txt
  echo "He reads my messages and says I'm imagining things" | script-lens story
"#)]
    Story {
        /// File containing the story. Reads stdin when omitted.
        file: Option<PathBuf>,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Browse stored findings.
    #[command(subcommand)]
    Findings(FindingsCommands),

    /// Manage the typology catalogue.
    #[command(subcommand)]
    Typologies(TypologyCommands),

    /// Manage agent prompt templates.
    #[command(subcommand)]
    Prompts(PromptCommands),

    /// Run as an MCP server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// Findings subcommands.
#[derive(Subcommand, Debug)]
pub enum FindingsCommands {
    /// List stored findings, most severe first.
    #[command(after_help = r#"Examples:
  script-lens findings list
  script-lens findings list --min-severity warning --limit 20
  script-lens findings list --source "https://imsdb.com/scripts/Gone-Girl.html"
"#)]
    List {
        /// Minimum severity (danger, warning, info).
        #[arg(long)]
        min_severity: Option<String>,

        /// Maximum number of findings (0 = unlimited).
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,

        /// Only findings mined from this source.
        #[arg(long)]
        source: Option<String>,
    },

    /// Show one finding.
    Show {
        /// Finding ID.
        id: i64,
    },
}

/// Typology catalogue subcommands.
#[derive(Subcommand, Debug)]
pub enum TypologyCommands {
    /// Import typologies from a JSON array file.
    ///
    /// Existing entries with the same name (case-insensitive) are replaced.
    #[command(after_help = r#"Examples:
  script-lens typologies import ./typologies.json
"#)]
    Import {
        /// Path to the JSON file.
        path: PathBuf,
    },

    /// List typology names.
    List,

    /// Show one typology.
    Show {
        /// Typology name (case-insensitive).
        name: String,
    },
}

/// Prompt template subcommands.
#[derive(Subcommand, Debug)]
pub enum PromptCommands {
    /// Write the default prompt templates to disk.
    ///
    /// Existing files are left untouched.
    #[command(after_help = r#"Examples:
  script-lens prompts init                      # Write to ~/.config/script-lens/prompts/
  script-lens prompts init --dir ./my-prompts   # Write to custom directory
"#)]
    Init {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/script-lens/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// MCP server subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  script-lens mcp stdio                         # Start stdio MCP server
  OPENAI_API_KEY=sk-... script-lens mcp stdio   # With API key
"#)]
    Stdio,

    /// Start MCP server with streamable HTTP transport.
    #[command(after_help = r#"Examples:
  script-lens mcp http                            # Listen on 127.0.0.1:3000
  script-lens mcp http --host 0.0.0.0 --port 8080
"#)]
    Http {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli {
            db_path: None,
            verbose: 0,
            format: "text".to_string(),
            command: Commands::Typologies(TypologyCommands::List),
        };
        assert_eq!(
            cli.get_db_path(),
            PathBuf::from(crate::storage::DEFAULT_DB_PATH)
        );
    }

    #[test]
    fn test_search_parse() {
        let cli = Cli::try_parse_from([
            "script-lens",
            "search",
            "gone girl",
            "--search-url",
            "http://localhost:9/search.php",
        ])
        .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Search { query, search_url } => {
                assert_eq!(query, "gone girl");
                assert_eq!(search_url, "http://localhost:9/search.php");
            }
            _ => unreachable!(),
        }
        assert!(Cli::try_parse_from(["script-lens", "search"]).is_err());
    }

    #[test]
    fn test_analyze_requires_url_or_file() {
        assert!(Cli::try_parse_from(["script-lens", "analyze"]).is_err());
        assert!(
            Cli::try_parse_from(["script-lens", "analyze", "https://x", "--file", "a.txt"])
                .is_err()
        );

        let cli = Cli::try_parse_from(["script-lens", "-vv", "analyze", "--file", "a.txt"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze { url, file, .. } => {
                assert!(url.is_none());
                assert_eq!(file, Some(PathBuf::from("a.txt")));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_findings_list_defaults() {
        let cli = Cli::try_parse_from(["script-lens", "findings", "list"])
            .unwrap_or_else(|_| unreachable!());
        match cli.command {
            Commands::Findings(FindingsCommands::List {
                min_severity,
                limit,
                source,
            }) => {
                assert!(min_severity.is_none());
                assert_eq!(limit, 50);
                assert!(source.is_none());
            }
            _ => unreachable!(),
        }
    }
}
