//! CLI layer for script-lens.
//!
//! Provides the command-line interface using clap, with commands for
//! running the analysis pipeline, analysing stories, and browsing stored
//! findings and typologies.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "mcp")]
pub use parser::McpCommands;
pub use parser::{
    Cli, Commands, FindingsCommands, ModelArgs, PromptCommands, TypologyCommands,
};
