//! script-lens command-line entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use script_lens::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout carries only command output (or MCP frames).
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "script_lens=warn",
        1 => "script_lens=info",
        2 => "script_lens=debug",
        _ => "script_lens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                let _ = write!(std::io::stdout(), "{output}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "Error: {e}");
            ExitCode::FAILURE
        }
    }
}
