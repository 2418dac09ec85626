//! MCP (Model Context Protocol) server for script-lens.
//!
//! This is how the surrounding application starts pipeline runs: one
//! `analyze_script` call per script URL, one `analyze_story` call per story.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag (enabled by default).
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ analyze_script(script_url, api_key?)
//! ScriptLensServer
//!   ↓ api_key param, else SCRIPT_LENS_API_KEY / OPENAI_API_KEY
//! Orchestrator::analyze()
//!   ├── HttpDocumentSource (fetch + extract script body)
//!   ├── PrimaryAgent turns (≤ turn cap)
//!   └── DelegateAgent → findings table
//!   ↓
//! RunReport JSON ("result": "done") → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{AnalyzeScriptParams, AnalyzeStoryParams};
pub use server::ScriptLensServer;
pub use transport::{serve_http, serve_stdio};
