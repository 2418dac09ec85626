//! # script-lens
//!
//! Mines interpersonal manipulation patterns from movie scripts.
//!
//! A run fetches one script, splits it into fixed-size excerpts and feeds
//! them, one per turn, to a primary agent inside a single continuing
//! conversation. When an excerpt shows something worth classifying, the
//! primary agent delegates it through the `analyze_pattern` tool to a
//! delegate agent, which consults the typology catalogue and persists
//! findings. Runs are bounded by a turn cap; the outward result is always
//! the `done` sentinel, with a [`agent::RunReport`] that says whether the
//! script was exhausted or capped.
//!
//! ## Layout
//!
//! - [`agent`]: agents, tool loop, providers and the [`agent::Orchestrator`]
//! - [`source`]: document sources (HTTP with script-body extraction, local files)
//! - [`chunking`]: fixed-size character chunker
//! - [`storage`]: finding and typology stores (`SQLite`)
//! - [`credentials`]: API key resolution and caller attribution
//! - [`cli`]: the `script-lens` command line
//! - `mcp`: MCP server (feature `mcp`)

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod core;
pub mod credentials;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod source;
pub mod storage;

pub use error::{Error, Result};
