//! CLI module for Quoteversation
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP API
//! - explain: Print the stage sequence for a post search

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command, ExplainArgs};
pub use commands::{build_state, explain, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
