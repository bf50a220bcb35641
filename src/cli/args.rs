//! CLI argument definitions using clap
//!
//! Commands:
//! - quoteversation serve [--config <path>] [--port <port>]
//! - quoteversation explain [--search-term ..] [--after ..] [--before ..] [--source ..] [--sort ..] [--skip ..]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::search::{PostsQuery, DEFAULT_SEARCH_INDEX};

/// Quoteversation - share, search and like quotes
#[derive(Parser, Debug)]
#[command(name = "quoteversation")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Path to configuration file (default: ./quoteversation.json if present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the stage sequence a post search would run, as JSON
    Explain(ExplainArgs),
}

#[derive(Args, Debug, Default)]
pub struct ExplainArgs {
    /// Free-text term matched against quote and source
    #[arg(long)]
    pub search_term: Option<String>,

    /// Only posts on or after this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Only posts on or before this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub before: Option<String>,

    /// Source text that must match
    #[arg(long)]
    pub source: Option<String>,

    /// Sort keys, e.g. `datePosted:desc,quote:asc`
    #[arg(long)]
    pub sort: Option<String>,

    /// Results to skip
    #[arg(long)]
    pub skip: Option<u64>,

    /// Search index name
    #[arg(long, default_value = DEFAULT_SEARCH_INDEX)]
    pub index: String,
}

impl ExplainArgs {
    /// The same query `GET /posts` would receive
    pub fn to_query(&self) -> PostsQuery {
        PostsQuery {
            search_term: self.search_term.clone(),
            before_date: self.before.clone(),
            after_date: self.after.clone(),
            source: self.source.clone(),
            sort: self.sort.clone(),
            skip: self.skip.map(|n| n.to_string()),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
