//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Zscaler ZIA / Z-Insights client CLI
#[derive(Parser, Debug)]
#[command(name = "zscaler-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML); environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and out to test credentials
    Check,

    /// GET a single API path
    Get {
        /// API path (e.g. /api/v1/status)
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// Skip the response cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Fetch every page of a list endpoint
    List {
        /// API path (e.g. /api/v1/users)
        path: String,

        /// Items per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Stop after this many items
        #[arg(long)]
        max_items: Option<usize>,

        /// Dotted path to the item array in object responses
        #[arg(long)]
        items_path: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },

    /// Run a Z-Insights GraphQL query
    Graphql {
        /// Inline query document
        #[arg(long, conflicts_with = "query_file", required_unless_present = "query_file")]
        query: Option<String>,

        /// File containing the query document
        #[arg(long)]
        query_file: Option<PathBuf>,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse a `key=value` argument
fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
