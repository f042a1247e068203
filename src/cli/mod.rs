//! CLI module
//!
//! Command-line interface for ad-hoc ZIA and Z-Insights calls.
//!
//! # Commands
//!
//! - `check` - Log in to test credentials
//! - `get` - GET a single API path
//! - `list` - Fetch every page of a list endpoint
//! - `graphql` - Run a Z-Insights GraphQL query

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
