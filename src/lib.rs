// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # Zscaler Client
//!
//! Request execution core for the Zscaler Internet Access (ZIA) REST API and
//! the Z-Insights GraphQL API.
//!
//! ## Features
//!
//! - **Session Authentication**: Obfuscated API-key login, `JSESSIONID`
//!   cookie reuse, re-login on idle expiry or 401, explicit logout
//! - **Rate Limiting**: Separate quotas for read and write verbs
//! - **Retries**: 429 retry-after hints, edit-lock conflicts, gateway errors
//!   and transport failures, with constant/linear/exponential backoff
//! - **Response Cache**: GET responses with TTL/TTI expiry, invalidated on writes
//! - **Pagination**: `page`/`pageSize` iteration with item and page caps
//! - **Z-Insights**: GraphQL queries through the same pipeline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use zscaler_client::{ClientConfig, Result, ZscalerClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::load("zscaler.yaml")?;
//!     let client = ZscalerClient::from_config(&config)?;
//!
//!     let users: Vec<serde_json::Value> = client.list_all("/api/v1/users").await?;
//!     println!("{} users", users.len());
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         ZscalerClient                           │
//! │  paginate() → Paginator   zinsights() → ZInsights   login/logout│
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                    RequestExecutor (HttpClient)
//!                                │
//! ┌──────────────┬───────────────┴───────────┬──────────────────────┐
//! │    Cache     │       Rate Limiter        │        Auth          │
//! ├──────────────┼───────────────────────────┼──────────────────────┤
//! │ TTL / TTI    │ Read window               │ Session (JSESSIONID) │
//! │ LRU eviction │ Write window              │ Bearer token         │
//! └──────────────┴───────────────────────────┴──────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Session and bearer authentication
pub mod auth;

/// HTTP client with retry, rate limiting and caching
pub mod http;

/// Page-number pagination
pub mod pagination;

/// Z-Insights GraphQL
pub mod graphql;

/// Client configuration
pub mod config;

/// Client façade
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::ZscalerClient;
pub use config::ClientConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
