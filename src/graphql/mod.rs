//! Z-Insights GraphQL module
//!
//! Z-Insights exposes analytics through a single GraphQL endpoint. Queries
//! go through the same retrying sender as REST calls, so they share the
//! session, rate limits and retry policy.
//!
//! Callers supply their own query documents; none are bundled here.

mod client;

pub use client::{GraphQlError, GraphQlRequest, GraphQlResponse, ZInsights, DEFAULT_GRAPHQL_PATH};

#[cfg(test)]
mod tests;
