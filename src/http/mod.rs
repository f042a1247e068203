//! HTTP client module
//!
//! Provides the request execution core with retry, rate limiting and caching.
//!
//! # Features
//!
//! - **Automatic Retries**: 429 with server retry-after hints, edit-lock
//!   conflicts, gateway errors and transport failures
//! - **Rate Limiting**: Per-verb-class quotas (read vs write) via governor
//! - **Response Cache**: GET responses with TTL/TTI expiry
//! - **Authentication**: Integration with the auth module

mod cache;
mod client;
mod rate_limit;
mod response;

pub use cache::{CacheConfig, CacheKey, CacheStats, ResponseCache};
pub use client::{
    parse_retry_after, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig,
    RequestExecutor,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use response::ApiResponse;
