//! HTTP client with retry, rate limiting and response caching
//!
//! Provides the request core every ZIA and Z-Insights call goes through:
//! - Response cache lookup for GET, invalidation for writes
//! - Per-verb-class rate limiting
//! - Session cookie / bearer authentication with transparent re-login
//! - Retries on 429 (honouring the server's retry-after hint), edit-lock
//!   conflicts, gateway errors and transport failures
//! - Error classification for non-2xx responses

use super::cache::{CacheConfig, CacheKey, ResponseCache};
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::response::ApiResponse;
use crate::auth::{AuthConfig, Authenticator, SessionPolicy};
use crate::error::{Error, Result};
use crate::types::BackoffType;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Wait used for a 429 that carries no retry-after hint
    pub retry_after_fallback: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Response cache configuration (`None` disables caching)
    pub cache: Option<CacheConfig>,
    /// Session expiry policy
    pub session_policy: SessionPolicy,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            retry_after_fallback: Duration::from_secs(5),
            rate_limit: Some(RateLimiterConfig::default()),
            cache: None,
            session_policy: SessionPolicy::default(),
            default_headers: HashMap::new(),
            user_agent: format!("zscaler-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set the fallback wait for 429 responses without a hint
    pub fn retry_after_fallback(mut self, wait: Duration) -> Self {
        self.config.retry_after_fallback = wait;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Enable the response cache
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.config.cache = Some(config);
        self
    }

    /// Set the session expiry policy
    pub fn session_policy(mut self, policy: SessionPolicy) -> Self {
        self.config.session_policy = policy;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
    /// Override max retries for this request
    pub max_retries: Option<u32>,
    /// Skip the response cache for this request
    pub bypass_cache: bool,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set max retries
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Skip the response cache
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

/// Anything that can execute an API request.
///
/// Implemented by [`HttpClient`]; pagination and GraphQL run on top of it.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Execute a request and return the fully-read response
    async fn execute(&self, method: Method, url: &str, config: RequestConfig)
        -> Result<ApiResponse>;
}

/// HTTP client with retry, rate limiting and caching
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
    cache: Option<ResponseCache>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        let cache = config.cache.clone().map(ResponseCache::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
            cache,
        })
    }

    /// Create a client with authentication
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.set_authenticator(auth_config)?;
        Ok(client)
    }

    /// Set the authenticator.
    ///
    /// Session auth logs in against the base URL, so one must be configured.
    pub fn set_authenticator(&mut self, auth_config: AuthConfig) -> Result<()> {
        let base_url = match (&self.config.base_url, auth_config.is_session()) {
            (Some(base), _) => base.clone(),
            (None, false) => String::new(),
            (None, true) => return Err(Error::missing_field("base_url")),
        };
        self.authenticator = Some(
            Authenticator::with_client(auth_config, base_url, self.client.clone())
                .with_policy(self.config.session_policy),
        );
        Ok(())
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Get the authenticator, if any
    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// Get the response cache, if enabled
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Get the rate limiter, if enabled
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// End the current session, if any
    pub async fn logout(&self) -> Result<()> {
        match &self.authenticator {
            Some(auth) => auth.logout().await,
            None => Ok(()),
        }
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.request(Method::GET, url, RequestConfig::default())
            .await
    }

    /// Make a GET request with config
    pub async fn get_with_config(&self, url: &str, config: RequestConfig) -> Result<ApiResponse> {
        self.request(Method::GET, url, config).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: Value) -> Result<ApiResponse> {
        self.request(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, body: Value) -> Result<ApiResponse> {
        self.request(Method::PUT, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<ApiResponse> {
        self.request(Method::DELETE, url, RequestConfig::default())
            .await
    }

    /// Make a generic request
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<ApiResponse> {
        let full_url = self.build_url(url);
        let max_retries = config.max_retries.unwrap_or(self.config.max_retries);
        let timeout = config.timeout.unwrap_or(self.config.timeout);

        let cache_key = match &self.cache {
            Some(_) if method == Method::GET && !config.bypass_cache => {
                Some(CacheKey::new(&method, &full_url, &config.query))
            }
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get(key) {
                return Ok(hit);
            }
        }

        if method != Method::GET {
            if let Some(cache) = &self.cache {
                cache.invalidate_url(&full_url);
            }
        }

        let mut last_error = None;
        let mut attempt = 0;
        let mut reauthenticated = false;

        while attempt <= max_retries {
            // Wait for rate limiter
            if let Some(ref limiter) = self.rate_limiter {
                limiter.acquire(&method).await;
            }

            let (req, session_id) = self
                .build_request(&method, &full_url, &config, timeout)
                .await?;

            // Status and body are read together so a connection dropped
            // mid-body counts as a transport failure
            let response = match send(req).await {
                Ok(response) => response,
                Err(e) => {
                    let error = if e.is_timeout() {
                        Error::Timeout {
                            timeout_ms: timeout.as_millis() as u64,
                        }
                    } else {
                        Error::Http(e)
                    };

                    if attempt < max_retries && error.is_retryable(&method) {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Transport error ({}), attempt {}/{}, retrying in {:?}",
                            error,
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
            };
            let status = response.status();

            // Server-side session expiry: log in again once
            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                if let (Some(auth), Some(stale)) = (self.session_authenticator(), &session_id) {
                    warn!("Received 401 for {} {}, re-authenticating", method, full_url);
                    auth.invalidate_if(stale).await;
                    reauthenticated = true;
                    continue;
                }
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(response.headers(), response.body())
                    .unwrap_or(self.config.retry_after_fallback);
                if attempt < max_retries {
                    warn!(
                        "Rate limited (429), attempt {}/{}, waiting {:?}",
                        attempt + 1,
                        max_retries + 1,
                        retry_after
                    );
                    tokio::time::sleep(retry_after).await;
                    attempt += 1;
                    continue;
                }
                return Err(Error::RateLimited {
                    retry_after_seconds: retry_after.as_secs(),
                });
            }

            if status.is_success() {
                if let Some(auth) = &self.authenticator {
                    auth.touch().await;
                }
                if let Some(cache) = &self.cache {
                    match &cache_key {
                        Some(key) => cache.insert(key.clone(), response.clone()),
                        // A GET that raced this write may have stored the old body
                        None if method != Method::GET => cache.invalidate_url(&full_url),
                        None => {}
                    }
                }
                debug!("Request succeeded: {} {}", method, full_url);
                return Ok(response);
            }

            let error = Error::from_status(status.as_u16(), &response.text());

            if attempt < max_retries && error.is_retryable(&method) {
                let delay = self.calculate_backoff(attempt);
                warn!(
                    "Request failed with {}, attempt {}/{}, retrying in {:?}",
                    status.as_u16(),
                    attempt + 1,
                    max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        // Exhausted all retries
        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    /// Make a request and parse JSON response
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.request(method, url, config).await?.json()
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.request_json(Method::GET, url, RequestConfig::default())
            .await
    }

    /// Make a GET request with config and parse JSON response
    pub async fn get_json_with_config<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.request_json(Method::GET, url, config).await
    }

    /// Make a POST request and parse JSON response
    pub async fn post_json<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        self.request_json(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Make a PUT request and parse JSON response
    pub async fn put_json<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T> {
        self.request_json(Method::PUT, url, RequestConfig::default().json(body))
            .await
    }

    /// Build the outgoing request for one attempt, along with the session id
    /// it carries
    async fn build_request(
        &self,
        method: &Method,
        url: &str,
        config: &RequestConfig,
        timeout: Duration,
    ) -> Result<(RequestBuilder, Option<String>)> {
        let mut req = self.client.request(method.clone(), url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        if let Some(ref body) = config.body {
            req = req.json(body);
        }

        req = req.timeout(timeout);

        match self.authenticator {
            Some(ref auth) => auth.authorize(req).await,
            None => Ok((req, None)),
        }
    }

    fn session_authenticator(&self) -> Option<&Authenticator> {
        self.authenticator
            .as_ref()
            .filter(|auth| auth.config().is_session())
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff.saturating_mul(attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

#[async_trait]
impl RequestExecutor for HttpClient {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        config: RequestConfig,
    ) -> Result<ApiResponse> {
        self.request(method, url, config).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .field("has_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// Send a request and read the whole response
async fn send(req: RequestBuilder) -> reqwest::Result<ApiResponse> {
    ApiResponse::read(req.send().await?).await
}

/// Extract the server's retry-after hint.
///
/// Checks the `Retry-After` header (integer seconds) first, then a
/// `"Retry-After": "13 seconds"` field in a JSON body, which is how ZIA
/// reports it.
pub fn parse_retry_after(headers: &HeaderMap, body: &[u8]) -> Option<Duration> {
    let from_header = headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_seconds);
    if from_header.is_some() {
        return from_header;
    }

    let json: Value = serde_json::from_slice(body).ok()?;
    let field = json.as_object()?.iter().find_map(|(k, v)| {
        k.eq_ignore_ascii_case("retry-after")
            .then_some(v)
    })?;
    match field {
        Value::Number(n) => n.as_u64().map(Duration::from_secs),
        Value::String(s) => parse_seconds(s),
        _ => None,
    }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.split_whitespace()
        .next()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
