//! Client configuration
//!
//! `ClientConfig` is loaded from YAML, overlaid with environment variables
//! and turned into the runtime settings of the HTTP client.
//!
//! ```yaml
//! cloud: zscalertwo
//! credentials:
//!   username: admin@example.com
//!   password: secret
//!   api_key: abcdefghijkl
//! http:
//!   timeout_seconds: 30
//!   max_retries: 3
//! rate_limit:
//!   read_limit: 2
//!   write_limit: 2
//! cache:
//!   enabled: true
//! ```

use crate::auth::{AuthConfig, SessionPolicy, MIN_API_KEY_LEN};
use crate::error::{Error, Result};
use crate::graphql::DEFAULT_GRAPHQL_PATH;
use crate::http::{CacheConfig, HttpClientConfig, RateLimiterConfig};
use crate::pagination::PageConfig;
use crate::types::{BackoffType, Cloud, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Environment Variables
// ============================================================================

/// Admin username for session login
pub const ENV_USERNAME: &str = "ZIA_USERNAME";
/// Admin password for session login
pub const ENV_PASSWORD: &str = "ZIA_PASSWORD";
/// API key for session login
pub const ENV_API_KEY: &str = "ZIA_API_KEY";
/// Cloud name (e.g. `zscalertwo`)
pub const ENV_CLOUD: &str = "ZIA_CLOUD";
/// Explicit API base URL, overriding the cloud
pub const ENV_BASE_URL: &str = "ZSCALER_BASE_URL";
/// Pre-issued bearer token
pub const ENV_BEARER_TOKEN: &str = "ZSCALER_BEARER_TOKEN";
/// Enable or disable the response cache
pub const ENV_CACHE_ENABLED: &str = "ZSCALER_CLIENT_CACHE_ENABLED";
/// Cache time-to-live in seconds
pub const ENV_CACHE_TTL: &str = "ZSCALER_CLIENT_CACHE_DEFAULT_TTL";
/// Cache time-to-idle in seconds
pub const ENV_CACHE_TTI: &str = "ZSCALER_CLIENT_CACHE_DEFAULT_TTI";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Cloud the tenant lives on
    #[serde(default)]
    pub cloud: Cloud,

    /// Explicit base URL (overrides `cloud`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Login credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Session lifetime configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Default pagination settings
    #[serde(default)]
    pub pagination: PageConfig,

    /// Z-Insights GraphQL endpoint path
    #[serde(default = "default_graphql_path")]
    pub graphql_path: String,
}

fn default_graphql_path() -> String {
    DEFAULT_GRAPHQL_PATH.to_string()
}

// ============================================================================
// Sections
// ============================================================================

/// Login credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Admin username
    #[serde(default)]
    pub username: Option<String>,
    /// Admin password
    #[serde(default)]
    pub password: Option<String>,
    /// Tenant API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Pre-issued bearer token (takes precedence over session login)
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("api_key", &mask(&self.api_key))
            .field("bearer_token", &mask(&self.bearer_token))
            .finish()
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Wait for a 429 without a retry-after hint, in seconds
    #[serde(default = "default_retry_after_fallback")]
    pub retry_after_fallback_seconds: u64,

    /// Override the User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Headers added to every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffConfig::default(),
            retry_after_fallback_seconds: default_retry_after_fallback(),
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_after_fallback() -> u64 {
    5
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::default(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_initial_delay() -> u64 {
    100
}

fn default_max_delay() -> u64 {
    60_000
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether client-side rate limiting is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Window length in milliseconds
    #[serde(default = "default_window")]
    pub window_ms: u64,

    /// GET/HEAD requests allowed per window
    #[serde(default = "default_limit")]
    pub read_limit: u32,

    /// Other requests allowed per window
    #[serde(default = "default_limit")]
    pub write_limit: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: default_window(),
            read_limit: default_limit(),
            write_limit: default_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_window() -> u64 {
    1000
}

fn default_limit() -> u32 {
    2
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Whether GET responses are cached
    #[serde(default)]
    pub enabled: bool,

    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,

    /// Time-to-idle in seconds
    #[serde(default = "default_tti")]
    pub tti_seconds: u64,

    /// Maximum number of cached responses
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_ttl(),
            tti_seconds: default_tti(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_tti() -> u64 {
    1800
}

fn default_max_entries() -> usize {
    1000
}

/// Session lifetime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server-side idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Log in again this many seconds before the idle timeout
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: default_idle_timeout(),
            refresh_margin_seconds: default_refresh_margin(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    1800
}

fn default_refresh_margin() -> u64 {
    300
}

// ============================================================================
// Loading
// ============================================================================

impl ClientConfig {
    /// Load a config file and overlay the process environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Build a config from defaults and the process environment only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load a config from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay values from an environment lookup.
    ///
    /// Set, non-empty variables win over values from the file.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).none_if_empty();

        if let Some(v) = get(ENV_USERNAME) {
            self.credentials.username = Some(v);
        }
        if let Some(v) = get(ENV_PASSWORD) {
            self.credentials.password = Some(v);
        }
        if let Some(v) = get(ENV_API_KEY) {
            self.credentials.api_key = Some(v);
        }
        if let Some(v) = get(ENV_BEARER_TOKEN) {
            self.credentials.bearer_token = Some(v);
        }
        if let Some(v) = get(ENV_CLOUD) {
            self.cloud = v.parse()?;
        }
        if let Some(v) = get(ENV_BASE_URL) {
            self.base_url = Some(v);
        }
        if let Some(v) = get(ENV_CACHE_ENABLED) {
            self.cache.enabled = parse_bool(ENV_CACHE_ENABLED, &v)?;
        }
        if let Some(v) = get(ENV_CACHE_TTL) {
            self.cache.ttl_seconds = parse_number(ENV_CACHE_TTL, &v)?;
        }
        if let Some(v) = get(ENV_CACHE_TTI) {
            self.cache.tti_seconds = parse_number(ENV_CACHE_TTI, &v)?;
        }
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check the config is usable
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.resolved_base_url())?;

        if let AuthConfig::Session { api_key, .. } = self.auth_config()? {
            if !api_key.is_ascii() {
                return Err(Error::invalid_value(
                    "credentials.api_key",
                    "must contain only ASCII characters",
                ));
            }
            if api_key.len() < MIN_API_KEY_LEN {
                return Err(Error::invalid_value(
                    "credentials.api_key",
                    format!("must be at least {MIN_API_KEY_LEN} characters"),
                ));
            }
        }

        if self.pagination.page_size == 0 {
            return Err(Error::invalid_value(
                "pagination.page_size",
                "must be greater than zero",
            ));
        }

        if self.rate_limit.enabled && self.rate_limit.window_ms == 0 {
            return Err(Error::invalid_value(
                "rate_limit.window_ms",
                "must be greater than zero",
            ));
        }

        if self.graphql_path.trim().is_empty() {
            return Err(Error::invalid_value("graphql_path", "cannot be empty"));
        }

        Ok(())
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Base URL from `base_url`, falling back to the cloud's URL
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .none_if_empty()
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.cloud.base_url())
    }

    /// Authentication from the configured credentials
    pub fn auth_config(&self) -> Result<AuthConfig> {
        let creds = &self.credentials;
        if let Some(token) = creds.bearer_token.clone().none_if_empty() {
            return Ok(AuthConfig::bearer(token));
        }

        let field = |value: &Option<String>, name: &str| {
            value
                .clone()
                .none_if_empty()
                .ok_or_else(|| Error::missing_field(format!("credentials.{name}")))
        };
        Ok(AuthConfig::session(
            field(&creds.username, "username")?,
            field(&creds.password, "password")?,
            field(&creds.api_key, "api_key")?,
        ))
    }

    /// Runtime settings for the HTTP client
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.resolved_base_url())
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.backoff.backoff_type,
                Duration::from_millis(self.http.backoff.initial_delay_ms),
                Duration::from_millis(self.http.backoff.max_delay_ms),
            )
            .retry_after_fallback(Duration::from_secs(self.http.retry_after_fallback_seconds))
            .session_policy(SessionPolicy {
                idle_timeout: Duration::from_secs(self.session.idle_timeout_seconds),
                refresh_margin: Duration::from_secs(self.session.refresh_margin_seconds),
            });

        builder = if self.rate_limit.enabled {
            builder.rate_limit(RateLimiterConfig::new(
                Duration::from_millis(self.rate_limit.window_ms),
                self.rate_limit.read_limit,
                self.rate_limit.write_limit,
            ))
        } else {
            builder.no_rate_limit()
        };

        if self.cache.enabled {
            builder = builder.cache(CacheConfig {
                ttl: Duration::from_secs(self.cache.ttl_seconds),
                tti: Duration::from_secs(self.cache.tti_seconds),
                max_entries: self.cache.max_entries,
            });
        }

        if let Some(agent) = &self.http.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        for (key, value) in &self.http.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        builder.build()
    }
}

fn parse_bool(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_value(
            field,
            format!("expected a boolean, got '{raw}'"),
        )),
    }
}

fn parse_number(field: &str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| {
        Error::invalid_value(field, format!("expected a whole number of seconds, got '{raw}'"))
    })
}
