//! Zscaler client façade
//!
//! Ties the configured HTTP client, pagination defaults and the Z-Insights
//! endpoint together behind one handle.

use crate::auth::SessionToken;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::graphql::ZInsights;
use crate::http::HttpClient;
use crate::pagination::{PageConfig, Paginator};
use serde::de::DeserializeOwned;
use tracing::info;

/// Entry point for ZIA and Z-Insights calls
#[derive(Debug)]
pub struct ZscalerClient {
    http: HttpClient,
    pagination: PageConfig,
    graphql_path: String,
}

impl ZscalerClient {
    /// Build a client from a validated config
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_auth(config.http_config(), config.auth_config()?)?;
        info!(
            "Zscaler client ready for {}",
            config.resolved_base_url()
        );
        Ok(Self {
            http,
            pagination: config.pagination.clone(),
            graphql_path: config.graphql_path.clone(),
        })
    }

    /// Build a client from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ClientConfig::from_env()?)
    }

    /// Wrap an already configured HTTP client
    pub fn with_http(http: HttpClient) -> Self {
        Self {
            http,
            pagination: PageConfig::default(),
            graphql_path: crate::graphql::DEFAULT_GRAPHQL_PATH.to_string(),
        }
    }

    /// Get the underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Get the default page configuration
    pub fn page_config(&self) -> &PageConfig {
        &self.pagination
    }

    /// Paginate a list endpoint with the default page configuration
    pub fn paginate(&self, path: &str) -> Paginator<'_, HttpClient> {
        self.paginate_with(path, self.pagination.clone())
    }

    /// Paginate a list endpoint with a custom page configuration
    pub fn paginate_with(&self, path: &str, config: PageConfig) -> Paginator<'_, HttpClient> {
        Paginator::new(&self.http, path, config)
    }

    /// Fetch every page of a list endpoint
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        self.paginate(path).collect_as().await
    }

    /// Get a Z-Insights GraphQL executor
    pub fn zinsights(&self) -> ZInsights<'_, HttpClient> {
        ZInsights::with_path(&self.http, self.graphql_path.as_str())
    }

    /// Establish a session now instead of on the first request
    pub async fn login(&self) -> Result<SessionToken> {
        match self.http.authenticator() {
            Some(auth) if auth.config().is_session() => auth.login().await,
            _ => Err(Error::auth("login requires session credentials")),
        }
    }

    /// End the current session, if any
    pub async fn logout(&self) -> Result<()> {
        self.http.logout().await
    }
}
