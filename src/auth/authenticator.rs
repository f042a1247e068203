//! Authenticator implementation
//!
//! Applies authentication to requests and owns the ZIA session lifecycle:
//! login, expiry tracking, transparent re-login and logout.

use super::obfuscate::obfuscate_now;
use super::types::{AuthConfig, SessionInfo, SessionPolicy, SessionToken};
use super::{SESSION_COOKIE, SESSION_PATH};
use crate::error::{ApiErrorBody, Error, Result};
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Session expiry settings
    policy: SessionPolicy,
    /// API base URL (login and logout live under it)
    base_url: String,
    /// Current session for session auth
    session: Arc<RwLock<Option<SessionToken>>>,
    /// HTTP client for login/logout requests
    http_client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    api_key: &'a str,
    username: &'a str,
    password: &'a str,
    timestamp: i64,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig, base_url: impl Into<String>) -> Self {
        Self::with_client(config, base_url, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, base_url: impl Into<String>, http_client: Client) -> Self {
        Self {
            config,
            policy: SessionPolicy::default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Override the session expiry policy
    #[must_use]
    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        self.authorize(req).await.map(|(req, _)| req)
    }

    /// Apply authentication and report the session id the request carries.
    ///
    /// The id is what [`invalidate_if`](Self::invalidate_if) expects when the
    /// server later rejects the request.
    pub async fn authorize(&self, req: RequestBuilder) -> Result<(RequestBuilder, Option<String>)> {
        match &self.config {
            AuthConfig::None => Ok((req, None)),
            AuthConfig::Bearer { token } => Ok((req.bearer_auth(token), None)),
            AuthConfig::Session { .. } => {
                let session = self.get_or_refresh_session().await?;
                Ok((req.header(COOKIE, session.cookie()), Some(session.id)))
            }
        }
    }

    /// Get a valid session, logging in if necessary
    async fn get_or_refresh_session(&self) -> Result<SessionToken> {
        {
            let cached = self.session.read().await;
            if let Some(session) = cached.as_ref() {
                if !session.is_expired(&self.policy) {
                    return Ok(session.clone());
                }
            }
        }

        let mut cached = self.session.write().await;

        // Another task may have logged in while we waited for the lock
        if let Some(session) = cached.as_ref() {
            if !session.is_expired(&self.policy) {
                return Ok(session.clone());
            }
            debug!("Session expired, re-authenticating");
        }

        let session = self.fetch_session().await?;
        *cached = Some(session.clone());
        Ok(session)
    }

    /// Force a fresh login, replacing any current session
    pub async fn login(&self) -> Result<SessionToken> {
        if !self.config.is_session() {
            return Err(Error::auth("Login is only supported for session auth"));
        }
        let mut cached = self.session.write().await;
        let session = self.fetch_session().await?;
        *cached = Some(session.clone());
        Ok(session)
    }

    /// Perform the login exchange
    async fn fetch_session(&self) -> Result<SessionToken> {
        let AuthConfig::Session {
            username,
            password,
            api_key,
        } = &self.config
        else {
            return Err(Error::auth("Session login requires session credentials"));
        };

        let obfuscated = obfuscate_now(api_key)?;
        let body = LoginRequest {
            api_key: &obfuscated.key,
            username,
            password,
            timestamp: obfuscated.timestamp,
        };

        let url = self.session_url();
        debug!(url = %url, username = %username, "Logging in");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        if !status.is_success() {
            let text = read_error_body(response).await;
            let parsed = ApiErrorBody::parse(&text);
            let detail = parsed.message.unwrap_or(text);
            return Err(Error::Auth {
                message: format!("Login request failed with status {}: {detail}", status.as_u16()),
            });
        }

        let session_id = extract_session_id(response.headers()).ok_or_else(|| {
            Error::auth(format!("Login response did not set a {SESSION_COOKIE} cookie"))
        })?;

        let text = response.text().await.map_err(Error::Http)?;
        let session_info: SessionInfo = if text.trim().is_empty() {
            SessionInfo::default()
        } else {
            serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring unparseable login response body");
                SessionInfo::default()
            })
        };

        info!(
            username = %username,
            auth_type = session_info.auth_type.as_deref().unwrap_or("unknown"),
            "Authenticated session established"
        );
        Ok(SessionToken::new(session_id, session_info))
    }

    /// End the current session.
    ///
    /// The local session is dropped even when the server call fails.
    /// Without a session this is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let response = self
            .http_client
            .delete(self.session_url())
            .header(COOKIE, session.cookie())
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        if !status.is_success() {
            let text = read_error_body(response).await;
            warn!(status = status.as_u16(), "Logout request failed");
            return Err(Error::from_status(status.as_u16(), &text));
        }

        info!("Session logged out");
        Ok(())
    }

    /// Drop the current session so the next request logs in again
    pub async fn invalidate(&self) {
        let mut cached = self.session.write().await;
        if cached.take().is_some() {
            debug!("Session invalidated");
        }
    }

    /// Drop the current session only if it is still `stale_id`.
    ///
    /// A session another task already re-established is kept, so concurrent
    /// requests rejected with the same stale cookie trigger one login.
    /// Returns whether a session was dropped.
    pub async fn invalidate_if(&self, stale_id: &str) -> bool {
        let mut cached = self.session.write().await;
        if cached.as_ref().is_some_and(|session| session.id == stale_id) {
            *cached = None;
            debug!("Session invalidated");
            true
        } else {
            false
        }
    }

    /// Record a successful use of the session
    pub async fn touch(&self) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.touch();
        }
    }

    /// Current session, if any
    pub async fn session(&self) -> Option<SessionToken> {
        self.session.read().await.clone()
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Get the session policy
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    fn session_url(&self) -> String {
        format!("{}{SESSION_PATH}", self.base_url)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Read an error response body, logging instead of failing when it is lost
async fn read_error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_else(|e| {
        debug!(error = %e, "Failed to read error response body");
        String::new()
    })
}

/// Pull the session id out of `Set-Cookie` headers
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            cookie.split(';').find_map(|part| {
                let (name, value) = part.trim().split_once('=')?;
                (name.trim() == SESSION_COOKIE && !value.trim().is_empty())
                    .then(|| value.trim().to_string())
            })
        })
}
