//! Auth configuration and session types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Authentication configuration
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication (mock servers, pre-authenticated proxies)
    #[default]
    None,

    /// ZIA session login with an obfuscated API key
    Session {
        /// Admin username
        username: String,
        /// Admin password
        password: String,
        /// Organization API key (the obfuscation seed)
        api_key: String,
    },

    /// Pre-issued bearer token (OneAPI / Z-Insights)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl AuthConfig {
    /// Create session auth
    pub fn session(
        username: impl Into<String>,
        password: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::Session {
            username: username.into(),
            password: password.into(),
            api_key: api_key.into(),
        }
    }

    /// Create bearer auth
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// True for session-based auth
    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session { .. })
    }
}

// Secrets stay out of logs and panics.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Session { username, .. } => f
                .debug_struct("Session")
                .field("username", username)
                .field("password", &"***")
                .field("api_key", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Server-side idle timeout of a session
    pub idle_timeout: std::time::Duration,
    /// Re-authenticate this long before the idle timeout would hit
    pub refresh_margin: std::time::Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: std::time::Duration::from_secs(1800),
            refresh_margin: std::time::Duration::from_secs(300),
        }
    }
}

/// Details returned by the `authenticatedSession` endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Authentication type (e.g. `ADMIN_LOGIN`)
    #[serde(default)]
    pub auth_type: Option<String>,
    /// Whether the tenant requires an obfuscated API key
    #[serde(default)]
    pub obfuscate_api_key: Option<bool>,
    /// Password expiry (epoch seconds, 0 = never)
    #[serde(default)]
    pub password_expiry_time: Option<i64>,
    /// Days until password expiry
    #[serde(default)]
    pub password_expiry_days: Option<i64>,
}

/// An authenticated ZIA session
#[derive(Clone)]
pub struct SessionToken {
    /// JSESSIONID value
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last time the session was used successfully
    pub last_used: DateTime<Utc>,
    /// Info returned at login
    pub info: SessionInfo,
}

impl SessionToken {
    /// Create a session that was just established
    pub fn new(id: impl Into<String>, info: SessionInfo) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            last_used: now,
            info,
        }
    }

    /// Mark the session as used now
    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }

    /// Check expiry against the current time
    pub fn is_expired(&self, policy: &SessionPolicy) -> bool {
        self.is_expired_at(policy, Utc::now())
    }

    /// Check expiry against `now`
    pub fn is_expired_at(&self, policy: &SessionPolicy, now: DateTime<Utc>) -> bool {
        let idle = to_chrono(policy.idle_timeout);
        let margin = to_chrono(policy.refresh_margin);
        match (
            now.checked_add_signed(margin),
            self.last_used.checked_add_signed(idle),
        ) {
            (Some(refresh_at), Some(deadline)) => refresh_at >= deadline,
            (_, None) => false,
            (None, Some(_)) => true,
        }
    }

    /// When the session is considered expired
    pub fn expires_at(&self, policy: &SessionPolicy) -> DateTime<Utc> {
        self.last_used
            .checked_add_signed(to_chrono(policy.idle_timeout) - to_chrono(policy.refresh_margin))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Value for the `Cookie` header
    pub fn cookie(&self) -> String {
        format!("{}={}", super::SESSION_COOKIE, self.id)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("id", &"***")
            .field("created_at", &self.created_at)
            .field("last_used", &self.last_used)
            .field("info", &self.info)
            .finish()
    }
}

fn to_chrono(d: std::time::Duration) -> Duration {
    Duration::from_std(d).unwrap_or_else(|_| Duration::days(36_500))
}
