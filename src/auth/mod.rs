//! Authentication module
//!
//! Supports: ZIA session login (obfuscated API key + JSESSIONID cookie)
//! and pre-issued bearer tokens.
//!
//! The `Authenticator` applies credentials to outgoing requests and keeps
//! the session alive, logging in again when it nears its idle timeout.

mod authenticator;
mod obfuscate;
mod types;

pub use authenticator::{extract_session_id, Authenticator};
pub use obfuscate::{obfuscate_api_key, obfuscate_now, ObfuscatedKey, MIN_API_KEY_LEN};
pub use types::{AuthConfig, SessionInfo, SessionPolicy, SessionToken};

/// Name of the ZIA session cookie
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// Login/logout endpoint, relative to the API base URL
pub const SESSION_PATH: &str = "/api/v1/authenticatedSession";
