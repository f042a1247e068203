//! API key obfuscation for the ZIA session login
//!
//! The login endpoint never receives the raw API key. Instead the client
//! derives a twelve character key from the API key and the request
//! timestamp: six characters indexed by the last six digits of the
//! timestamp, then six indexed by those digits shifted right by one
//! (zero-padded), offset by two.

use crate::error::{Error, Result};

/// Minimum API key length the index scheme can address
pub const MIN_API_KEY_LEN: usize = 12;

/// An obfuscated key together with the timestamp it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscatedKey {
    /// Milliseconds since the epoch
    pub timestamp: i64,
    /// Derived key
    pub key: String,
}

/// Obfuscate `api_key` for the current time
pub fn obfuscate_now(api_key: &str) -> Result<ObfuscatedKey> {
    obfuscate_api_key(api_key, chrono::Utc::now().timestamp_millis())
}

/// Obfuscate `api_key` for a given millisecond timestamp
pub fn obfuscate_api_key(api_key: &str, timestamp: i64) -> Result<ObfuscatedKey> {
    if !api_key.is_ascii() {
        return Err(Error::invalid_value("api_key", "must be ASCII"));
    }
    if api_key.len() < MIN_API_KEY_LEN {
        return Err(Error::invalid_value(
            "api_key",
            format!("must be at least {MIN_API_KEY_LEN} characters"),
        ));
    }
    if timestamp < 0 {
        return Err(Error::invalid_value("timestamp", "must not be negative"));
    }

    let seed = api_key.as_bytes();
    let n = timestamp % 1_000_000;
    let r = n >> 1;
    let n_digits = format!("{n:06}");
    let r_digits = format!("{r:06}");

    let mut key = String::with_capacity(MIN_API_KEY_LEN);
    for d in n_digits.bytes() {
        key.push(seed[usize::from(d - b'0')] as char);
    }
    for d in r_digits.bytes() {
        key.push(seed[usize::from(d - b'0') + 2] as char);
    }

    Ok(ObfuscatedKey { timestamp, key })
}
