//! Owned HTTP response
//!
//! The body is read eagerly so a response can be cached and replayed.

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// A fully-read HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    /// Create a response from its parts
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Read a reqwest response to completion
    pub async fn read(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body))
    }

    /// HTTP status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// True for 2xx
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// An empty body deserializes as JSON `null`, which lets callers ask for
    /// `Option<T>` or `()` on 204 responses.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return serde_json::from_value(serde_json::Value::Null).map_err(Error::JsonParse);
        }
        serde_json::from_slice(&self.body).map_err(Error::JsonParse)
    }
}
