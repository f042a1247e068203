//! GraphQL request executor

use crate::error::{Error, Result};
use crate::http::{RequestConfig, RequestExecutor};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Z-Insights GraphQL endpoint, relative to the API base URL
pub const DEFAULT_GRAPHQL_PATH: &str = "/zins/graphql";

/// A GraphQL request document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest {
    /// Query or mutation text
    pub query: String,
    /// Variables, omitted from the payload when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl GraphQlRequest {
    /// Create a request without variables
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
        }
    }

    /// Attach variables
    #[must_use]
    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlError {
    /// Error message
    pub message: String,
    /// Path of the field that failed
    #[serde(default)]
    pub path: Option<Vec<Value>>,
    /// Server-specific details
    #[serde(default)]
    pub extensions: Option<Value>,
}

/// A GraphQL response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    /// Result data
    #[serde(default)]
    pub data: Option<Value>,
    /// Errors reported by the server
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// Turn the envelope into data, failing on any reported error
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        if !self.errors.is_empty() {
            return Err(Error::GraphQl {
                messages: self.errors.into_iter().map(|e| e.message).collect(),
            });
        }
        match self.data {
            None | Some(Value::Null) => Err(Error::decode("GraphQL response has no data")),
            Some(data) => Ok(serde_json::from_value(data)?),
        }
    }
}

/// Runs GraphQL queries against Z-Insights
pub struct ZInsights<'a, E: RequestExecutor + ?Sized> {
    executor: &'a E,
    path: String,
}

impl<'a, E: RequestExecutor + ?Sized> ZInsights<'a, E> {
    /// Create an executor for the default endpoint
    pub fn new(executor: &'a E) -> Self {
        Self::with_path(executor, DEFAULT_GRAPHQL_PATH)
    }

    /// Create an executor for a custom endpoint path
    pub fn with_path(executor: &'a E, path: impl Into<String>) -> Self {
        Self {
            executor,
            path: path.into(),
        }
    }

    /// Get the endpoint path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run a query and deserialize its `data`
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T> {
        let mut request = GraphQlRequest::new(query);
        request.variables = variables;
        self.execute(&request).await
    }

    /// Run a prepared request and deserialize its `data`
    pub async fn execute<T: DeserializeOwned>(&self, request: &GraphQlRequest) -> Result<T> {
        let body = serde_json::to_value(request)?;
        debug!("Running GraphQL query against {}", self.path);

        let response: GraphQlResponse = self
            .executor
            .execute(Method::POST, &self.path, RequestConfig::new().json(body))
            .await?
            .json()?;

        if !response.errors.is_empty() {
            warn!(
                "GraphQL query returned {} error(s)",
                response.errors.len()
            );
        }
        response.into_data()
    }
}

impl<E: RequestExecutor + ?Sized> std::fmt::Debug for ZInsights<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZInsights")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
