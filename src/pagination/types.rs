//! Pagination types
//!
//! Page configuration, iteration state and the helpers that pull the item
//! array and page counters out of a response body.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for page-number pagination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Query parameter carrying the page number
    pub page_param: String,
    /// Query parameter carrying the page size
    pub page_size_param: String,
    /// Items requested per page
    pub page_size: u32,
    /// Number of the first page
    pub start_page: u32,
    /// Dotted path to the item array when the response is an object
    pub items_path: Option<String>,
    /// Dotted path to a total-pages counter in the response
    pub total_pages_path: Option<String>,
    /// Stop after this many pages
    pub max_pages: Option<u32>,
    /// Stop after this many items (the result is truncated to exactly this)
    pub max_items: Option<usize>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_param: "page".to_string(),
            page_size_param: "pageSize".to_string(),
            page_size: 100,
            start_page: 1,
            items_path: None,
            total_pages_path: None,
            max_pages: None,
            max_items: None,
        }
    }
}

impl PageConfig {
    /// Create a config with the ZIA defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Set the first page number
    #[must_use]
    pub fn start_page(mut self, page: u32) -> Self {
        self.start_page = page;
        self
    }

    /// Rename the page and page-size query parameters
    #[must_use]
    pub fn params(mut self, page_param: impl Into<String>, size_param: impl Into<String>) -> Self {
        self.page_param = page_param.into();
        self.page_size_param = size_param.into();
        self
    }

    /// Read items from a nested array instead of a top-level one
    #[must_use]
    pub fn items_path(mut self, path: impl Into<String>) -> Self {
        self.items_path = Some(path.into());
        self
    }

    /// Stop when the page number reaches the counter at this path
    #[must_use]
    pub fn total_pages_path(mut self, path: impl Into<String>) -> Self {
        self.total_pages_path = Some(path.into());
        self
    }

    /// Cap the number of pages fetched
    #[must_use]
    pub fn max_pages(mut self, pages: u32) -> Self {
        self.max_pages = Some(pages);
        self
    }

    /// Cap the number of items returned
    #[must_use]
    pub fn max_items(mut self, items: usize) -> Self {
        self.max_items = Some(items);
        self
    }
}

/// Why pagination finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The server returned a page with no items
    EmptyPage,
    /// The page number reached the server's total-pages counter
    TotalPages,
    /// `max_pages` pages were fetched
    MaxPages,
    /// `max_items` items were collected
    MaxItems,
}

/// One fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Page number as sent to the server
    pub number: u32,
    /// Items on this page (already truncated to `max_items`)
    pub items: Vec<Value>,
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Next page number to request
    pub page: u32,
    /// Pages fetched so far (empty final page excluded)
    pub pages_fetched: u32,
    /// Items returned so far
    pub items_fetched: usize,
    /// Total pages reported by the server, if known
    pub total_pages: Option<u32>,
    /// Set once pagination is complete
    pub stopped: Option<StopReason>,
}

impl PaginationState {
    /// Create state starting at the given page
    pub fn with_page(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Check if pagination is complete
    pub fn is_done(&self) -> bool {
        self.stopped.is_some()
    }

    /// Mark pagination as complete
    pub fn stop(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }

    /// Record a fetched page and advance to the next one
    pub fn record(&mut self, items: usize) {
        self.pages_fetched += 1;
        self.items_fetched += items;
        self.page += 1;
    }
}

/// Follow a dotted path (`"a.b.c"`, optionally prefixed with `$.`)
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Pull the item array out of a page body
pub fn extract_items(body: Value, items_path: Option<&str>) -> Result<Vec<Value>> {
    match (body, items_path) {
        (Value::Array(items), None) => Ok(items),
        (body @ Value::Object(_), Some(path)) => match lookup_path(&body, path) {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(Value::Null) | None => Err(Error::RecordExtraction {
                path: path.to_string(),
                message: "no array found at path".to_string(),
            }),
            Some(other) => Err(Error::RecordExtraction {
                path: path.to_string(),
                message: format!("expected an array, found {}", kind(other)),
            }),
        },
        (Value::Array(items), Some(_)) => Ok(items),
        (other, None) => Err(Error::decode(format!(
            "expected a JSON array page, found {}",
            kind(&other)
        ))),
        (other, Some(path)) => Err(Error::RecordExtraction {
            path: path.to_string(),
            message: format!("expected an object, found {}", kind(&other)),
        }),
    }
}

/// Read a page counter that may be a number or a numeric string
pub fn extract_count(body: &Value, path: &str) -> Option<u32> {
    match lookup_path(body, path)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
