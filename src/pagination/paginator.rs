//! Page-number paginator
//!
//! Walks a list endpoint page by page through any [`RequestExecutor`],
//! stopping on an empty page, the server's page counter or the caller's caps.

use super::types::{extract_count, extract_items, Page, PageConfig, PaginationState, StopReason};
use crate::error::{Error, Result};
use crate::http::{RequestConfig, RequestExecutor};
use futures::stream::{self, Stream};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Iterates the pages of a list endpoint
pub struct Paginator<'a, E: RequestExecutor + ?Sized> {
    executor: &'a E,
    path: String,
    config: PageConfig,
    query: HashMap<String, String>,
    state: PaginationState,
}

impl<'a, E: RequestExecutor + ?Sized> Paginator<'a, E> {
    /// Create a paginator for `path`
    pub fn new(executor: &'a E, path: impl Into<String>, config: PageConfig) -> Self {
        let state = PaginationState::with_page(config.start_page);
        Self {
            executor,
            path: path.into(),
            config,
            query: HashMap::new(),
            state,
        }
    }

    /// Add a query parameter sent with every page request
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Get the page configuration
    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Get the iteration state
    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// Check if there are no more pages
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// Fetch the next page, or `None` once pagination is complete
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.state.is_done() {
            return Ok(None);
        }
        if let Some(reason) = self.cap_reached() {
            self.state.stop(reason);
            return Ok(None);
        }

        let number = self.state.page;
        let request = self.request_for(number);
        let body: Value = self
            .executor
            .execute(Method::GET, &self.path, request)
            .await?
            .json()?;

        let total_pages = self
            .config
            .total_pages_path
            .as_deref()
            .and_then(|path| extract_count(&body, path));
        let mut items = extract_items(body, self.config.items_path.as_deref())?;

        if items.is_empty() {
            debug!("Page {} of {} is empty, stopping", number, self.path);
            self.state.stop(StopReason::EmptyPage);
            return Ok(None);
        }

        if let Some(max) = self.config.max_items {
            let remaining = max.saturating_sub(self.state.items_fetched);
            if items.len() >= remaining {
                items.truncate(remaining);
                self.state.stop(StopReason::MaxItems);
            }
        }

        self.state.record(items.len());
        if total_pages.is_some() {
            self.state.total_pages = total_pages;
        }
        debug!(
            "Fetched page {} of {} ({} items, {} total)",
            number,
            self.path,
            items.len(),
            self.state.items_fetched
        );

        if let Some(total) = self.state.total_pages {
            if self.ordinal(number) >= total {
                self.state.stop(StopReason::TotalPages);
            }
        }
        if let Some(reason) = self.cap_reached() {
            self.state.stop(reason);
        }

        Ok(Some(Page { number, items }))
    }

    /// Fetch every remaining page and concatenate the items
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page.items);
        }
        Ok(all)
    }

    /// Fetch every remaining page and deserialize the items
    pub async fn collect_as<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        self.collect_all()
            .await?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Error::from))
            .collect()
    }

    /// Expose the remaining pages as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> + 'a
    where
        E: 'a,
    {
        stream::try_unfold(self, |mut paginator| async move {
            Ok(paginator.next_page().await?.map(|page| (page, paginator)))
        })
    }

    fn request_for(&self, page: u32) -> RequestConfig {
        let mut request = RequestConfig::new();
        request.query = self.query.clone();
        request
            .query(self.config.page_param.as_str(), page.to_string())
            .query(
                self.config.page_size_param.as_str(),
                self.config.page_size.to_string(),
            )
    }

    /// One-based position of a page number, as the server counts pages
    fn ordinal(&self, page: u32) -> u32 {
        if self.config.start_page == 0 {
            page + 1
        } else {
            page
        }
    }

    fn cap_reached(&self) -> Option<StopReason> {
        if let Some(max) = self.config.max_items {
            if self.state.items_fetched >= max {
                return Some(StopReason::MaxItems);
            }
        }
        match self.config.max_pages {
            Some(max) if self.state.pages_fetched >= max => Some(StopReason::MaxPages),
            _ => None,
        }
    }
}

impl<E: RequestExecutor + ?Sized> std::fmt::Debug for Paginator<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
