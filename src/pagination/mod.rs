//! Pagination module
//!
//! ZIA list endpoints page with `page` / `pageSize` query parameters and
//! return either a bare JSON array or an object wrapping one.
//!
//! # Overview
//!
//! A [`Paginator`] requests successive page numbers through any
//! [`RequestExecutor`](crate::http::RequestExecutor) and stops on:
//! - an empty page
//! - the page number reaching the server's total-pages counter
//! - `max_pages` pages fetched
//! - `max_items` items collected (the final page is truncated)

mod paginator;
mod types;

pub use paginator::Paginator;
pub use types::{
    extract_count, extract_items, lookup_path, Page, PageConfig, PaginationState, StopReason,
};
