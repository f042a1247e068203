//! Response cache with TTL/TTI expiry
//!
//! Successful GET responses are kept in memory, keyed by method, URL and
//! sorted query parameters. Entries expire a fixed time after insertion
//! (TTL) or after sitting unused (TTI). Writes to a URL drop every entry for
//! that URL.

use super::response::ApiResponse;
use dashmap::DashMap;
use reqwest::Method;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Configuration for the response cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Time-to-live since insertion
    pub ttl: Duration,
    /// Time-to-idle since last access
    pub tti: Duration,
    /// Maximum number of entries kept
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            tti: Duration::from_secs(1800),
            max_entries: 1000,
        }
    }
}

/// Cache key: method, URL without query, and sorted query parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
}

impl CacheKey {
    /// Build a key from request parts.
    ///
    /// Any query string already on `url` is folded into the parameter list
    /// so `"/users?page=1"` and `"/users"` + `{page: 1}` share a key.
    pub fn new(method: &Method, url: &str, query: &HashMap<String, String>) -> Self {
        let (base, inline) = split_query(url);
        let mut params: Vec<(String, String)> = inline;
        params.extend(query.iter().map(|(k, v)| (k.clone(), v.clone())));
        params.sort();
        Self {
            method: method.clone(),
            url: base.to_string(),
            query: params,
        }
    }

    /// URL without query string
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            f.write_str(if i == 0 { "?" } else { "&" })?;
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Strip the query string off a URL, returning it as pairs
fn split_query(url: &str) -> (&str, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((base, query)) => {
            let pairs = url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (base, pairs)
        }
        None => (url, Vec::new()),
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: ApiResponse,
    inserted_at: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, config: &CacheConfig) -> bool {
        now.saturating_duration_since(self.inserted_at) >= config.ttl
            || now.saturating_duration_since(self.last_access) >= config.tti
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that missed or found an expired entry
    pub misses: u64,
    /// Entries currently stored
    pub entries: usize,
}

/// In-memory GET response cache
pub struct ResponseCache {
    config: CacheConfig,
    entries: DashMap<CacheKey, CacheEntry>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl ResponseCache {
    /// Create a new cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            hits: 0.into(),
            misses: 0.into(),
        }
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a fresh entry, refreshing its idle timer
    pub fn get(&self, key: &CacheKey) -> Option<ApiResponse> {
        self.get_at(key, Instant::now())
    }

    /// Same as [`get`](Self::get) at an explicit instant
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<ApiResponse> {
        use std::sync::atomic::Ordering;

        let expired = match self.entries.get_mut(key) {
            None => false,
            Some(mut entry) => {
                if entry.is_expired(now, &self.config) {
                    true
                } else {
                    entry.last_access = now;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache hit");
                    return Some(entry.response.clone());
                }
            }
        };

        // Another task may have stored a fresh entry since the lookup
        if expired
            && self
                .entries
                .remove_if(key, |_, entry| entry.is_expired(now, &self.config))
                .is_some()
        {
            debug!(key = %key, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a response. Non-2xx responses are ignored.
    pub fn insert(&self, key: CacheKey, response: ApiResponse) {
        self.insert_at(key, response, Instant::now());
    }

    /// Same as [`insert`](Self::insert) at an explicit instant
    pub fn insert_at(&self, key: CacheKey, response: ApiResponse, now: Instant) {
        if !response.is_success() || self.config.max_entries == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.purge_expired_at(now);
            if self.entries.len() >= self.config.max_entries {
                self.evict_least_recent();
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: now,
                last_access: now,
            },
        );
    }

    /// Drop every entry for `url`, whatever its method or query
    pub fn invalidate_url(&self, url: &str) {
        let (base, _) = split_query(url);
        let before = self.entries.len();
        self.entries.retain(|key, _| key.url != base);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(url = base, removed, "Invalidated cached responses");
        }
    }

    /// Drop one entry
    pub fn remove(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries
    pub fn purge_expired(&self) {
        self.purge_expired_at(Instant::now());
    }

    fn purge_expired_at(&self, now: Instant) {
        self.entries
            .retain(|_, entry| !entry.is_expired(now, &self.config));
    }

    fn evict_least_recent(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_access)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!(key = %key, "Evicting least recently used cache entry");
            self.entries.remove(&key);
        }
    }

    /// Number of stored entries (including not-yet-purged expired ones)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;

    fn response(body: &'static str) -> ApiResponse {
        ApiResponse::new(StatusCode::OK, HeaderMap::new(), body)
    }

    fn key(url: &str, query: &[(&str, &str)]) -> CacheKey {
        let query = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CacheKey::new(&Method::GET, url, &query)
    }

    fn cache(ttl: u64, tti: u64, max_entries: usize) -> ResponseCache {
        ResponseCache::new(CacheConfig {
            ttl: Duration::from_secs(ttl),
            tti: Duration::from_secs(tti),
            max_entries,
        })
    }

    #[test]
    fn test_key_sorts_and_merges_query() {
        let a = key("https://x/api/v1/users?search=bob", &[("page", "1")]);
        let b = key("https://x/api/v1/users", &[("page", "1"), ("search", "bob")]);
        assert_eq!(a, b);
        assert_eq!(a.url(), "https://x/api/v1/users");
        assert_eq!(a.to_string(), "GET https://x/api/v1/users?page=1&search=bob");
    }

    #[test]
    fn test_key_differs_by_method() {
        let get = CacheKey::new(&Method::GET, "https://x/a", &HashMap::new());
        let post = CacheKey::new(&Method::POST, "https://x/a", &HashMap::new());
        assert_ne!(get, post);
    }

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = cache(60, 60, 10);
        let k = key("https://x/a", &[]);
        assert!(cache.get(&k).is_none());

        cache.insert(k.clone(), response("[1]"));
        let hit = cache.get(&k).unwrap();
        assert_eq!(hit.text(), "[1]");
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache = cache(10, 100, 10);
        let k = key("https://x/a", &[]);
        let t0 = Instant::now();
        cache.insert_at(k.clone(), response("{}"), t0);

        assert!(cache.get_at(&k, t0 + Duration::from_secs(9)).is_some());
        assert!(cache.get_at(&k, t0 + Duration::from_secs(10)).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_tti_expiry_refreshed_by_access() {
        let cache = cache(100, 10, 10);
        let k = key("https://x/a", &[]);
        let t0 = Instant::now();
        cache.insert_at(k.clone(), response("{}"), t0);

        assert!(cache.get_at(&k, t0 + Duration::from_secs(8)).is_some());
        assert!(cache.get_at(&k, t0 + Duration::from_secs(16)).is_some());
        assert!(cache.get_at(&k, t0 + Duration::from_secs(26)).is_none());
    }

    #[tokio::test]
    async fn test_non_success_not_cached() {
        let cache = cache(60, 60, 10);
        let k = key("https://x/a", &[]);
        cache.insert(
            k.clone(),
            ApiResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "{}"),
        );
        assert!(cache.get(&k).is_none());
    }

    #[tokio::test]
    async fn test_invalidate_url_drops_all_queries() {
        let cache = cache(60, 60, 10);
        cache.insert(key("https://x/users", &[("page", "1")]), response("[]"));
        cache.insert(key("https://x/users", &[("page", "2")]), response("[]"));
        cache.insert(key("https://x/groups", &[]), response("[]"));

        cache.invalidate_url("https://x/users?page=9");
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("https://x/groups", &[])).is_some());
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = cache(600, 600, 2);
        let t0 = Instant::now();
        let a = key("https://x/a", &[]);
        let b = key("https://x/b", &[]);
        let c = key("https://x/c", &[]);

        cache.insert_at(a.clone(), response("a"), t0);
        cache.insert_at(b.clone(), response("b"), t0 + Duration::from_secs(1));
        // touch a so b becomes the oldest
        assert!(cache.get_at(&a, t0 + Duration::from_secs(2)).is_some());
        cache.insert_at(c.clone(), response("c"), t0 + Duration::from_secs(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&b, t0 + Duration::from_secs(4)).is_none());
        assert!(cache.get_at(&a, t0 + Duration::from_secs(4)).is_some());
        assert!(cache.get_at(&c, t0 + Duration::from_secs(4)).is_some());
    }

    #[tokio::test]
    async fn test_replaced_entry_survives_old_expiry() {
        let cache = cache(10, 100, 10);
        let k = key("https://x/a", &[]);
        let t0 = Instant::now();
        cache.insert_at(k.clone(), response("old"), t0);
        cache.insert_at(k.clone(), response("new"), t0 + Duration::from_secs(8));

        let hit = cache.get_at(&k, t0 + Duration::from_secs(12)).unwrap();
        assert_eq!(hit.text(), "new");

        assert!(cache.get_at(&k, t0 + Duration::from_secs(18)).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = cache(60, 60, 10);
        cache.insert(key("https://x/a", &[]), response("{}"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
