//! Rate limiting implementation
//!
//! Uses the governor crate, one limiter per verb class. GET traffic and
//! POST/PUT/DELETE traffic are throttled independently because the ZIA API
//! enforces separate quotas for reads and writes. A class may spend its
//! whole quota at once; capacity then comes back evenly over the window.

use crate::types::VerbClass;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use reqwest::Method;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

type DirectLimiter<C> =
    Governor<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Configuration for rate limiting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Window the quotas are measured over
    pub window: Duration,
    /// Requests allowed per window for GET/HEAD
    pub read_limit: u32,
    /// Requests allowed per window for POST/PUT/PATCH/DELETE
    pub write_limit: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(1),
            read_limit: 2,
            write_limit: 2,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(window: Duration, read_limit: u32, write_limit: u32) -> Self {
        Self {
            window,
            read_limit,
            write_limit,
        }
    }

    /// Quota for a verb class (never zero)
    pub fn limit_for(&self, class: VerbClass) -> u32 {
        let limit = match class {
            VerbClass::Read => self.read_limit,
            VerbClass::Write => self.write_limit,
        };
        limit.max(1)
    }

    /// Governor quota for a verb class: `limit` at once, one more every
    /// `window / limit`
    pub fn quota_for(&self, class: VerbClass) -> Quota {
        let burst = NonZeroU32::new(self.limit_for(class)).unwrap_or(NonZeroU32::MIN);
        Quota::with_period(self.window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst)
    }
}

/// Rate limiter keyed by verb class
pub struct RateLimiter<C: Clock = DefaultClock> {
    config: RateLimiterConfig,
    clock: C,
    read: DirectLimiter<C>,
    write: DirectLimiter<C>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self::with_clock(config, &DefaultClock::default())
    }

    /// Wait until a request for `method` can be made
    pub async fn acquire(&self, method: &Method) {
        let class = VerbClass::of(method);
        if let Some(wait) = self.check_class(class) {
            debug!(
                verb_class = %class,
                wait_ms = wait.as_millis() as u64,
                "Rate limit quota exhausted, waiting"
            );
            self.limiter(class).until_ready().await;
        }
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a rate limiter driven by a custom clock
    pub fn with_clock(config: &RateLimiterConfig, clock: &C) -> Self {
        Self {
            config: config.clone(),
            clock: clock.clone(),
            read: Governor::direct_with_clock(config.quota_for(VerbClass::Read), clock),
            write: Governor::direct_with_clock(config.quota_for(VerbClass::Write), clock),
        }
    }

    /// Get the limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Try to take a slot for `method`.
    ///
    /// Returns `None` when the request may proceed (the slot is consumed),
    /// or the time until the next slot frees up.
    pub fn check(&self, method: &Method) -> Option<Duration> {
        self.check_class(VerbClass::of(method))
    }

    /// Same as [`check`](Self::check) for an explicit verb class
    pub fn check_class(&self, class: VerbClass) -> Option<Duration> {
        match self.limiter(class).check() {
            Ok(()) => None,
            Err(not_until) => Some(not_until.wait_time_from(self.clock.now())),
        }
    }

    fn limiter(&self, class: VerbClass) -> &DirectLimiter<C> {
        match class {
            VerbClass::Read => &self.read,
            VerbClass::Write => &self.write,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimiterConfig::default())
    }
}

impl<C: Clock> std::fmt::Debug for RateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
