//! Per-principal rate limiting using a pair of token buckets.
//!
//! Each principal gets a minute bucket and an hour bucket. Both refill
//! continuously and a request is admitted only when both hold a token, in
//! which case both are decremented together.

use crate::{RateLimitConfig, SecurityError, SecurityErrorKind, SecurityResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// The two rate windows every principal is tracked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RateWindow {
    /// Rolling 60 seconds
    Minute,
    /// Rolling 3600 seconds
    Hour,
}

impl RateWindow {
    /// Length of the window.
    pub fn duration(self) -> Duration {
        match self {
            RateWindow::Minute => Duration::from_secs(60),
            RateWindow::Hour => Duration::from_secs(3600),
        }
    }
}

/// Token bucket for one window.
#[derive(Debug)]
struct TokenBucket {
    window: RateWindow,
    capacity: u32,
    /// Current available tokens
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(window: RateWindow, capacity: u32, now: Instant) -> Self {
        Self {
            window,
            capacity,
            tokens: capacity as f64,
            last_refill: now,
        }
    }

    fn refill_rate(&self) -> f64 {
        self.capacity as f64 / self.window.duration().as_secs_f64()
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        let tokens_to_add = elapsed.as_secs_f64() * self.refill_rate();
        self.tokens = (self.tokens + tokens_to_add).min(self.capacity as f64);
        self.last_refill = now;
    }

    fn has_token(&self) -> bool {
        self.tokens >= 1.0
    }

    fn consume(&mut self) {
        self.tokens -= 1.0;
    }

    /// Time until a whole token is available.
    fn retry_after(&self) -> Duration {
        if self.capacity == 0 {
            return self.window.duration();
        }
        let tokens_needed = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(tokens_needed / self.refill_rate())
    }

    fn available(&self) -> u32 {
        self.tokens.floor() as u32
    }

    fn is_full(&self) -> bool {
        self.tokens >= self.capacity as f64
    }
}

/// Both buckets of one principal.
#[derive(Debug)]
struct PrincipalBuckets {
    minute: TokenBucket,
    hour: TokenBucket,
    last_seen: Instant,
    /// Set once the entry has left the map; holders must fetch a new one.
    evicted: bool,
}

impl PrincipalBuckets {
    fn new(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            minute: TokenBucket::new(RateWindow::Minute, *config.per_minute(), now),
            hour: TokenBucket::new(RateWindow::Hour, *config.per_hour(), now),
            last_seen: now,
            evicted: false,
        }
    }

    fn refill(&mut self, now: Instant) {
        self.minute.refill(now);
        self.hour.refill(now);
    }

    /// Idle past `ttl` and indistinguishable from a fresh entry.
    fn is_evictable(&mut self, now: Instant, ttl: Duration) -> bool {
        self.refill(now);
        now.saturating_duration_since(self.last_seen) >= ttl
            && self.minute.is_full()
            && self.hour.is_full()
    }
}

/// Tokens left for a principal at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct RemainingTokens {
    /// Whole tokens in the minute bucket
    minute: u32,
    /// Whole tokens in the hour bucket
    hour: u32,
}

/// Rate limiter tracking every active principal.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, Arc<Mutex<PrincipalBuckets>>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Configured capacities.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or deny one request, consuming a token from each window on
    /// admission.
    pub fn check_and_consume(&self, principal_id: &str) -> bool {
        self.admit(principal_id).is_ok()
    }

    /// Admit one request, naming the exhausted window on denial.
    pub fn admit(&self, principal_id: &str) -> SecurityResult<()> {
        self.admit_at(principal_id, Instant::now())
    }

    /// Admit one request as of `now`.
    #[instrument(skip(self, now))]
    pub fn admit_at(&self, principal_id: &str, now: Instant) -> SecurityResult<()> {
        debug!("Checking rate limit");

        loop {
            let entry = self.entry(principal_id, now);
            let mut buckets = lock(&entry);
            if buckets.evicted {
                debug!("Entry evicted before it was locked, retrying");
                continue;
            }
            return take_token(principal_id, &mut buckets, now);
        }
    }

    /// Tokens left for a principal, or `None` if it is not tracked.
    pub fn remaining(&self, principal_id: &str) -> Option<RemainingTokens> {
        self.remaining_at(principal_id, Instant::now())
    }

    /// Tokens left for a principal as of `now`.
    pub fn remaining_at(&self, principal_id: &str, now: Instant) -> Option<RemainingTokens> {
        let entry = self.buckets.get(principal_id).map(|e| Arc::clone(e.value()))?;
        let mut buckets = lock(&entry);
        buckets.refill(now);
        Some(RemainingTokens {
            minute: buckets.minute.available(),
            hour: buckets.hour.available(),
        })
    }

    /// Number of principals currently tracked.
    pub fn tracked_principals(&self) -> usize {
        self.buckets.len()
    }

    /// Drop principals idle for longer than `idle_ttl_secs`.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    /// Drop principals idle as of `now`. Returns how many were removed.
    ///
    /// A principal is only dropped once both buckets have refilled to
    /// capacity, so eviction never hands back tokens the windows still owe.
    pub fn evict_idle_at(&self, now: Instant) -> usize {
        let ttl = Duration::from_secs(*self.config.idle_ttl_secs());
        let before = self.buckets.len();
        self.buckets.retain(|_, entry| match entry.try_lock() {
            Ok(mut buckets) => {
                if buckets.is_evictable(now, ttl) {
                    buckets.evicted = true;
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });
        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            debug!(evicted, "Evicted idle principals");
        }
        evicted
    }

    /// Evict idle principals every `interval` until the handle is aborted
    /// or the limiter is dropped.
    pub fn spawn_janitor(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        info!(interval_secs = interval.as_secs(), "Starting rate limit janitor");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    debug!("Rate limiter dropped, stopping janitor");
                    break;
                };
                limiter.evict_idle();
            }
        })
    }

    fn entry(&self, principal_id: &str, now: Instant) -> Arc<Mutex<PrincipalBuckets>> {
        if let Some(existing) = self.buckets.get(principal_id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .buckets
            .entry(principal_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(PrincipalBuckets::new(&self.config, now))));
        Arc::clone(entry.value())
    }
}

/// Admit against locked buckets, consuming from both windows or neither.
fn take_token(
    principal_id: &str,
    buckets: &mut PrincipalBuckets,
    now: Instant,
) -> SecurityResult<()> {
    buckets.refill(now);
    buckets.last_seen = now;

    let exhausted = if !buckets.minute.has_token() {
        Some(&buckets.minute)
    } else if !buckets.hour.has_token() {
        Some(&buckets.hour)
    } else {
        None
    };

    if let Some(bucket) = exhausted {
        let retry_after = bucket.retry_after();
        debug!(
            window = %bucket.window,
            retry_after_secs = retry_after.as_secs(),
            "Rate limit exceeded"
        );
        return Err(SecurityError::new(SecurityErrorKind::RateLimitExceeded {
            principal_id: principal_id.to_string(),
            window: bucket.window,
            limit: bucket.capacity,
            retry_after_secs: retry_after.as_secs_f64().ceil() as u64,
        }));
    }

    buckets.minute.consume();
    buckets.hour.consume();
    debug!(
        minute_remaining = buckets.minute.available(),
        hour_remaining = buckets.hour.available(),
        "Rate limit check passed"
    );
    Ok(())
}

/// Bucket arithmetic cannot leave the state half-updated, so a poisoned
/// lock is still usable.
fn lock(entry: &Mutex<PrincipalBuckets>) -> MutexGuard<'_, PrincipalBuckets> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}
