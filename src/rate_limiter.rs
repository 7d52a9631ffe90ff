//! Request rate limiting using a token bucket
//!
//! One [`RateLimiter`] is built per batch and shared by every worker, so the
//! aggregate rate of real API calls stays within the configured tier no
//! matter how many workers run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Shortest sleep between refill checks
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Token bucket shared across all workers of a batch
///
/// # Algorithm
///
/// - Each permitted API call consumes one token
/// - One token is added every `interval`, up to `capacity`
/// - The bucket starts full
/// - A caller finding the bucket empty sleeps until the next refill
///
/// Cloning is cheap and clones share the same bucket.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    capacity: u64,
    interval_nanos: u64,
    /// Available tokens
    tokens: Arc<AtomicU64>,
    /// Timestamp the next refill is measured from (nanoseconds since arbitrary epoch)
    last_refill: Arc<AtomicU64>,
}

impl RateLimiter {
    /// Create a full bucket with the given parameters
    ///
    /// A zero capacity is treated as one and a zero interval as one nanosecond.
    ///
    /// # Examples
    ///
    /// ```
    /// use pkg_sweep::config::RateLimitConfig;
    /// use pkg_sweep::rate_limiter::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(RateLimitConfig::authenticated());
    /// assert_eq!(limiter.capacity(), 10);
    /// ```
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = u64::from(config.capacity.max(1));
        let interval_nanos = (config.interval.as_nanos() as u64).max(1);

        Self {
            capacity,
            interval_nanos,
            tokens: Arc::new(AtomicU64::new(capacity)),
            last_refill: Arc::new(AtomicU64::new(Self::now_nanos())),
        }
    }

    /// Bucket capacity
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Refill interval for a single token
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos)
    }

    /// Tokens currently available, after accounting for elapsed refills
    pub fn available(&self) -> u64 {
        self.refill_tokens();
        self.tokens.load(Ordering::SeqCst)
    }

    /// Take one token if available without waiting
    pub fn try_acquire(&self) -> bool {
        self.refill_tokens();
        self.tokens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| t.checked_sub(1))
            .is_ok()
    }

    /// Take one token, waiting for a refill if the bucket is empty
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pkg_sweep::config::RateLimitConfig;
    /// use pkg_sweep::rate_limiter::RateLimiter;
    ///
    /// # async fn example() {
    /// let limiter = RateLimiter::new(RateLimitConfig::unauthenticated());
    ///
    /// // Before each real API call
    /// limiter.acquire().await;
    /// # }
    /// ```
    pub async fn acquire(&self) {
        let mut waited = false;

        loop {
            if self.try_acquire() {
                if waited {
                    tracing::trace!("rate limiter token acquired after waiting");
                }
                return;
            }

            waited = true;
            tokio::time::sleep(self.until_next_refill()).await;
        }
    }

    /// Time left until the next token is added
    fn until_next_refill(&self) -> Duration {
        let last = self.last_refill.load(Ordering::SeqCst);
        let next = last.saturating_add(self.interval_nanos);
        let now = Self::now_nanos();
        Duration::from_nanos(next.saturating_sub(now)).max(MIN_WAIT)
    }

    /// Add the tokens earned since the last refill
    fn refill_tokens(&self) {
        let now = Self::now_nanos();
        let last = self.last_refill.load(Ordering::SeqCst);

        let earned = now.saturating_sub(last) / self.interval_nanos;
        if earned == 0 {
            return;
        }

        // Advance by whole intervals so partial progress toward the next token is kept
        let advanced = last + earned * self.interval_nanos;
        if self
            .last_refill
            .compare_exchange(last, advanced, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let capacity = self.capacity;
            let _ = self
                .tokens
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                    Some(t.saturating_add(earned).min(capacity))
                });
        }
    }

    /// Get current monotonic time in nanoseconds
    fn now_nanos() -> u64 {
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as u64
    }
}
