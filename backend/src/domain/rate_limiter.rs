//! Dual-window admission control for outbound provider calls.
//!
//! Two token buckets guard the provider: a short window (one token back per
//! minute by default) and a daily window (one token back per day). A call is
//! admitted only when both buckets hold a token, and then both are debited
//! together. The daily bucket is checked first; a denial debits neither.
//!
//! The limiter owns its synchronisation and is shared by every reconciliation
//! task through an `Arc`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

/// Bucket sizes and refill cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Calls allowed in a burst within the short window.
    pub minute_capacity: u32,
    /// Time to earn back one short-window token.
    pub minute_refill: Duration,
    /// Calls allowed in a burst within the daily window.
    pub daily_capacity: u32,
    /// Time to earn back one daily token.
    pub daily_refill: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            minute_capacity: 5,
            minute_refill: Duration::from_secs(60),
            daily_capacity: 500,
            daily_refill: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Which window denied the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitExceeded {
    /// The daily bucket is empty.
    #[error("hit daily limit when calling the data provider")]
    Daily,
    /// The short-window bucket is empty.
    #[error("hit minute limit when calling the data provider")]
    Minute,
}

#[derive(Debug, Clone)]
struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_every: TimeDelta,
    last_refill: DateTime<Utc>,
}

impl TokenBucket {
    fn full(capacity: u32, refill_every: Duration, now: DateTime<Utc>) -> Self {
        let refill_every = TimeDelta::from_std(refill_every)
            .unwrap_or(TimeDelta::MAX)
            .max(TimeDelta::milliseconds(1));
        Self {
            capacity,
            tokens: capacity,
            refill_every,
            last_refill: now,
        }
    }

    /// Credit whole tokens earned since the last refill. Partial progress
    /// towards the next token is kept; a full bucket restarts its clock.
    fn refill(&mut self, now: DateTime<Utc>) {
        let elapsed = now.signed_duration_since(self.last_refill);
        let earned = elapsed
            .num_milliseconds()
            .checked_div(self.refill_every.num_milliseconds())
            .unwrap_or(0);
        if earned > 0 {
            let earned = u32::try_from(earned).unwrap_or(u32::MAX);
            self.tokens = self.tokens.saturating_add(earned).min(self.capacity);
            self.last_refill = self
                .last_refill
                .checked_add_signed(self.refill_every * i32::try_from(earned).unwrap_or(i32::MAX))
                .unwrap_or(now);
        }
        if self.tokens >= self.capacity {
            self.last_refill = now;
        }
    }

    const fn has_token(&self) -> bool {
        self.tokens > 0
    }

    const fn take(&mut self) {
        self.tokens = self.tokens.saturating_sub(1);
    }
}

#[derive(Debug)]
struct LimiterState {
    daily: TokenBucket,
    minute: TokenBucket,
}

/// Shared dual-window limiter.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use mockable::DefaultClock;
/// use pulse_backend::domain::{RateLimitExceeded, RateLimiter, RateLimiterConfig};
///
/// let config = RateLimiterConfig {
///     minute_capacity: 1,
///     ..RateLimiterConfig::default()
/// };
/// let limiter = RateLimiter::new(config, Arc::new(DefaultClock));
/// assert!(limiter.try_acquire().is_ok());
/// assert_eq!(limiter.try_acquire(), Err(RateLimitExceeded::Minute));
/// ```
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Build a limiter whose buckets start full.
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.utc();
        Self {
            state: Mutex::new(LimiterState {
                daily: TokenBucket::full(config.daily_capacity, config.daily_refill, now),
                minute: TokenBucket::full(config.minute_capacity, config.minute_refill, now),
            }),
            clock,
        }
    }

    /// Admit one provider call or report which window is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitExceeded::Daily`] when the daily bucket is empty,
    /// otherwise [`RateLimitExceeded::Minute`] when the short window is empty.
    /// Neither bucket is debited on denial.
    pub fn try_acquire(&self) -> Result<(), RateLimitExceeded> {
        let now = self.clock.utc();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.daily.refill(now);
        state.minute.refill(now);

        if !state.daily.has_token() {
            return Err(RateLimitExceeded::Daily);
        }
        if !state.minute.has_token() {
            return Err(RateLimitExceeded::Minute);
        }
        state.daily.take();
        state.minute.take();
        Ok(())
    }

    /// Tokens currently available as `(daily, minute)`, after refilling.
    #[must_use]
    pub fn available(&self) -> (u32, u32) {
        let now = self.clock.utc();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.daily.refill(now);
        state.minute.refill(now);
        (state.daily.tokens, state.minute.tokens)
    }
}
