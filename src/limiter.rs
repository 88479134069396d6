//! Per-client rate limiting.
//!
//! One [`RateLimiter`] guards one route. State is tracked per client
//! identity (authenticated username, or peer address for anonymous
//! routes) in a lock-free map, so concurrent requests from different
//! clients never contend.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::error::GatewayError;
use crate::gcra::GcraState;
use crate::types::RateLimitPolicy;

/// A keyed rate limiter enforcing a single [`RateLimitPolicy`].
///
/// # Thread Safety
///
/// `RateLimiter` is `Send + Sync` and can be shared across tasks. Clones
/// share the same state, so limits are enforced across all clones.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    states: Arc<DashMap<String, GcraState>>,
    start_instant: Instant,
}

impl RateLimiter {
    /// Create a limiter for the given policy.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            states: Arc::new(DashMap::new()),
            start_instant: Instant::now(),
        }
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    #[inline]
    fn now_nanos(&self) -> u64 {
        // Saturating conversion: u64 nanoseconds cover ~585 years of uptime
        self.start_instant
            .elapsed()
            .as_nanos()
            .min(u64::MAX as u128) as u64
    }

    /// Acquire one token for `key`.
    ///
    /// Returns `Err(RateLimited)` with the retry-after duration when the
    /// client's budget is exhausted. Never delays the caller.
    pub fn check(&self, key: &str) -> Result<(), GatewayError> {
        let now = self.now_nanos();
        let state = self
            .states
            .entry(key.to_string())
            .or_insert_with(GcraState::new);

        state
            .try_acquire(
                now,
                self.policy.emission_interval_nanos(),
                self.policy.burst_tolerance_nanos(),
            )
            .map_err(GatewayError::RateLimited)
    }

    /// Remove state entries whose budget has fully recovered.
    ///
    /// An entry is stale when its theoretical arrival time has fallen more
    /// than twice the burst tolerance behind the clock. Call periodically
    /// in long-running processes to keep per-client state bounded.
    pub fn cleanup(&self) {
        let now = self.now_nanos();
        let tolerance = self.policy.burst_tolerance_nanos();
        self.states.retain(|_, state| {
            state.tat(Ordering::Acquire) > now.saturating_sub(tolerance.saturating_mul(2))
        });
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.states.len()
    }
}
