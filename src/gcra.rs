//! GCRA (Generic Cell Rate Algorithm) implementation.
//!
//! GCRA is a token bucket formulated over arrival times: tokens replenish
//! continuously at the configured rate rather than on a discrete tick, and
//! burst capacity falls out of the tolerance term. One state cell tracks a
//! single client's budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// GCRA state for one rate-limited client.
///
/// Stores the theoretical arrival time (TAT) as nanoseconds since the
/// limiter's start instant. Uses atomic operations for lock-free
/// concurrent access.
#[derive(Debug)]
pub(crate) struct GcraState {
    /// Theoretical arrival time in nanoseconds since the start instant.
    tat_nanos: AtomicU64,
}

impl GcraState {
    /// Create a new GCRA state with a full budget.
    pub fn new() -> Self {
        Self {
            tat_nanos: AtomicU64::new(0),
        }
    }

    /// Get the current theoretical arrival time (TAT) in nanoseconds.
    pub fn tat(&self, ordering: Ordering) -> u64 {
        self.tat_nanos.load(ordering)
    }

    /// Try to acquire a token.
    ///
    /// `emission_interval_nanos` is the time one token takes to replenish
    /// (1/rate) and `burst_tolerance_nanos` is the total tolerance
    /// (burst × emission interval). Returns `Ok(())` if allowed, or
    /// `Err(retry_after)` if the budget is exhausted.
    pub fn try_acquire(
        &self,
        now_nanos: u64,
        emission_interval_nanos: u64,
        burst_tolerance_nanos: u64,
    ) -> Result<(), Duration> {
        loop {
            let tat = self.tat_nanos.load(Ordering::Acquire);

            // Saturating arithmetic: a pathological configuration must not
            // wrap the clock.
            let new_tat = if tat <= now_nanos {
                // Budget fully recovered, start fresh
                now_nanos.saturating_add(emission_interval_nanos)
            } else {
                tat.saturating_add(emission_interval_nanos)
            };

            // Burst capacity exhausted?
            let limit_at = now_nanos.saturating_add(burst_tolerance_nanos);
            if new_tat > limit_at {
                let wait_nanos = new_tat.saturating_sub(limit_at);
                return Err(Duration::from_nanos(wait_nanos));
            }

            match self.tat_nanos.compare_exchange_weak(
                tat,
                new_tat,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(_) => continue, // Retry on contention
            }
        }
    }
}
