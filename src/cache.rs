//! Zero-time coalescing cache
//!
//! A single-slot cache for one expensive, idempotent operation. A result is
//! reused only by callers that started waiting *before* it was produced, so
//! nobody ever receives an answer computed before their own call began.
//!
//! # How it works
//!
//! 1. The caller takes a clock reading on entry, then acquires the cache lock.
//! 2. If the stored result was refreshed strictly later than that reading,
//!    it is returned as-is.
//! 3. Otherwise, still holding the lock, the cache sleeps for the requested
//!    delay, takes a new reading, runs the producer, and stores the result
//!    together with that reading.
//!
//! Callers that pile up behind the lock during the delay all see the single
//! refresh that follows it. Errors are cached exactly like values.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, Stamp, Stamper, SystemClock};
use crate::config::CoalescingConfig;
use crate::stats::{CoalescingStats, CoalescingStatsSnapshot};

/// Outcome of the most recent refresh
struct Refreshed<T, E> {
    /// Reading taken right before the producer ran
    stamp: Stamp,
    /// What the producer returned
    result: Result<T, E>,
}

/// Single-slot cache that coalesces concurrent callers
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use zerotime_cache::ZeroTimeCache;
///
/// let cache: ZeroTimeCache<u32, String> = ZeroTimeCache::new();
///
/// let value = cache.get_or_refresh(Duration::ZERO, || Ok(42));
/// assert_eq!(value, Ok(42));
/// assert_eq!(cache.stats().refreshes, 1);
/// ```
pub struct ZeroTimeCache<T, E, C = SystemClock> {
    /// Delay used by [`run`](Self::run)
    delay: Duration,
    stamper: Stamper<C>,
    slot: Mutex<Option<Refreshed<T, E>>>,
    stats: CoalescingStats,
}

impl<T, E> ZeroTimeCache<T, E, SystemClock>
where
    T: Clone,
    E: Clone,
{
    /// Create an empty cache with no default delay
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create an empty cache whose [`run`](Self::run) waits `delay` before refreshing
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self::with_clock(SystemClock).delayed(delay)
    }

    /// Create an empty cache from configuration
    #[must_use]
    pub fn from_config(config: &CoalescingConfig) -> Self {
        Self::with_delay(config.delay)
    }
}

impl<T, E, C> ZeroTimeCache<T, E, C>
where
    T: Clone,
    E: Clone,
    C: Clock,
{
    /// Create an empty cache reading time from `clock`
    #[must_use]
    pub fn with_clock(clock: C) -> Self {
        Self {
            delay: Duration::ZERO,
            stamper: Stamper::new(clock),
            slot: Mutex::new(None),
            stats: CoalescingStats::new(),
        }
    }

    /// Replace the delay used by [`run`](Self::run)
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay used by [`run`](Self::run)
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Call `producer` unless a result refreshed after this call began is available
    ///
    /// Uses the cache's configured delay (zero unless set).
    pub fn run<F>(&self, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_refresh(self.delay, producer)
    }

    /// Call `producer` unless a result refreshed after this call began is available
    ///
    /// On a miss, sleeps for `delay` while holding the cache lock so that
    /// concurrent callers queue up behind this one and share its result.
    /// `producer` must not call back into this cache.
    pub fn get_or_refresh<F>(&self, delay: Duration, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let called = self.stamper.stamp();
        self.refresh_unless_newer(called, delay, producer)
    }

    fn refresh_unless_newer<F>(
        &self,
        called: Stamp,
        delay: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut slot = self.slot.lock();

        // Strictly later: a result stamped at or before our entry may predate
        // state changes made by this caller.
        if let Some(refreshed) = slot.as_ref().filter(|r| r.stamp > called) {
            self.stats.record_hit();
            trace!(seq = refreshed.stamp.seq(), "Coalesced onto cached result");
            return refreshed.result.clone();
        }

        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "Delaying refresh to gather callers");
            thread::sleep(delay);
        }

        let stamp = self.stamper.stamp();
        let started = Instant::now();
        let result = producer();
        let elapsed_ms = started.elapsed().as_millis();

        self.stats.record_refresh(result.is_err());
        if result.is_err() {
            warn!(seq = stamp.seq(), elapsed_ms, "Producer failed, caching error");
        } else {
            debug!(seq = stamp.seq(), elapsed_ms, "Refreshed cached result");
        }

        *slot = Some(Refreshed {
            stamp,
            result: result.clone(),
        });
        result
    }

    /// Result of the most recent refresh, without invoking anything
    ///
    /// Returns `None` if the cache has never been refreshed.
    pub fn cached(&self) -> Option<Result<T, E>> {
        self.slot.lock().as_ref().map(|r| r.result.clone())
    }

    /// Instant the most recent refresh started
    pub fn refreshed_at(&self) -> Option<Instant> {
        self.slot.lock().as_ref().map(|r| r.stamp.at())
    }

    /// Get coalescing statistics
    pub fn stats(&self) -> CoalescingStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<T, E> Default for ZeroTimeCache<T, E, SystemClock>
where
    T: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
