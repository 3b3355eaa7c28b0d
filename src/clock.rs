//! Time sources and refresh stamps
//!
//! A [`ZeroTimeCache`](crate::cache::ZeroTimeCache) never compares raw clock
//! readings. Every reading is turned into a [`Stamp`] that also carries a
//! per-cache sequence number, so two readings of a coarse (or frozen) clock
//! are still ordered in the order they were taken.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic time for a cache
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock
///
/// Returns the same instant until [`advance`](Self::advance) or
/// [`set`](Self::set) is called, which makes it suitable for reproducing
/// clocks that hand out identical readings for distinct calls.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock frozen at `start`
    #[must_use]
    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Jump the clock to `to`
    pub fn set(&self, to: Instant) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// A clock reading taken by a cache
///
/// Ordered by instant first, then by the order in which the readings were
/// taken. Strict comparison between stamps is never ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    at: Instant,
    seq: u64,
}

impl Stamp {
    /// Instant of the reading
    #[must_use]
    pub fn at(&self) -> Instant {
        self.at
    }

    /// Position of the reading among all readings of the same cache
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Hands out [`Stamp`]s from a [`Clock`]
#[derive(Debug)]
pub(crate) struct Stamper<C> {
    clock: C,
    next_seq: AtomicU64,
}

impl<C: Clock> Stamper<C> {
    pub(crate) fn new(clock: C) -> Self {
        Self {
            clock,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Take a reading
    ///
    /// The sequence number is drawn before the clock is read.
    pub(crate) fn stamp(&self) -> Stamp {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        Stamp {
            at: self.clock.now(),
            seq,
        }
    }
}
