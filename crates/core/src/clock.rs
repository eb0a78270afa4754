//! UTC tick clock
//!
//! Row timestamps are 100ns ticks counted from 0001-01-01T00:00:00Z, so a
//! journal written here lines up with journals written by other tick-based
//! writers sharing the same tables.
//!
//! The engine never reads the system time directly. It goes through a [`Clock`]
//! so that initialization deadlines and backoff sleeps can be driven by a
//! [`ManualClock`] in tests.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// Ticks per second (one tick is 100ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Ticks per millisecond
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Tick count of 1970-01-01T00:00:00Z
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Convert a UTC instant into ticks
pub fn ticks_from_datetime(at: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + at.timestamp() * TICKS_PER_SECOND
        + i64::from(at.timestamp_subsec_nanos() / 100)
}

/// Convert ticks back into a UTC instant
///
/// Returns `None` for tick counts chrono cannot represent.
pub fn datetime_from_ticks(ticks: i64) -> Option<DateTime<Utc>> {
    let since_unix = ticks - UNIX_EPOCH_TICKS;
    let secs = since_unix.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// Convert a duration into ticks, saturating at `i64::MAX`
pub fn duration_to_ticks(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos() / 100).unwrap_or(i64::MAX)
}

/// Time source used by the engine
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in ticks
    fn utc_ticks(&self) -> i64;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `chrono::Utc::now` and `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn utc_ticks(&self) -> i64 {
        ticks_from_datetime(Utc::now())
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Deterministic clock for tests
///
/// Time only moves when [`ManualClock::advance`] is called or when someone
/// sleeps on it; a sleep returns immediately after advancing the clock.
#[derive(Debug)]
pub struct ManualClock {
    ticks: AtomicI64,
    sleeps: AtomicU64,
    slept_ticks: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `ticks`
    pub fn new(ticks: i64) -> Self {
        ManualClock {
            ticks: AtomicI64::new(ticks),
            sleeps: AtomicU64::new(0),
            slept_ticks: AtomicI64::new(0),
        }
    }

    /// Create a clock frozen at the given instant
    pub fn at(at: DateTime<Utc>) -> Self {
        Self::new(ticks_from_datetime(at))
    }

    /// Move time forward
    pub fn advance(&self, duration: Duration) {
        self.ticks
            .fetch_add(duration_to_ticks(duration), Ordering::SeqCst);
    }

    /// Number of sleeps observed
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }

    /// Total time spent sleeping
    pub fn total_slept(&self) -> Duration {
        let ticks = self.slept_ticks.load(Ordering::SeqCst).max(0) as u64;
        Duration::from_nanos(ticks.saturating_mul(100))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(UNIX_EPOCH_TICKS)
    }
}

impl Clock for ManualClock {
    fn utc_ticks(&self) -> i64 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.slept_ticks
            .fetch_add(duration_to_ticks(duration), Ordering::SeqCst);
        self.advance(duration);
    }
}
