//! Time sources for the emission engine.
//!
//! The state machine never reads the system clock directly; it asks a
//! [`Clock`] so tests and simulations can drive time explicitly.

use crate::units::UnixTimestamp;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync {
    fn unix_timestamp(&self) -> UnixTimestamp;
}

/// Wall-clock time.
///
/// Never reports less than 1: a host clock set before the epoch must not
/// produce the zero timestamp stored in records that never dripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    fn since_epoch(now: SystemTime) -> UnixTimestamp {
        now.duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().min(i64::MAX as u64) as UnixTimestamp)
            .unwrap_or(1)
            .max(1)
    }
}

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> UnixTimestamp {
        Self::since_epoch(SystemTime::now())
    }
}

/// Manually driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: UnixTimestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: UnixTimestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move time forward (or backward, for negative `secs`).
    pub fn advance(&self, secs: i64) -> UnixTimestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> UnixTimestamp {
        self.now.load(Ordering::SeqCst)
    }
}
