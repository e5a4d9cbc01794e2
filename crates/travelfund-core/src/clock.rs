//! Wall-clock access.
//!
//! The controller never reads the system time directly so that
//! resume-on-load can be exercised with arbitrary "now" values.

use std::cell::Cell;

/// Source of epoch-millisecond timestamps.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Reads `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Cell::new(now_ms),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.set(self.now.get() + secs * 1000);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
