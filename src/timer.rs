//! Periodic clock primitive shared by the engine's three sender cadences
//! and three receiver watchdogs.
//!
//! The original library (`original_source/lib/LibDS/src/timer.c`) spins one
//! OS thread per timer, sleeping `precision` ms and incrementing `elapsed`.
//! That design doesn't carry over well to an async engine loop that already
//! wants to poll everything on one cadence, so this is a plain `Instant`
//! based value type: the engine calls `poll_expired()` once per tick and the
//! edge latches until `reset()`.

use std::time::{Duration, Instant};

pub struct Timer {
    period: Duration,
    enabled: bool,
    expired: bool,
    last_reset: Instant,
}

impl Timer {
    /// Creates a new, disabled timer with the given period in milliseconds.
    pub fn new(period_ms: u64) -> Timer {
        Timer {
            period: Duration::from_millis(period_ms),
            enabled: false,
            expired: false,
            last_reset: Instant::now(),
        }
    }

    /// Enables the timer and clears any latched expiry.
    pub fn start(&mut self) {
        self.enabled = true;
        self.expired = false;
        self.last_reset = Instant::now();
    }

    /// Disables the timer and clears any latched expiry.
    pub fn stop(&mut self) {
        self.enabled = false;
        self.expired = false;
    }

    /// Clears latched expiry and restarts the elapsed-time window without
    /// changing the enabled state.
    pub fn reset(&mut self) {
        self.expired = false;
        self.last_reset = Instant::now();
    }

    /// Changes the period. Takes effect on the next `reset()`/tick.
    pub fn set_period_ms(&mut self, period_ms: u64) {
        self.period = Duration::from_millis(period_ms);
    }

    pub fn period_ms(&self) -> u64 {
        self.period.as_millis() as u64
    }

    /// Samples the wall clock and latches `expired` if the period elapsed.
    /// Returns the latched state after sampling. A period of zero never
    /// expires (used by protocols that disable a cadence, e.g. radio sends).
    pub fn poll_expired(&mut self) -> bool {
        if self.enabled && !self.expired && !self.period.is_zero() {
            if self.last_reset.elapsed() >= self.period {
                self.expired = true;
            }
        }
        self.expired
    }

    /// Returns the latched state without sampling the wall clock.
    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn expires_after_period_and_latches() {
        let mut t = Timer::new(5);
        t.start();
        assert!(!t.poll_expired());
        sleep(Duration::from_millis(15));
        assert!(t.poll_expired());
        // Latched until reset, even if we poll again immediately.
        assert!(t.poll_expired());
        t.reset();
        assert!(!t.is_expired());
    }

    #[test]
    fn zero_period_never_expires() {
        let mut t = Timer::new(0);
        t.start();
        sleep(Duration::from_millis(10));
        assert!(!t.poll_expired());
    }

    #[test]
    fn stopped_timer_does_not_expire() {
        let mut t = Timer::new(1);
        sleep(Duration::from_millis(5));
        assert!(!t.poll_expired());
    }
}
