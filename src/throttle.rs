// src/throttle.rs

use std::time::{Duration, Instant};

/// Trailing-edge rate limiter.
///
/// Lets a value through at most once per `interval`. Values arriving while
/// the gate is closed replace the single pending slot, so the most recent
/// one is released as soon as the interval has elapsed.
#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_fired: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            pending: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// When the pending value becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(self.last_fired.map_or_else(Instant::now, |t| t + self.interval))
    }

    fn is_open(&self, now: Instant) -> bool {
        self.last_fired
            .map_or(true, |t| now.saturating_duration_since(t) >= self.interval)
    }

    /// Offers `value` at time `now`. Returns it back if the interval has
    /// elapsed, dropping any older pending value; otherwise keeps it as the
    /// pending value.
    pub fn call_at(&mut self, value: T, now: Instant) -> Option<T> {
        if self.is_open(now) {
            self.last_fired = Some(now);
            self.pending = None;
            return Some(value);
        }
        self.pending = Some(value);
        None
    }

    pub fn call(&mut self, value: T) -> Option<T> {
        self.call_at(value, Instant::now())
    }

    /// Releases the pending value once its interval has elapsed.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.is_open(now) {
            self.last_fired = Some(now);
            return self.pending.take();
        }
        None
    }

    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// Releases the pending value regardless of the interval.
    pub fn flush_at(&mut self, now: Instant) -> Option<T> {
        let value = self.pending.take()?;
        self.last_fired = Some(now);
        Some(value)
    }

    pub fn flush(&mut self) -> Option<T> {
        self.flush_at(Instant::now())
    }

    /// Drops the pending value without running it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }
}
