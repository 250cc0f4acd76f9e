//! Cancellable debounce and throttle timers.
//!
//! Both are driven by caller-supplied [`Instant`]s rather than a runtime, so
//! the owner decides when time advances and tests stay deterministic.

use std::time::{Duration, Instant};

/// Trailing-edge debouncer: fires once a quiet period follows the last trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create an idle debouncer.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Configured quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer. Any earlier deadline is replaced.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Disarm without firing. Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether the timer is armed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire if the deadline has passed. Returns `true` exactly once per arming.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Leading-edge throttle: lets at most one call through per interval.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    /// Create a throttle that lets the next call through.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a call at `now` may proceed. Records `now` when it may.
    pub fn ready(&mut self, now: Instant) -> bool {
        let open = self
            .last
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if open {
            self.last = Some(now);
        }
        open
    }

    /// Forget the last call so the next one proceeds.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
