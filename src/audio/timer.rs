//! Host-timer abstractions driven by the event loop.
//!
//! Neither type owns a thread or sleeps: the event loop asks for the next
//! deadline, waits until it, then polls with the current instant.

use std::time::{Duration, Instant};

/// Fixed-period timer with an explicit cancel.
///
/// Each firing re-arms one period after the instant it was polled at, so a
/// late poll delays the following tick instead of bunching ticks together.
#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    period: Duration,
    deadline: Option<Instant>,
}

impl RepeatingTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    /// Arm so that the first poll at or after `now` fires
    pub fn start(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    /// Drop the pending re-arm; no further firings until restarted
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire if due, re-arming for `now + period`
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}

/// One-shot request for the next display refresh.
///
/// The callback decides whether to request again, so the chain ends on its
/// own once the guard condition goes false.
#[derive(Debug, Clone, Default)]
pub struct FrameLoop {
    requested: bool,
}

impl FrameLoop {
    pub fn request(&mut self) {
        self.requested = true;
    }

    /// Consume the pending request
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.requested)
    }
}
