//! Resettable deadline timer for the debounce loop.
//!
//! The timer never owns a live channel between waits: [`DeadlineTimer::channel`]
//! builds a fresh one-shot receiver from the current deadline each time the
//! loop blocks. An expiry that fired before a re-arm is simply never built, so
//! a stale wake-up cannot leak into a later wait cycle.

use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

/// One-shot timer that can be restarted with its full duration.
#[derive(Debug)]
pub struct DeadlineTimer {
    /// When the pending expiry is due. `None` when nothing is armed.
    deadline: Option<Instant>,
    /// Quiet period required before expiry.
    duration: Duration,
}

impl DeadlineTimer {
    /// Create a disarmed timer.
    pub fn new(duration: Duration) -> Self {
        Self {
            deadline: None,
            duration,
        }
    }

    /// Start (or restart) the timer with the full duration from now.
    ///
    /// Any pending expiry, delivered or not, is discarded.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.duration);
    }

    /// Cancel the pending expiry, if any.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Record that the pending expiry has been consumed.
    pub fn expire(&mut self) {
        self.deadline = None;
    }

    /// Whether an expiry is outstanding.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until expiry, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Receiver that becomes ready at the deadline, or never when disarmed.
    pub fn channel(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => crossbeam_channel::at(deadline),
            None => crossbeam_channel::never(),
        }
    }
}
