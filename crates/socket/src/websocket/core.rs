//! Runtime-free building blocks for the controller.
//!
//! Nothing here depends on tokio or a socket library; the driver owns the
//! actual timers and links and the controller uses these helpers to track them.

use std::time::Duration;

use super::ports::{Scheduler, TimerId};

/// Owned handle for at most one outstanding timer of a given purpose.
///
/// Arming cancels whatever was armed before, so a slot never has two live
/// timers.
#[derive(Debug, Default)]
pub struct TimerSlot {
    armed: Option<TimerId>,
}

impl TimerSlot {
    pub fn arm<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, after: Duration) -> TimerId {
        self.cancel(scheduler);
        let timer = scheduler.arm(after);
        self.armed = Some(timer);
        timer
    }

    pub fn cancel<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(timer) = self.armed.take() {
            scheduler.cancel(timer);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Claim a fired timer.
    ///
    /// Returns true (and disarms the slot) only if `timer` is the one this
    /// slot is waiting for.
    pub fn fire(&mut self, timer: TimerId) -> bool {
        if self.armed == Some(timer) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}

/// Reconnect attempts made in the current failure streak.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectBudget {
    attempts: u32,
    limit: u32,
}

impl ReconnectBudget {
    pub fn new(limit: u32) -> Self {
        Self { attempts: 0, limit }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// True once more attempts than the limit have been spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempts > self.limit
    }

    /// True if no attempt has been made since the last successful open.
    pub fn is_streak_start(&self) -> bool {
        self.attempts == 0
    }

    /// Record one more attempt, returning its 1-based number.
    pub fn advance(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }
}
