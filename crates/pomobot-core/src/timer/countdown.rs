//! Integer-second countdown.
//!
//! Remaining time is a single `u64` of seconds. Minutes and seconds for
//! display are always derived from it, never stored alongside.

use serde::{Deserialize, Serialize};

/// Result of a single [`Countdown::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running; nothing changed.
    Idle,
    /// One second elapsed, this many remain.
    Remaining(u64),
    /// Remaining time is zero. The caller supplies the next total.
    Expired,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    remaining_secs: u64,
    running: bool,
}

impl Countdown {
    /// A stopped countdown holding `total_secs`.
    pub fn new(total_secs: u64) -> Self {
        Self {
            remaining_secs: total_secs,
            running: false,
        }
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// `(minutes, seconds)` for display.
    pub fn display(&self) -> (u64, u64) {
        split_secs(self.remaining_secs)
    }

    /// Begin counting down from `total_secs`.
    ///
    /// Starting while already running keeps the running flag as is and only
    /// re-derives the remaining time.
    pub fn start(&mut self, total_secs: u64) {
        self.remaining_secs = total_secs;
        self.running = true;
    }

    pub fn start_at(&mut self, minutes: u64, seconds: u64) {
        self.start(minutes.saturating_mul(60).saturating_add(seconds));
    }

    /// Halt without touching the remaining time.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Replace the remaining time without changing the running flag.
    pub fn set_remaining(&mut self, secs: u64) {
        self.remaining_secs = secs;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        if self.remaining_secs == 0 {
            return Tick::Expired;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs == 0 {
            Tick::Expired
        } else {
            Tick::Remaining(self.remaining_secs)
        }
    }
}

/// Split seconds into `(minutes, seconds)`.
pub fn split_secs(secs: u64) -> (u64, u64) {
    (secs / 60, secs % 60)
}
