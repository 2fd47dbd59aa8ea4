//! The one periodic tick source.
//!
//! A `Ticker` owns at most one armed interval. Stopping drops the interval, so
//! a stopped ticker can never deliver a tick; `next_tick` simply pends.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Fixed tick period of the countdown.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    /// Arm the interval. Returns `false` if one was already armed, in which
    /// case nothing changes.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        self.interval = Some(self.arm());
        true
    }

    /// Cancel any armed interval and arm a fresh one.
    pub fn restart(&mut self) {
        self.stop();
        self.interval = Some(self.arm());
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    /// Resolves once per period while armed; pends forever when stopped.
    ///
    /// Cancel safe, so it can sit in a `select!` next to other branches.
    pub async fn next_tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn arm(&self) -> Interval {
        // First tick one full period from now, not immediately.
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}
