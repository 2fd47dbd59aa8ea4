//! Work/break state machine.
//!
//! The engine holds no thread or timer of its own. The caller delivers one
//! `tick()` per second while the engine reports itself running (see
//! [`crate::timer::Ticker`]).
//!
//! ## States
//!
//! ```text
//! WorkPaused <-> WorkRunning --expiry--> BreakRunning <-> BreakPaused
//!      ^                                      |
//!      +-------------- expiry ----------------+
//! ```
//!
//! `skip()` flips the session type and lands paused, `reset()` and
//! `change_settings()` always land in `WorkPaused`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::countdown::{Countdown, Tick};
use super::session::{SessionType, TimerConfig};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    WorkRunning,
    WorkPaused,
    BreakRunning,
    BreakPaused,
}

impl TimerPhase {
    pub fn of(session_type: SessionType, is_running: bool) -> Self {
        match (session_type, is_running) {
            (SessionType::Work, true) => TimerPhase::WorkRunning,
            (SessionType::Work, false) => TimerPhase::WorkPaused,
            (SessionType::Break, true) => TimerPhase::BreakRunning,
            (SessionType::Break, false) => TimerPhase::BreakPaused,
        }
    }
}

/// Plain snapshot of the engine's observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_secs: u64,
    pub session_type: SessionType,
    pub is_running: bool,
    pub sessions_completed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    config: TimerConfig,
    session_type: SessionType,
    countdown: Countdown,
    sessions_completed: u32,
    /// Length of the current session as configured when it began.
    session_total_secs: u64,
}

impl TimerEngine {
    /// Create an engine paused at the start of a work session.
    pub fn new(config: TimerConfig) -> Self {
        let total = config.duration_secs(SessionType::Work);
        Self {
            config,
            session_type: SessionType::Work,
            countdown: Countdown::new(total),
            sessions_completed: 0,
            session_total_secs: total,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn total_secs(&self) -> u64 {
        self.session_total_secs
    }

    /// `(minutes, seconds)` derived from the remaining seconds.
    pub fn display(&self) -> (u64, u64) {
        self.countdown.display()
    }

    pub fn phase(&self) -> TimerPhase {
        TimerPhase::of(self.session_type, self.is_running())
    }

    /// 0.0 .. 1.0 progress within the current session.
    pub fn progress(&self) -> f64 {
        if self.session_total_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs() as f64 / self.session_total_secs as f64)
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            remaining_secs: self.remaining_secs(),
            session_type: self.session_type,
            is_running: self.is_running(),
            sessions_completed: self.sessions_completed,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase(),
            state: self.state(),
            total_secs: self.session_total_secs,
            work_duration_min: self.config.work_duration_min(),
            break_duration_min: self.config.break_duration_min(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Running <-> paused within the same session type.
    ///
    /// Resuming primes the countdown with the current remaining time, so a
    /// pause never loses progress.
    pub fn toggle(&mut self) -> Event {
        let remaining = self.remaining_secs();
        if self.is_running() {
            self.countdown.stop();
            Event::TimerPaused {
                session_type: self.session_type,
                remaining_secs: remaining,
                at: Utc::now(),
            }
        } else {
            self.countdown.start(remaining);
            Event::TimerStarted {
                session_type: self.session_type,
                remaining_secs: remaining,
                at: Utc::now(),
            }
        }
    }

    /// Advance one second. Returns `Some(Event::SessionExpired)` when the
    /// session ran out; the next session is then already running.
    pub fn tick(&mut self) -> Option<Event> {
        match self.countdown.tick() {
            Tick::Idle | Tick::Remaining(_) => None,
            Tick::Expired => {
                let ended = self.session_type;
                let ended_duration_secs = self.session_total_secs;
                if ended == SessionType::Work {
                    self.sessions_completed += 1;
                }
                let total = self.begin(ended.next());
                self.countdown.start(total);
                tracing::info!(
                    ended = %ended,
                    next = %self.session_type,
                    sessions_completed = self.sessions_completed,
                    "session expired"
                );
                Some(Event::SessionExpired {
                    ended,
                    next: self.session_type,
                    ended_duration_secs,
                    sessions_completed: self.sessions_completed,
                    at: Utc::now(),
                })
            }
        }
    }

    /// Flip to the other session type without a cue or rating.
    ///
    /// Skipping work counts it as completed, skipping a break does not.
    pub fn skip(&mut self) -> Event {
        let from = self.session_type;
        if from == SessionType::Work {
            self.sessions_completed += 1;
        }
        self.countdown.stop();
        self.begin(from.next());
        Event::SessionSkipped {
            from,
            to: self.session_type,
            sessions_completed: self.sessions_completed,
            at: Utc::now(),
        }
    }

    /// Back to a paused, full-length work session. The counter is kept.
    pub fn reset(&mut self) -> Event {
        self.countdown.stop();
        self.begin(SessionType::Work);
        Event::TimerReset { at: Utc::now() }
    }

    /// Replace both durations (clamped to `[1, 60]`) and reset.
    pub fn change_settings(&mut self, work_duration_min: u32, break_duration_min: u32) -> Event {
        self.apply_config(TimerConfig::new(work_duration_min, break_duration_min))
    }

    /// Replace both durations from raw form input and reset.
    pub fn change_settings_from_input(&mut self, work: &str, break_: &str) -> Event {
        self.apply_config(TimerConfig::from_input(work, break_))
    }

    /// Replace both durations without touching the session in progress.
    ///
    /// The new lengths take effect from the next session. A work session
    /// that is paused and has not started counting yet is re-primed with
    /// the new length right away. Returns `true` in that case.
    pub fn set_config(&mut self, config: TimerConfig) -> bool {
        self.config = config;
        let untouched = !self.is_running()
            && self.session_type == SessionType::Work
            && self.remaining_secs() == self.session_total_secs;
        if untouched {
            self.begin(SessionType::Work);
        }
        untouched
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply_config(&mut self, config: TimerConfig) -> Event {
        self.config = config;
        self.reset();
        Event::SettingsChanged {
            work_duration_min: config.work_duration_min(),
            break_duration_min: config.break_duration_min(),
            at: Utc::now(),
        }
    }

    /// Switch to `session_type` with its full duration. Leaves the running
    /// flag alone and returns the new total.
    fn begin(&mut self, session_type: SessionType) -> u64 {
        let total = self.config.duration_secs(session_type);
        self.session_type = session_type;
        self.session_total_secs = total;
        self.countdown.set_remaining(total);
        total
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ticks(engine: &mut TimerEngine, n: u64) -> Vec<Event> {
        (0..n).filter_map(|_| engine.tick()).collect()
    }

    #[test]
    fn initial_state_is_work_paused() {
        let engine = TimerEngine::default();
        assert_eq!(engine.phase(), TimerPhase::WorkPaused);
        assert_eq!(engine.remaining_secs(), 1500);
        assert_eq!(engine.sessions_completed(), 0);
    }

    #[test]
    fn toggle_is_lossless() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        run_ticks(&mut engine, 42);
        engine.toggle();
        assert_eq!(engine.remaining_secs(), 1500 - 42);
        assert_eq!(engine.phase(), TimerPhase::WorkPaused);
        engine.toggle();
        assert_eq!(engine.remaining_secs(), 1500 - 42);
        assert_eq!(engine.phase(), TimerPhase::WorkRunning);
    }

    #[test]
    fn paused_engine_ignores_ticks() {
        let mut engine = TimerEngine::default();
        assert!(run_ticks(&mut engine, 10).is_empty());
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn work_expiry_moves_to_running_break() {
        let mut engine = TimerEngine::new(TimerConfig::new(1, 2));
        engine.toggle();
        let events = run_ticks(&mut engine, 60);
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::SessionExpired {
                ended,
                next,
                ended_duration_secs,
                sessions_completed,
                ..
            } => {
                assert_eq!(*ended, SessionType::Work);
                assert_eq!(*next, SessionType::Break);
                assert_eq!(*ended_duration_secs, 60);
                assert_eq!(*sessions_completed, 1);
            }
            other => panic!("Expected SessionExpired, got {other:?}"),
        }
        assert_eq!(engine.phase(), TimerPhase::BreakRunning);
        assert_eq!(engine.remaining_secs(), 120);
    }

    #[test]
    fn break_expiry_moves_to_running_work_without_counting() {
        let mut engine = TimerEngine::new(TimerConfig::new(1, 1));
        engine.toggle();
        run_ticks(&mut engine, 120);
        assert_eq!(engine.phase(), TimerPhase::WorkRunning);
        assert_eq!(engine.remaining_secs(), 60);
        assert_eq!(engine.sessions_completed(), 1);
    }

    #[test]
    fn skip_counts_work_but_not_break() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        engine.skip();
        assert_eq!(engine.state().session_type, SessionType::Break);
        assert_eq!(engine.sessions_completed(), 1);
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 300);

        engine.toggle();
        engine.skip();
        assert_eq!(engine.state().session_type, SessionType::Work);
        assert_eq!(engine.sessions_completed(), 1);
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn reset_returns_to_work_paused_and_keeps_counter() {
        let mut engine = TimerEngine::default();
        engine.skip();
        engine.toggle();
        run_ticks(&mut engine, 7);
        engine.reset();
        assert_eq!(
            engine.state(),
            TimerState {
                remaining_secs: 1500,
                session_type: SessionType::Work,
                is_running: false,
                sessions_completed: 1,
            }
        );
    }

    #[test]
    fn change_settings_clamps_and_resets() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        engine.change_settings(0, 75);
        assert_eq!(engine.config().work_duration_min(), 1);
        assert_eq!(engine.config().break_duration_min(), 60);
        assert_eq!(engine.phase(), TimerPhase::WorkPaused);
        assert_eq!(engine.remaining_secs(), 60);
    }

    #[test]
    fn change_settings_from_input_falls_back_to_defaults() {
        let mut engine = TimerEngine::new(TimerConfig::new(40, 10));
        engine.change_settings_from_input("", "abc");
        assert_eq!(engine.config(), TimerConfig::default());
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn set_config_keeps_progress_of_a_started_session() {
        let mut engine = TimerEngine::default();
        engine.toggle();
        run_ticks(&mut engine, 600);
        engine.toggle();

        assert!(!engine.set_config(TimerConfig::new(30, 10)));
        assert_eq!(engine.remaining_secs(), 900);
        assert_eq!(engine.total_secs(), 1500);
        assert_eq!(engine.phase(), TimerPhase::WorkPaused);

        engine.toggle();
        let events = run_ticks(&mut engine, 900);
        assert!(matches!(
            events.as_slice(),
            [Event::SessionExpired {
                ended_duration_secs: 1500,
                ..
            }]
        ));
        assert_eq!(engine.remaining_secs(), 600);
    }

    #[test]
    fn set_config_reprimes_an_untouched_work_session() {
        let mut engine = TimerEngine::default();
        assert!(engine.set_config(TimerConfig::new(30, 10)));
        assert_eq!(engine.remaining_secs(), 1800);
        assert_eq!(engine.total_secs(), 1800);

        engine.skip();
        assert!(!engine.set_config(TimerConfig::new(40, 5)));
        assert_eq!(engine.remaining_secs(), 600);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let engine = TimerEngine::default();
        match engine.snapshot() {
            Event::StateSnapshot {
                phase,
                state,
                total_secs,
                ..
            } => {
                assert_eq!(phase, TimerPhase::WorkPaused);
                assert_eq!(state.remaining_secs, 1500);
                assert_eq!(total_secs, 1500);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }
}
