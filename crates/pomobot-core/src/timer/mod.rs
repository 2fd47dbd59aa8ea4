mod countdown;
mod engine;
mod session;
mod ticker;

pub use countdown::{split_secs, Countdown, Tick};
pub use engine::{TimerEngine, TimerPhase, TimerState};
pub use session::{
    clamp_minutes, parse_minutes, SessionType, TimerConfig, DEFAULT_BREAK_MIN, DEFAULT_WORK_MIN,
    MAX_DURATION_MIN, MIN_DURATION_MIN,
};
pub use ticker::{Ticker, TICK_PERIOD};
