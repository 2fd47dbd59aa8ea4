//! Ambient display of the countdown (window/tab title, status line).

/// Label shown while the timer is not running.
pub const IDLE_TITLE: &str = "PomoBot";

/// Receives the remaining time once per tick while running.
pub trait AmbientDisplay: Send {
    fn show_remaining(&mut self, minutes: u64, seconds: u64);

    /// Revert to the idle label.
    fn show_idle(&mut self);
}

/// `"MM:SS - PomoBot"`.
pub fn title_for(minutes: u64, seconds: u64) -> String {
    format!("{minutes:02}:{seconds:02} - {IDLE_TITLE}")
}

/// Display that only remembers the last title; handy for headless runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDisplay {
    title: String,
    updates: u64,
}

impl TitleDisplay {
    pub fn new() -> Self {
        Self {
            title: IDLE_TITLE.to_string(),
            updates: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of running updates received.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl Default for TitleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbientDisplay for TitleDisplay {
    fn show_remaining(&mut self, minutes: u64, seconds: u64) {
        self.title = title_for(minutes, seconds);
        self.updates += 1;
    }

    fn show_idle(&mut self) {
        self.title = IDLE_TITLE.to_string();
    }
}
