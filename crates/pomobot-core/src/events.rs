use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::CueOutcome;
use crate::rating::StatusBanner;
use crate::timer::{SessionType, TimerPhase, TimerState};

/// Every state change in the system produces an Event.
/// Front ends render them; nothing in the core depends on who listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A session ran out; `next` is already running.
    SessionExpired {
        ended: SessionType,
        next: SessionType,
        /// Length of the ended session as configured when it began.
        ended_duration_secs: u64,
        sessions_completed: u32,
        at: DateTime<Utc>,
    },
    SessionSkipped {
        from: SessionType,
        to: SessionType,
        sessions_completed: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    SettingsChanged {
        work_duration_min: u32,
        break_duration_min: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        state: TimerState,
        total_secs: u64,
        work_duration_min: u32,
        break_duration_min: u32,
        at: DateTime<Utc>,
    },
    CuePlayed {
        ended: SessionType,
        outcome: CueOutcome,
        at: DateTime<Utc>,
    },
    RatingRequested {
        session_type: SessionType,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    StatusShown {
        banner: StatusBanner,
        at: DateTime<Utc>,
    },
    StatusCleared {
        at: DateTime<Utc>,
    },
    SignedIn {
        user_id: String,
        at: DateTime<Utc>,
    },
    SignedOut {
        at: DateTime<Utc>,
    },
    /// Preferences from the persistence collaborator took effect.
    PreferencesApplied {
        work_duration_min: u32,
        break_duration_min: u32,
        audio_enabled: bool,
        dark_mode: bool,
        at: DateTime<Utc>,
    },
    ThemeChanged {
        dark_mode: bool,
        at: DateTime<Utc>,
    },
    AudioToggled {
        enabled: bool,
        at: DateTime<Utc>,
    },
    AmbientToggled {
        playing: bool,
        at: DateTime<Utc>,
    },
    /// Background audio was requested but could not start.
    AmbientUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The `type` tag this event serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::SessionExpired { .. } => "session_expired",
            Event::SessionSkipped { .. } => "session_skipped",
            Event::TimerReset { .. } => "timer_reset",
            Event::SettingsChanged { .. } => "settings_changed",
            Event::StateSnapshot { .. } => "state_snapshot",
            Event::CuePlayed { .. } => "cue_played",
            Event::RatingRequested { .. } => "rating_requested",
            Event::StatusShown { .. } => "status_shown",
            Event::StatusCleared { .. } => "status_cleared",
            Event::SignedIn { .. } => "signed_in",
            Event::SignedOut { .. } => "signed_out",
            Event::PreferencesApplied { .. } => "preferences_applied",
            Event::ThemeChanged { .. } => "theme_changed",
            Event::AudioToggled { .. } => "audio_toggled",
            Event::AmbientToggled { .. } => "ambient_toggled",
            Event::AmbientUnavailable { .. } => "ambient_unavailable",
        }
    }
}
