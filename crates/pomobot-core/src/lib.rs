//! # PomoBot Core Library
//!
//! Core logic for the PomoBot Pomodoro timer. Front ends (the CLI today)
//! feed user commands into a [`Controller`] and render the [`Event`]s it
//! publishes.
//!
//! ## Architecture
//!
//! - **Timer**: a countdown state machine ([`TimerEngine`]) driven by a
//!   one-second [`Ticker`]
//! - **Audio**: the three-note end-of-session cue ([`ToneSynthesizer`])
//!   with a recorded beep as fallback, plus looped background audio
//! - **Rating**: after a work session, signed-in users rate it 1-5 and the
//!   result is persisted ([`RatingGate`])
//! - **Storage**: SQLite for rated sessions and preferences, TOML for local
//!   configuration

pub mod audio;
pub mod controller;
pub mod display;
pub mod error;
pub mod events;
pub mod persistence;
pub mod rating;
pub mod storage;
pub mod timer;

pub use audio::{AudioBackend, CueOutcome, ToneSpec, ToneSynthesizer};
pub use controller::{Collaborators, Command, Controller, Settings};
pub use display::{AmbientDisplay, TitleDisplay};
pub use error::{AudioError, ConfigError, CoreError, DatabaseError, PersistenceError, ValidationError};
pub use events::Event;
pub use persistence::{CompletedSessionRecord, PersistenceService, Preferences, Rating, UserId};
pub use rating::{GateOutcome, RatingGate, RatingPrompt, RatingResponse, StatusBanner};
pub use storage::{Config, Database};
pub use timer::{SessionType, Ticker, TimerConfig, TimerEngine, TimerPhase, TimerState};
