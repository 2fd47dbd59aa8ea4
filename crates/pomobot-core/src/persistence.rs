//! Contract with the persistence collaborator and the records it receives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, ValidationError};
use crate::timer::SessionType;

/// Identifier of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "user_id".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Productivity rating of a work session, 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidValue {
                field: "rating".into(),
                message: format!("must be between 1 and 5, got {value}"),
            })
        }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// User preferences kept by the collaborator. Absent fields mean "leave the
/// current value alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_duration_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
}

impl Preferences {
    /// Overlay the fields present in `newer` onto `self`.
    pub fn merge(&mut self, newer: &Preferences) {
        if newer.work_duration_min.is_some() {
            self.work_duration_min = newer.work_duration_min;
        }
        if newer.break_duration_min.is_some() {
            self.break_duration_min = newer.break_duration_min;
        }
        if newer.audio_enabled.is_some() {
            self.audio_enabled = newer.audio_enabled;
        }
        if newer.dark_mode.is_some() {
            self.dark_mode = newer.dark_mode;
        }
    }
}

/// A finished, rated work session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    pub session_type: SessionType,
    pub duration_secs: u64,
    pub rating: Option<Rating>,
    pub completed_at: DateTime<Utc>,
}

impl CompletedSessionRecord {
    pub fn work(duration_secs: u64, rating: Option<Rating>, completed_at: DateTime<Utc>) -> Self {
        Self {
            session_type: SessionType::Work,
            duration_secs,
            rating,
            completed_at,
        }
    }
}

/// Storage for preferences and rated sessions.
///
/// Implementations own their I/O; the engine only awaits results and never
/// lets a failure reach the timer state.
#[async_trait]
pub trait PersistenceService: Send + Sync {
    async fn load_preferences(&self, user: &UserId) -> Result<Option<Preferences>, PersistenceError>;

    async fn save_preferences(
        &self,
        user: &UserId,
        prefs: &Preferences,
    ) -> Result<(), PersistenceError>;

    /// Store a session and return its id.
    async fn save_completed_session(
        &self,
        user: &UserId,
        record: CompletedSessionRecord,
    ) -> Result<String, PersistenceError>;
}
