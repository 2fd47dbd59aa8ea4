use serde::{Deserialize, Serialize};

/// Default work session length in minutes.
pub const DEFAULT_WORK_MIN: u32 = 25;
/// Default break session length in minutes.
pub const DEFAULT_BREAK_MIN: u32 = 5;
/// Shortest accepted session length in minutes.
pub const MIN_DURATION_MIN: u32 = 1;
/// Longest accepted session length in minutes.
pub const MAX_DURATION_MIN: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Work,
    Break,
}

impl SessionType {
    /// The session that follows this one.
    pub fn next(self) -> Self {
        match self {
            SessionType::Work => SessionType::Break,
            SessionType::Break => SessionType::Work,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::Break => "break",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(SessionType::Work),
            "break" => Ok(SessionType::Break),
            other => Err(crate::error::ValidationError::InvalidValue {
                field: "session_type".into(),
                message: format!("expected 'work' or 'break', got '{other}'"),
            }),
        }
    }
}

/// Work and break lengths, always within `[1, 60]` minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    work_duration_min: u32,
    break_duration_min: u32,
}

impl TimerConfig {
    /// Build a config, clamping both values into the accepted range.
    pub fn new(work_duration_min: u32, break_duration_min: u32) -> Self {
        Self {
            work_duration_min: clamp_minutes(work_duration_min),
            break_duration_min: clamp_minutes(break_duration_min),
        }
    }

    /// Build a config from raw settings input.
    ///
    /// Empty or non-numeric fields fall back to the defaults (25 / 5).
    pub fn from_input(work: &str, break_: &str) -> Self {
        Self {
            work_duration_min: parse_minutes(work, DEFAULT_WORK_MIN),
            break_duration_min: parse_minutes(break_, DEFAULT_BREAK_MIN),
        }
    }

    pub fn work_duration_min(&self) -> u32 {
        self.work_duration_min
    }

    pub fn break_duration_min(&self) -> u32 {
        self.break_duration_min
    }

    pub fn duration_min(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Work => self.work_duration_min,
            SessionType::Break => self.break_duration_min,
        }
    }

    /// Full length of a session of the given type in seconds.
    pub fn duration_secs(&self, session_type: SessionType) -> u64 {
        u64::from(self.duration_min(session_type)) * 60
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_MIN, DEFAULT_BREAK_MIN)
    }
}

pub fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_DURATION_MIN, MAX_DURATION_MIN)
}

/// Parse a minutes field the way a numeric form input is read.
///
/// Leading whitespace and an optional sign are accepted, then the leading
/// run of digits is taken ("12.5" and "12min" both read as 12). Input with no
/// leading digits yields `fallback`. The parsed value is clamped to `[1, 60]`.
pub fn parse_minutes(input: &str, fallback: u32) -> u32 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return clamp_minutes(fallback);
    }
    if negative {
        return MIN_DURATION_MIN;
    }
    // Overlong digit runs saturate instead of failing.
    let value = digits.parse::<u32>().unwrap_or(u32::MAX);
    clamp_minutes(value)
}
