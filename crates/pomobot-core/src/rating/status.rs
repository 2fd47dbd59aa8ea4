//! Transient, self-clearing status messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// How long a banner stays visible.
pub const BANNER_TTL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBanner {
    pub kind: BannerKind,
    pub text: String,
}

impl StatusBanner {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            text: text.into(),
        }
    }
}

/// Holds at most one banner until its deadline passes.
#[derive(Debug, Default)]
pub struct StatusSlot {
    current: Option<(StatusBanner, Instant)>,
}

impl StatusSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `banner`, replacing any older one and restarting the window.
    pub fn show(&mut self, banner: StatusBanner, now: Instant) {
        self.current = Some((banner, now + BANNER_TTL));
    }

    /// The banner visible at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&StatusBanner> {
        self.current
            .as_ref()
            .filter(|(_, deadline)| now < *deadline)
            .map(|(banner, _)| banner)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Drop the banner once its deadline passed. Returns it if cleared.
    pub fn clear_expired(&mut self, now: Instant) -> Option<StatusBanner> {
        match self.current.as_ref() {
            Some((_, deadline)) if now >= *deadline => self.current.take().map(|(b, _)| b),
            _ => None,
        }
    }
}
