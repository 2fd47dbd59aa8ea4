//! End-of-session cue playback with graceful degradation.
//!
//! Primary path: render the melody and play it through a fresh
//! [`CueContext`]. If that fails, the embedded beep is played through the
//! backend's clip path. If that fails too, the cue is silent. Nothing here
//! returns an error to the caller.
//!
//! Background audio is the one autoplay-restricted path: it only starts once
//! a user gesture has primed the backend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ambient::render_ambient_loop;
use super::backend::AudioBackend;
use super::clip::fallback_beep;
use super::tone::{ToneSpec, SAMPLE_RATE};
use crate::error::AudioError;
use crate::timer::SessionType;

/// What actually happened when a cue was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueOutcome {
    /// Cues are turned off.
    Disabled,
    /// Melody played on the primary path.
    Played { segments: usize },
    /// Primary path failed, the fallback beep played.
    Fallback,
    /// Both paths failed.
    Silent,
}

pub struct ToneSynthesizer {
    backend: Arc<dyn AudioBackend>,
    enabled: bool,
    unlocked: bool,
    ambient: bool,
}

impl ToneSynthesizer {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            enabled: true,
            unlocked: false,
            ambient: false,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Unlock playback from a user gesture. Returns `true` if this call did
    /// the unlocking; later calls are no-ops.
    pub fn prime(&mut self) -> bool {
        if self.unlocked {
            return false;
        }
        match self.backend.unlock() {
            Ok(()) => {
                self.unlocked = true;
                tracing::debug!(backend = self.backend.name(), "audio unlocked");
                true
            }
            Err(e) => {
                tracing::debug!(backend = self.backend.name(), error = %e, "audio unlock failed");
                false
            }
        }
    }

    /// Autoplay-restricted playback may only start once primed.
    pub fn ensure_unlocked(&self) -> Result<(), AudioError> {
        if self.unlocked {
            Ok(())
        } else {
            Err(AudioError::Locked)
        }
    }

    pub fn is_ambient_playing(&self) -> bool {
        self.ambient
    }

    /// Start looping background audio. Requires a prior [`prime`](Self::prime).
    pub fn start_ambient(&mut self) -> Result<(), AudioError> {
        self.ensure_unlocked()?;
        if self.ambient {
            return Ok(());
        }
        self.backend.start_ambient(render_ambient_loop(SAMPLE_RATE))?;
        self.ambient = true;
        tracing::debug!(backend = self.backend.name(), "ambient audio started");
        Ok(())
    }

    pub fn stop_ambient(&mut self) {
        if self.ambient {
            self.backend.stop_ambient();
            self.ambient = false;
            tracing::debug!(backend = self.backend.name(), "ambient audio stopped");
        }
    }

    /// Play the cue for the session that just ended.
    pub fn play_end_cue(&self, ended: SessionType, spec: &ToneSpec) -> CueOutcome {
        if !self.enabled {
            return CueOutcome::Disabled;
        }

        match self.play_primary(ended, spec) {
            Ok(segments) => {
                tracing::debug!(ended = %ended, segments, "cue played");
                CueOutcome::Played { segments }
            }
            Err(primary) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %primary,
                    "cue synthesis unavailable, using fallback beep"
                );
                match fallback_beep().and_then(|wav| self.backend.play_clip(wav)) {
                    Ok(()) => CueOutcome::Fallback,
                    Err(e) => {
                        tracing::debug!(error = %e, "fallback beep failed");
                        CueOutcome::Silent
                    }
                }
            }
        }
    }

    fn play_primary(&self, ended: SessionType, spec: &ToneSpec) -> Result<usize, AudioError> {
        let context = self.backend.open_context()?;
        let samples = spec.render(ended, context.sample_rate());
        context.play(samples)?;
        Ok(spec.frequencies_hz().len())
    }
}

impl std::fmt::Debug for ToneSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToneSynthesizer")
            .field("backend", &self.backend.name())
            .field("enabled", &self.enabled)
            .field("unlocked", &self.unlocked)
            .field("ambient", &self.ambient)
            .finish()
    }
}
