use std::io::Write;
use std::time::Duration;

use crate::error::AudioError;

/// An audio output the synthesizer can play cues through.
///
/// Every cue acquires its own [`CueContext`]; nothing is shared between cues.
pub trait AudioBackend: Send + Sync {
    /// Short identifier for logs (e.g. "rodio", "bell").
    fn name(&self) -> &str;

    /// Acquire a fresh output context for one cue.
    fn open_context(&self) -> Result<Box<dyn CueContext>, AudioError>;

    /// Degraded path: play an encoded WAV clip.
    fn play_clip(&self, wav: &[u8]) -> Result<(), AudioError>;

    /// Called from a user gesture before autoplay-restricted playback.
    fn unlock(&self) -> Result<(), AudioError>;

    /// Loop `samples` (mono, at [`super::SAMPLE_RATE`]) until
    /// [`stop_ambient`](Self::stop_ambient). Replaces any loop already playing.
    fn start_ambient(&self, samples: Vec<f32>) -> Result<(), AudioError>;

    fn stop_ambient(&self);

    /// Block until the output device is open or `timeout` passes. Returns
    /// whether it is ready. Backends with nothing to open are always ready.
    fn wait_ready(&self, _timeout: Duration) -> bool {
        true
    }
}

/// A single-use output context.
pub trait CueContext: Send {
    fn sample_rate(&self) -> u32;

    /// Hand over the rendered cue. The context tears itself down once the
    /// samples have played out.
    fn play(self: Box<Self>, samples: Vec<f32>) -> Result<(), AudioError>;
}

/// Terminal backend without a synthesis path.
///
/// Opening a context always fails, so every cue goes through the fallback,
/// which rings the terminal bell. The bell cannot carry background audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellBackend;

impl AudioBackend for BellBackend {
    fn name(&self) -> &str {
        "bell"
    }

    fn open_context(&self) -> Result<Box<dyn CueContext>, AudioError> {
        Err(AudioError::Unavailable(
            "built without an audio output device".into(),
        ))
    }

    fn play_clip(&self, _wav: &[u8]) -> Result<(), AudioError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")
            .and_then(|_| err.flush())
            .map_err(|e| AudioError::Playback(e.to_string()))
    }

    // A terminal needs no gesture to ring.
    fn unlock(&self) -> Result<(), AudioError> {
        Ok(())
    }

    fn start_ambient(&self, _samples: Vec<f32>) -> Result<(), AudioError> {
        Err(AudioError::Unavailable(
            "the terminal bell cannot play background audio".into(),
        ))
    }

    fn stop_ambient(&self) {}
}
