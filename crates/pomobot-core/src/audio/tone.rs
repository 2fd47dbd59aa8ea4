//! Procedural cue melodies.
//!
//! A cue is a run of sine segments laid back to back. Each segment has a
//! short linear attack and an exponential decay so it starts and ends without
//! clicks.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::SessionType;

/// Output sample rate for rendered cues.
pub const SAMPLE_RATE: u32 = 44_100;
/// Audible part of each segment; also the spacing between segment starts.
pub const SEGMENT_SECS: f32 = 0.16;
/// Extra time a segment keeps sounding after the next one starts.
pub const RELEASE_TAIL_SECS: f32 = 0.02;
/// Linear ramp from near-silence to peak.
pub const ATTACK_SECS: f32 = 0.01;

const START_GAIN: f32 = 0.0001;
const DECAY_TARGET_GAIN: f32 = 0.001;

/// Frequencies and loudness of the end-of-session melody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    frequencies_hz: Vec<f32>,
    peak_volume: f32,
}

impl ToneSpec {
    pub fn new(frequencies_hz: Vec<f32>, peak_volume: f32) -> Result<Self, ValidationError> {
        if frequencies_hz.is_empty() {
            return Err(ValidationError::EmptyCollection("frequencies_hz".into()));
        }
        if let Some(bad) = frequencies_hz.iter().find(|f| !(f.is_finite() && **f > 0.0)) {
            return Err(ValidationError::InvalidValue {
                field: "frequencies_hz".into(),
                message: format!("frequency must be positive, got {bad}"),
            });
        }
        if !(peak_volume > 0.0 && peak_volume <= 1.0) {
            return Err(ValidationError::InvalidValue {
                field: "peak_volume".into(),
                message: format!("must be in (0, 1], got {peak_volume}"),
            });
        }
        Ok(Self {
            frequencies_hz,
            peak_volume,
        })
    }

    pub fn frequencies_hz(&self) -> &[f32] {
        &self.frequencies_hz
    }

    pub fn peak_volume(&self) -> f32 {
        self.peak_volume
    }

    /// Work-ended plays the frequencies in order, break-ended reversed.
    pub fn melody(&self, ended: SessionType) -> Vec<f32> {
        match ended {
            SessionType::Work => self.frequencies_hz.clone(),
            SessionType::Break => self.frequencies_hz.iter().rev().copied().collect(),
        }
    }

    pub fn segments(&self, ended: SessionType) -> Vec<ToneSegment> {
        self.melody(ended)
            .into_iter()
            .enumerate()
            .map(|(i, frequency_hz)| ToneSegment {
                frequency_hz,
                start_secs: i as f32 * SEGMENT_SECS,
                peak_volume: self.peak_volume,
            })
            .collect()
    }

    /// Length of the rendered cue, release tail included.
    pub fn duration_secs(&self) -> f32 {
        match self.frequencies_hz.len() {
            0 => 0.0,
            n => n as f32 * SEGMENT_SECS + RELEASE_TAIL_SECS,
        }
    }

    /// Mix the cue for `ended` into a mono buffer at `sample_rate`.
    pub fn render(&self, ended: SessionType, sample_rate: u32) -> Vec<f32> {
        let segments = self.segments(ended);
        let total_secs = self.duration_secs();
        let rate = sample_rate as f32;
        let len = (total_secs * rate).ceil() as usize;
        let mut buffer = vec![0.0f32; len];

        for segment in &segments {
            let first = (segment.start_secs * rate).round() as usize;
            let last = ((segment.start_secs + SEGMENT_SECS + RELEASE_TAIL_SECS) * rate).ceil() as usize;
            for (i, sample) in buffer
                .iter_mut()
                .enumerate()
                .take(last.min(len))
                .skip(first)
            {
                let t = i as f32 / rate - segment.start_secs;
                *sample += segment.sample_at(t);
            }
        }

        for sample in &mut buffer {
            *sample = sample.clamp(-1.0, 1.0);
        }
        buffer
    }
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequencies_hz: vec![880.0, 1040.0, 1318.0],
            peak_volume: 0.32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSegment {
    pub frequency_hz: f32,
    /// Offset from the start of the cue.
    pub start_secs: f32,
    pub peak_volume: f32,
}

impl ToneSegment {
    /// Envelope gain `t` seconds after the segment starts.
    pub fn gain_at(&self, t: f32) -> f32 {
        if !(0.0..SEGMENT_SECS + RELEASE_TAIL_SECS).contains(&t) {
            return 0.0;
        }
        if t < ATTACK_SECS {
            return START_GAIN + (self.peak_volume - START_GAIN) * (t / ATTACK_SECS);
        }
        if t < SEGMENT_SECS {
            let progress = (t - ATTACK_SECS) / (SEGMENT_SECS - ATTACK_SECS);
            return self.peak_volume * (DECAY_TARGET_GAIN / self.peak_volume).powf(progress);
        }
        DECAY_TARGET_GAIN
    }

    fn sample_at(&self, t: f32) -> f32 {
        self.gain_at(t) * (std::f32::consts::TAU * self.frequency_hz * t).sin()
    }
}
