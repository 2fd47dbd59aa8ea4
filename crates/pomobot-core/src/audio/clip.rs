//! The embedded fallback beep.
//!
//! The clip stays encoded; backends that can play it decode it themselves.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::AudioError;

/// 60 ms, 1 kHz, 8-bit mono WAV at 8 kHz.
const FALLBACK_BEEP_WAV_BASE64: &str = concat!(
    "UklGRgQCAABXQVZFZm10IBAAAAABAAEAQB8AAEAfAAABAAgAZGF0YeABAACAgYSEgHhydICOlpGA",
    "a2Bof5uonoBeTlt/p7qqgFE8Tn+0zLeARSpBf7/av4BAJkB/v9q/gEAmQH+/2r+AQCZAf7/av4BA",
    "JkB/v9q/gEAmQH+/2r9/QCZAf7/av4BAJkB/v9q/gEAmQH+/2r+AQCZAf7/av4BAJkB/v9q/gEAm",
    "QH+/2r+AQCZAf7/av4BAJkB/v9q/gEAmQH+/2r+AQCZAf7/av4BAJkCAv9q/gEAmQH+/2r+AQCZA",
    "f7/av39AJkB/v9q/gEAmQH+/2r+AQCZAf7/av4BAJkB/v9q/f0AmQH+/2r+AQCZAf7/av4BAJkB/",
    "v9q/gEAmQH+/2r+AQCZAf7/av4BAJkB/v9q/gEAmQH+/2r+AQCZAf7/av4BAJkB/v9q/gEAmQH+/",
    "2r+AQCZAf7/av4BAJkB/v9q/gEAmQH+/2r+AQCZAf7/av4BAJkCAv9q/gEAmQH+/2r+AQCZAf7/a",
    "v4BAJkB/v9i+gEMqRH+60rl/RzBIgLbMtYBLNkx/ssaxgE88UH+uwK2AU0JVf6m6qIBYSFl/pbSk",
    "gFxOXX+hrqCAYFRhf52onIBkWmZ/mKKXgGlgaoCUnJOAbWZuf5CWj4BxbHJ/jJCLgHVydn+HioaA",
    "enh7f4OEgoB+fn8=",
);

/// The embedded beep as WAV bytes, unpacked from base64 on first use.
pub fn fallback_beep() -> Result<&'static [u8], AudioError> {
    static BEEP: OnceLock<Result<Vec<u8>, AudioError>> = OnceLock::new();
    BEEP.get_or_init(|| {
        STANDARD
            .decode(FALLBACK_BEEP_WAV_BASE64)
            .map_err(|e| AudioError::InvalidClip(e.to_string()))
    })
    .as_ref()
    .map(Vec::as_slice)
    .map_err(Clone::clone)
}
