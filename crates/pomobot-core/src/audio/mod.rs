mod ambient;
mod backend;
mod clip;
#[cfg(feature = "rodio-playback")]
mod rodio_backend;
mod synth;
mod tone;

pub use ambient::{render_ambient_loop, AMBIENT_LOOP_SECS};
pub use backend::{AudioBackend, BellBackend, CueContext};
pub use clip::fallback_beep;
#[cfg(feature = "rodio-playback")]
pub use rodio_backend::RodioBackend;
pub use synth::{CueOutcome, ToneSynthesizer};
pub use tone::{ToneSegment, ToneSpec, ATTACK_SECS, RELEASE_TAIL_SECS, SAMPLE_RATE, SEGMENT_SECS};

use std::sync::Arc;

/// The best backend this build supports.
pub fn default_backend() -> Arc<dyn AudioBackend> {
    #[cfg(feature = "rodio-playback")]
    {
        Arc::new(RodioBackend::new())
    }
    #[cfg(not(feature = "rodio-playback"))]
    {
        Arc::new(BellBackend)
    }
}
