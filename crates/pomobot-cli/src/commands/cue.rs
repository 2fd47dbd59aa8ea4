use std::time::Duration;

use clap::Args;
use pomobot_core::audio::default_backend;
use pomobot_core::{AudioBackend, Config, CueOutcome, SessionType, ToneSpec, ToneSynthesizer};
use serde::Serialize;

const DEVICE_WAIT: Duration = Duration::from_secs(2);

#[derive(Args)]
pub struct CueArgs {
    /// Session that just ended: "work" plays the melody upward, "break" downward
    #[arg(default_value = "work")]
    ended: SessionType,
    /// Comma-separated note frequencies in Hz (defaults to the configured melody)
    #[arg(long, value_delimiter = ',')]
    freqs: Vec<f32>,
    /// Peak volume in (0, 1]
    #[arg(long)]
    volume: Option<f32>,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct CueReport<'a> {
    ended: SessionType,
    backend: &'a str,
    melody: Vec<f32>,
    outcome: CueOutcome,
}

pub fn run(args: CueArgs) -> Result<(), Box<dyn std::error::Error>> {
    let configured = Config::load_or_default().tone_spec();
    let frequencies = if args.freqs.is_empty() {
        configured.frequencies_hz().to_vec()
    } else {
        args.freqs
    };
    let spec = ToneSpec::new(frequencies, args.volume.unwrap_or(configured.peak_volume()))?;

    // A one-shot preview can afford to wait for the device to open.
    let backend = default_backend();
    if !backend.wait_ready(DEVICE_WAIT) {
        tracing::debug!(backend = backend.name(), "audio device not ready");
    }

    // Running the command is the user gesture.
    let mut synth = ToneSynthesizer::new(backend);
    synth.prime();
    let outcome = synth.play_end_cue(args.ended, &spec);

    // Playback runs off this thread; let it finish before the process exits.
    if let CueOutcome::Played { .. } = outcome {
        std::thread::sleep(Duration::from_secs_f32(spec.duration_secs() + 0.1));
    }

    let report = CueReport {
        ended: args.ended,
        backend: synth.backend_name(),
        melody: spec.melody(args.ended),
        outcome,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let what = match outcome {
            CueOutcome::Disabled => "disabled".to_string(),
            CueOutcome::Played { segments } => format!("played {segments} notes"),
            CueOutcome::Fallback => "played fallback beep".to_string(),
            CueOutcome::Silent => "no audio output available".to_string(),
        };
        println!("{} cue via {}: {what}", report.ended, report.backend);
    }
    Ok(())
}
