//! Playback through the default output device via `rodio`.
//!
//! `rodio::OutputStream` is not `Send`, so the stream lives on one output
//! thread for the backend's whole life. The device is opened there in the
//! background; until it is ready, cue contexts cannot be opened and the
//! caller degrades instead of waiting. Each cue or clip gets its own
//! detached `Sink` that tears itself down when the source ends; the ambient
//! loop keeps one sink until stopped.

use std::io::Cursor;
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::backend::{AudioBackend, CueContext};
use super::tone::SAMPLE_RATE;
use crate::error::AudioError;

enum Request {
    Cue(Vec<f32>),
    Clip(Vec<u8>),
    StartAmbient(Vec<f32>),
    StopAmbient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum DeviceState {
    #[default]
    Opening,
    Ready,
    Failed(String),
}

/// Device state shared with the output thread.
#[derive(Default)]
struct Device {
    state: Mutex<DeviceState>,
    changed: Condvar,
}

impl Device {
    fn set(&self, state: DeviceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        self.changed.notify_all();
    }

    fn get(&self) -> DeviceState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_ready(&self) -> Result<(), AudioError> {
        match self.get() {
            DeviceState::Ready => Ok(()),
            DeviceState::Opening => Err(AudioError::Unavailable(
                "output device is still opening".into(),
            )),
            DeviceState::Failed(reason) => Err(AudioError::Unavailable(reason)),
        }
    }
}

pub struct RodioBackend {
    requests: mpsc::Sender<Request>,
    device: Arc<Device>,
}

impl RodioBackend {
    /// Start the output thread. Returns at once; the device opens in the
    /// background.
    pub fn new() -> Self {
        let (requests, rx) = mpsc::channel();
        let device = Arc::new(Device::default());

        let thread_device = Arc::clone(&device);
        let spawned = std::thread::Builder::new()
            .name("pomobot-audio".into())
            .spawn(move || output_thread(&thread_device, &rx));
        if let Err(e) = spawned {
            device.set(DeviceState::Failed(e.to_string()));
        }

        Self { requests, device }
    }

    fn send(&self, request: Request) -> Result<(), AudioError> {
        self.requests
            .send(request)
            .map_err(|_| AudioError::Playback("output thread exited".into()))
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RodioBackend {
    fn name(&self) -> &str {
        "rodio"
    }

    fn open_context(&self) -> Result<Box<dyn CueContext>, AudioError> {
        self.device.check_ready()?;
        Ok(Box::new(RodioContext {
            requests: self.requests.clone(),
        }))
    }

    fn play_clip(&self, wav: &[u8]) -> Result<(), AudioError> {
        self.device.check_ready()?;
        self.send(Request::Clip(wav.to_vec()))
    }

    fn unlock(&self) -> Result<(), AudioError> {
        self.device.check_ready()
    }

    fn start_ambient(&self, samples: Vec<f32>) -> Result<(), AudioError> {
        self.device.check_ready()?;
        self.send(Request::StartAmbient(samples))
    }

    fn stop_ambient(&self) {
        let _ = self.send(Request::StopAmbient);
    }

    fn wait_ready(&self, timeout: Duration) -> bool {
        let guard = self
            .device
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .device
            .changed
            .wait_timeout_while(guard, timeout, |state| *state == DeviceState::Opening)
            .unwrap_or_else(PoisonError::into_inner);
        *guard == DeviceState::Ready
    }
}

struct RodioContext {
    requests: mpsc::Sender<Request>,
}

impl CueContext for RodioContext {
    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn play(self: Box<Self>, samples: Vec<f32>) -> Result<(), AudioError> {
        self.requests
            .send(Request::Cue(samples))
            .map_err(|_| AudioError::Playback("output thread exited".into()))
    }
}

/// Owns the stream until every sender is gone.
fn output_thread(device: &Device, requests: &mpsc::Receiver<Request>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            tracing::debug!(error = %e, "no audio output device");
            device.set(DeviceState::Failed(e.to_string()));
            return;
        }
    };
    device.set(DeviceState::Ready);

    let mut ambient: Option<Sink> = None;
    while let Ok(request) = requests.recv() {
        let result = match request {
            Request::Cue(samples) => new_sink(&handle).map(|sink| {
                sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
                sink.detach();
            }),
            Request::Clip(wav) => decode_clip(wav).and_then(|clip| {
                new_sink(&handle).map(|sink| {
                    sink.append(clip);
                    sink.detach();
                })
            }),
            Request::StartAmbient(samples) => {
                if let Some(old) = ambient.take() {
                    old.stop();
                }
                new_sink(&handle).map(|sink| {
                    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples).repeat_infinite());
                    ambient = Some(sink);
                })
            }
            Request::StopAmbient => {
                if let Some(sink) = ambient.take() {
                    sink.stop();
                }
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "audio request failed");
        }
    }
}

fn new_sink(handle: &OutputStreamHandle) -> Result<Sink, AudioError> {
    Sink::try_new(handle).map_err(|e| AudioError::Playback(e.to_string()))
}

fn decode_clip(wav: Vec<u8>) -> Result<Decoder<Cursor<Vec<u8>>>, AudioError> {
    Decoder::new(Cursor::new(wav)).map_err(|e| AudioError::InvalidClip(e.to_string()))
}
