//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use pomobot_core::audio::{AudioBackend, CueContext};
use pomobot_core::persistence::{CompletedSessionRecord, PersistenceService, Preferences, UserId};
use pomobot_core::rating::{RatingPrompt, RatingResponse};
use pomobot_core::{AudioError, Event, PersistenceError, SessionType};

// ============================================================================
// Audio
// ============================================================================

/// Backend that records how many samples each cue rendered and whether a
/// background loop is playing.
#[derive(Default)]
pub struct RecordingBackend {
    pub cues: Mutex<Vec<usize>>,
    pub clips: AtomicUsize,
    pub ambient: Mutex<Option<usize>>,
    pub ambient_starts: AtomicUsize,
}

impl RecordingBackend {
    pub fn cue_count(&self) -> usize {
        self.cues.lock().unwrap().len()
    }

    pub fn ambient_active(&self) -> bool {
        self.ambient.lock().unwrap().is_some()
    }
}

struct RecordingContext(Arc<RecordingBackend>);

impl CueContext for RecordingContext {
    fn sample_rate(&self) -> u32 {
        8_000
    }

    fn play(self: Box<Self>, samples: Vec<f32>) -> Result<(), AudioError> {
        self.0.cues.lock().unwrap().push(samples.len());
        Ok(())
    }
}

/// Newtype so the backend can hand out contexts holding an `Arc` to itself.
pub struct SharedRecorder(pub Arc<RecordingBackend>);

impl AudioBackend for SharedRecorder {
    fn name(&self) -> &str {
        "recording"
    }

    fn open_context(&self) -> Result<Box<dyn CueContext>, AudioError> {
        Ok(Box::new(RecordingContext(Arc::clone(&self.0))))
    }

    fn play_clip(&self, _wav: &[u8]) -> Result<(), AudioError> {
        self.0.clips.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unlock(&self) -> Result<(), AudioError> {
        Ok(())
    }

    fn start_ambient(&self, samples: Vec<f32>) -> Result<(), AudioError> {
        self.0.ambient_starts.fetch_add(1, Ordering::SeqCst);
        *self.0.ambient.lock().unwrap() = Some(samples.len());
        Ok(())
    }

    fn stop_ambient(&self) {
        *self.0.ambient.lock().unwrap() = None;
    }
}

pub fn recording_backend() -> (Arc<dyn AudioBackend>, Arc<RecordingBackend>) {
    let recorder = Arc::new(RecordingBackend::default());
    (Arc::new(SharedRecorder(Arc::clone(&recorder))), recorder)
}

// ============================================================================
// Rating prompts
// ============================================================================

/// Answers every request with the same response.
pub struct ScriptedPrompt {
    response: RatingResponse,
    pub requests: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn new(response: RatingResponse) -> Self {
        Self {
            response,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingPrompt for ScriptedPrompt {
    async fn request_rating(&self, session_type: SessionType) -> RatingResponse {
        assert_eq!(session_type, SessionType::Work);
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.response
    }
}

/// Holds each request open until the test answers through the channel.
pub struct ManualPrompt {
    answers: tokio::sync::Mutex<mpsc::UnboundedReceiver<RatingResponse>>,
}

impl ManualPrompt {
    pub fn new() -> (Self, mpsc::UnboundedSender<RatingResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                answers: tokio::sync::Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl RatingPrompt for ManualPrompt {
    async fn request_rating(&self, _session_type: SessionType) -> RatingResponse {
        self.answers
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(RatingResponse::Dismissed)
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Every call fails.
pub struct UnavailableStore;

#[async_trait]
impl PersistenceService for UnavailableStore {
    async fn load_preferences(&self, _user: &UserId) -> Result<Option<Preferences>, PersistenceError> {
        Err(PersistenceError::Unavailable("offline".into()))
    }

    async fn save_preferences(
        &self,
        _user: &UserId,
        _prefs: &Preferences,
    ) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("offline".into()))
    }

    async fn save_completed_session(
        &self,
        _user: &UserId,
        _record: CompletedSessionRecord,
    ) -> Result<String, PersistenceError> {
        Err(PersistenceError::Unavailable("offline".into()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn kinds(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(Event::kind).collect()
}
