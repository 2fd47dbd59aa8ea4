//! The single control flow of a running timer.
//!
//! Ticks, user commands, preference loads and rating banners are all
//! serialized onto one `select!` loop. Each branch runs to completion before
//! the next is polled, so the cue, counter bump and transition for an expiry
//! always land together, before any later tick.
//!
//! Work that has to wait (rating prompt, preference I/O) is spawned and
//! reports back through channels; it never touches the engine directly.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::audio::{AudioBackend, ToneSpec, ToneSynthesizer};
use crate::display::AmbientDisplay;
use crate::events::Event;
use crate::persistence::{PersistenceService, Preferences, UserId};
use crate::rating::{RatingGate, RatingPrompt, StatusBanner, StatusSlot};
use crate::timer::{SessionType, Ticker, TimerConfig, TimerEngine};

/// User-triggered input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Skip,
    Reset,
    /// Raw settings form input; parsed leniently.
    ChangeSettings { work: String, break_: String },
    SignIn(UserId),
    SignOut,
    ToggleTheme,
    ToggleAudio,
    /// Background audio on/off; the toggle doubles as the audio-unlock gesture.
    ToggleAmbient,
    Snapshot,
    Shutdown,
}

/// Initial values for a controller.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timer: TimerConfig,
    pub tone: ToneSpec,
    pub audio_enabled: bool,
    pub dark_mode: bool,
    pub user: Option<UserId>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            tone: ToneSpec::default(),
            audio_enabled: true,
            dark_mode: true,
            user: None,
        }
    }
}

/// External pieces the controller talks to.
pub struct Collaborators {
    pub audio: Arc<dyn AudioBackend>,
    pub prompt: Arc<dyn RatingPrompt>,
    pub persistence: Arc<dyn PersistenceService>,
    pub display: Box<dyn AmbientDisplay>,
}

type LoadedPreferences = (UserId, Option<Preferences>);

pub struct Controller {
    engine: TimerEngine,
    ticker: Ticker,
    synth: ToneSynthesizer,
    tone: ToneSpec,
    gate: RatingGate,
    persistence: Arc<dyn PersistenceService>,
    display: Box<dyn AmbientDisplay>,
    status: StatusSlot,
    status_rx: mpsc::UnboundedReceiver<StatusBanner>,
    prefs_tx: mpsc::UnboundedSender<LoadedPreferences>,
    prefs_rx: mpsc::UnboundedReceiver<LoadedPreferences>,
    events: mpsc::UnboundedSender<Event>,
    user: Option<UserId>,
    prefs_loaded: bool,
    dark_mode: bool,
}

impl Controller {
    /// Build a controller and the stream of events it publishes.
    pub fn new(settings: Settings, collaborators: Collaborators) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (prefs_tx, prefs_rx) = mpsc::unbounded_channel();

        let mut synth = ToneSynthesizer::new(collaborators.audio);
        synth.set_enabled(settings.audio_enabled);

        let gate = RatingGate::new(
            collaborators.prompt,
            Arc::clone(&collaborators.persistence),
            status_tx,
        );

        let mut controller = Self {
            engine: TimerEngine::new(settings.timer),
            ticker: Ticker::new(),
            synth,
            tone: settings.tone,
            gate,
            persistence: collaborators.persistence,
            display: collaborators.display,
            status: StatusSlot::new(),
            status_rx,
            prefs_tx,
            prefs_rx,
            events: events_tx,
            user: None,
            prefs_loaded: false,
            dark_mode: settings.dark_mode,
        };
        if let Some(user) = settings.user {
            controller.sign_in(user);
        }
        (controller, events_rx)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn audio_enabled(&self) -> bool {
        self.synth.is_enabled()
    }

    pub fn ambient_playing(&self) -> bool {
        self.synth.is_ambient_playing()
    }

    pub fn ticker_active(&self) -> bool {
        self.ticker.is_active()
    }

    pub fn visible_status(&self, now: Instant) -> Option<&StatusBanner> {
        self.status.visible(now)
    }

    // ── Loop ─────────────────────────────────────────────────────────

    /// Drive the controller until `Shutdown` or until the command channel
    /// closes. The ticker and any background audio are always stopped on the
    /// way out.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.refresh_display();
        self.emit(self.engine.snapshot());

        loop {
            let clear_at = self.status.deadline();
            tokio::select! {
                _ = self.ticker.next_tick() => self.on_tick(),
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(banner) = self.status_rx.recv() => self.on_status(banner),
                Some((user, prefs)) = self.prefs_rx.recv() => self.on_preferences_loaded(user, prefs),
                _ = sleep_until(clear_at) => self.clear_status(),
            }
        }

        self.ticker.stop();
        self.synth.stop_ambient();
        self.display.show_idle();
        tracing::debug!("controller stopped");
    }

    // ── Handlers ─────────────────────────────────────────────────────

    /// Apply one command. Returns `false` when the loop should stop.
    pub fn handle_command(&mut self, command: Command) -> bool {
        tracing::debug!(?command, "command");
        match command {
            Command::Toggle => {
                let event = self.engine.toggle();
                self.emit(event);
            }
            Command::Skip => {
                let event = self.engine.skip();
                self.emit(event);
            }
            Command::Reset => {
                let event = self.engine.reset();
                self.emit(event);
            }
            Command::ChangeSettings { work, break_ } => {
                let event = self.engine.change_settings_from_input(&work, &break_);
                self.emit(event);
                self.save_preferences();
            }
            Command::SignIn(user) => self.sign_in(user),
            Command::SignOut => {
                self.user = None;
                self.prefs_loaded = false;
                self.emit(Event::SignedOut { at: Utc::now() });
            }
            Command::ToggleTheme => {
                self.dark_mode = !self.dark_mode;
                self.emit(Event::ThemeChanged {
                    dark_mode: self.dark_mode,
                    at: Utc::now(),
                });
                self.save_preferences();
            }
            Command::ToggleAudio => {
                let enabled = !self.synth.is_enabled();
                self.synth.set_enabled(enabled);
                self.emit(Event::AudioToggled {
                    enabled,
                    at: Utc::now(),
                });
                self.save_preferences();
            }
            Command::ToggleAmbient => self.toggle_ambient(),
            Command::Snapshot => self.emit(self.engine.snapshot()),
            Command::Shutdown => return false,
        }
        self.sync_ticker();
        self.refresh_display();
        true
    }

    /// One second elapsed.
    pub fn on_tick(&mut self) {
        if let Some(event) = self.engine.tick() {
            let expired = match &event {
                Event::SessionExpired {
                    ended,
                    ended_duration_secs,
                    ..
                } => Some((*ended, *ended_duration_secs)),
                _ => None,
            };
            self.emit(event);

            if let Some((ended, duration_secs)) = expired {
                let outcome = self.synth.play_end_cue(ended, &self.tone);
                self.emit(Event::CuePlayed {
                    ended,
                    outcome,
                    at: Utc::now(),
                });
                if ended == SessionType::Work
                    && self
                        .gate
                        .on_work_session_expired(self.user.as_ref(), duration_secs)
                        .is_some()
                {
                    self.emit(Event::RatingRequested {
                        session_type: SessionType::Work,
                        duration_secs,
                        at: Utc::now(),
                    });
                }
            }
        }
        self.refresh_display();
    }

    pub fn on_status(&mut self, banner: StatusBanner) {
        self.status.show(banner.clone(), Instant::now());
        self.emit(Event::StatusShown {
            banner,
            at: Utc::now(),
        });
    }

    pub fn clear_status(&mut self) {
        if self.status.clear_expired(Instant::now()).is_some() {
            self.emit(Event::StatusCleared { at: Utc::now() });
        }
    }

    pub fn on_preferences_loaded(&mut self, user: UserId, prefs: Option<Preferences>) {
        if self.user.as_ref() != Some(&user) {
            tracing::debug!(user = %user, "ignoring preferences for a signed-out user");
            return;
        }
        self.prefs_loaded = true;
        let Some(prefs) = prefs else {
            return;
        };

        if let Some(enabled) = prefs.audio_enabled {
            self.synth.set_enabled(enabled);
        }
        if let Some(dark_mode) = prefs.dark_mode {
            self.dark_mode = dark_mode;
        }

        let current = self.engine.config();
        let wanted = TimerConfig::new(
            prefs.work_duration_min.unwrap_or(current.work_duration_min()),
            prefs.break_duration_min.unwrap_or(current.break_duration_min()),
        );
        // A session already under way keeps its length.
        if wanted != current {
            let resized = self.engine.set_config(wanted);
            tracing::debug!(user = %user, resized, "stored durations applied");
        }

        self.emit(Event::PreferencesApplied {
            work_duration_min: wanted.work_duration_min(),
            break_duration_min: wanted.break_duration_min(),
            audio_enabled: self.synth.is_enabled(),
            dark_mode: self.dark_mode,
            at: Utc::now(),
        });
        self.sync_ticker();
        self.refresh_display();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn sign_in(&mut self, user: UserId) {
        self.user = Some(user.clone());
        self.prefs_loaded = false;
        self.emit(Event::SignedIn {
            user_id: user.to_string(),
            at: Utc::now(),
        });

        let persistence = Arc::clone(&self.persistence);
        let prefs_tx = self.prefs_tx.clone();
        tokio::spawn(async move {
            let prefs = match persistence.load_preferences(&user).await {
                Ok(prefs) => prefs,
                Err(e) => {
                    tracing::warn!(user = %user, error = %e, "could not load preferences");
                    None
                }
            };
            let _ = prefs_tx.send((user, prefs));
        });
    }

    /// Best effort; failures are logged and otherwise ignored.
    fn save_preferences(&self) {
        let Some(user) = self.user.clone() else {
            return;
        };
        // Saving before the load finished would overwrite stored values.
        if !self.prefs_loaded {
            return;
        }
        let config = self.engine.config();
        let prefs = Preferences {
            work_duration_min: Some(config.work_duration_min()),
            break_duration_min: Some(config.break_duration_min()),
            audio_enabled: Some(self.synth.is_enabled()),
            dark_mode: Some(self.dark_mode),
        };
        let persistence = Arc::clone(&self.persistence);
        tokio::spawn(async move {
            if let Err(e) = persistence.save_preferences(&user, &prefs).await {
                tracing::warn!(user = %user, error = %e, "saving preferences failed");
            }
        });
    }

    fn toggle_ambient(&mut self) {
        self.synth.prime();
        if self.synth.is_ambient_playing() {
            self.synth.stop_ambient();
        } else if let Err(e) = self.synth.start_ambient() {
            tracing::warn!(error = %e, "background audio unavailable");
            self.emit(Event::AmbientUnavailable {
                reason: e.to_string(),
                at: Utc::now(),
            });
            return;
        }
        self.emit(Event::AmbientToggled {
            playing: self.synth.is_ambient_playing(),
            at: Utc::now(),
        });
    }

    fn sync_ticker(&mut self) {
        match (self.engine.is_running(), self.ticker.is_active()) {
            (true, false) => {
                self.ticker.start();
            }
            (false, true) => self.ticker.stop(),
            _ => {}
        }
    }

    fn refresh_display(&mut self) {
        if self.engine.is_running() {
            let (minutes, seconds) = self.engine.display();
            self.display.show_remaining(minutes, seconds);
        } else {
            self.display.show_idle();
        }
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
