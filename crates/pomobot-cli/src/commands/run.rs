//! Interactive timer on the terminal.
//!
//! Lines typed on stdin become controller commands; controller events are
//! printed to stdout (human-readable or one JSON object per line). The
//! countdown itself goes to the terminal title.

use std::collections::VecDeque;
use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use pomobot_core::audio::default_backend;
use pomobot_core::display::{title_for, IDLE_TITLE};
use pomobot_core::rating::BannerKind;
use pomobot_core::{
    AmbientDisplay, Collaborators, Command, Config, Controller, CueOutcome, Database, Event,
    PersistenceService, Rating, RatingPrompt, RatingResponse, SessionType, Settings, TimerConfig,
    UserId,
};

#[derive(Args)]
pub struct RunArgs {
    /// Work duration in minutes (1-60)
    #[arg(long)]
    work: Option<String>,
    /// Break duration in minutes (1-60)
    #[arg(long = "break")]
    break_: Option<String>,
    /// Sign in as this user
    #[arg(long)]
    user: Option<String>,
    /// Start with cues turned off
    #[arg(long)]
    mute: bool,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

const HELP: &str = "\
keys: t toggle | s skip | r reset | set W B durations | login ID | logout
      theme | audio | music | status | q quit
      1-5 rate the last work session | d dismiss the rating";

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(args));
    // The stdin reader sits in a blocking read; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn session(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let user = match args.user.as_deref() {
        Some(id) => Some(UserId::new(id)?),
        None => config.user_id(),
    };
    let persistence: Arc<dyn PersistenceService> = Arc::new(Database::open()?);
    let pending = PendingRatings::default();

    let settings = Settings {
        timer: timer_config(&config, &args),
        tone: config.tone_spec(),
        audio_enabled: config.audio.enabled && !args.mute,
        dark_mode: config.ui.dark_mode,
        user,
    };
    let (controller, events) = Controller::new(
        settings,
        Collaborators {
            audio: default_backend(),
            prompt: Arc::new(StdinPrompt::new(pending.clone())),
            persistence,
            display: Box::new(TerminalTitle::new()),
        },
    );

    if !args.json {
        eprintln!("{HELP}");
    }

    let (commands_tx, commands_rx) = mpsc::channel(32);
    let printer = tokio::spawn(print_events(events, args.json));
    let reader = tokio::spawn(read_input(commands_tx, pending));

    controller.run(commands_rx).await;
    reader.abort();
    printer.await?;
    Ok(())
}

/// Configured durations, overridden by any flags given.
fn timer_config(config: &Config, args: &RunArgs) -> TimerConfig {
    let configured = config.timer_config();
    if args.work.is_none() && args.break_.is_none() {
        return configured;
    }
    let work = args
        .work
        .clone()
        .unwrap_or_else(|| configured.work_duration_min().to_string());
    let break_ = args
        .break_
        .clone()
        .unwrap_or_else(|| configured.break_duration_min().to_string());
    TimerConfig::from_input(&work, &break_)
}

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Answer(RatingResponse),
    Help,
    Empty,
}

fn parse_line(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Input::Empty);
    };

    let command = match head {
        "t" | "toggle" => Command::Toggle,
        "s" | "skip" => Command::Skip,
        "r" | "reset" => Command::Reset,
        "set" => match (words.next(), words.next()) {
            (Some(work), Some(break_)) => Command::ChangeSettings {
                work: work.to_string(),
                break_: break_.to_string(),
            },
            _ => return Err("usage: set WORK BREAK".to_string()),
        },
        "login" => {
            let id = words.next().ok_or("usage: login USER_ID")?;
            Command::SignIn(UserId::new(id).map_err(|e| e.to_string())?)
        }
        "logout" => Command::SignOut,
        "theme" => Command::ToggleTheme,
        "audio" => Command::ToggleAudio,
        "music" => Command::ToggleAmbient,
        "status" => Command::Snapshot,
        "q" | "quit" => Command::Shutdown,
        "d" | "dismiss" => return Ok(Input::Answer(RatingResponse::Dismissed)),
        "h" | "help" | "?" => return Ok(Input::Help),
        other => match other.parse::<u8>() {
            Ok(value) => {
                let rating = Rating::try_from(value).map_err(|e| e.to_string())?;
                return Ok(Input::Answer(RatingResponse::Submitted(rating)));
            }
            Err(_) => return Err(format!("unknown input '{other}', type h for help")),
        },
    };
    Ok(Input::Command(command))
}

async fn read_input(commands: mpsc::Sender<Command>, pending: PendingRatings) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "reading stdin failed");
                break;
            }
        };
        match parse_line(&line) {
            Ok(Input::Command(command)) => {
                if commands.send(command).await.is_err() {
                    return;
                }
            }
            Ok(Input::Answer(response)) => {
                if !pending.answer(response) {
                    eprintln!("no rating pending");
                }
            }
            Ok(Input::Help) => eprintln!("{HELP}"),
            Ok(Input::Empty) => {}
            Err(message) => eprintln!("{message}"),
        }
    }
    // End of input quits, like `q`.
    let _ = commands.send(Command::Shutdown).await;
}

// ============================================================================
// Rating prompt
// ============================================================================

/// Open prompts, oldest first. Each typed answer goes to the oldest one.
#[derive(Clone, Default)]
struct PendingRatings {
    waiting: Arc<Mutex<VecDeque<oneshot::Sender<RatingResponse>>>>,
}

impl PendingRatings {
    fn push(&self, tx: oneshot::Sender<RatingResponse>) {
        self.lock().push_back(tx);
    }

    /// Deliver `response` to the oldest open prompt. Returns `false` if none
    /// is waiting.
    fn answer(&self, response: RatingResponse) -> bool {
        let mut waiting = self.lock();
        while let Some(tx) = waiting.pop_front() {
            if tx.send(response).is_ok() {
                return true;
            }
        }
        false
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<oneshot::Sender<RatingResponse>>> {
        self.waiting.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct StdinPrompt {
    pending: PendingRatings,
}

impl StdinPrompt {
    fn new(pending: PendingRatings) -> Self {
        Self { pending }
    }
}

#[async_trait]
impl RatingPrompt for StdinPrompt {
    async fn request_rating(&self, session_type: SessionType) -> RatingResponse {
        let (tx, rx) = oneshot::channel();
        self.pending.push(tx);
        eprintln!("rate the {session_type} session: 1-5, or d to dismiss");
        // Quitting drops the sender; that counts as a dismissal.
        rx.await.unwrap_or(RatingResponse::Dismissed)
    }
}

// ============================================================================
// Output
// ============================================================================

/// Shows the countdown in the terminal window title.
struct TerminalTitle {
    enabled: bool,
    last: String,
}

impl TerminalTitle {
    fn new() -> Self {
        Self {
            enabled: std::io::stderr().is_terminal(),
            last: String::new(),
        }
    }

    fn set(&mut self, title: String) {
        if !self.enabled || title == self.last {
            return;
        }
        let mut err = std::io::stderr();
        let _ = write!(err, "\x1b]0;{title}\x07").and_then(|_| err.flush());
        self.last = title;
    }
}

impl AmbientDisplay for TerminalTitle {
    fn show_remaining(&mut self, minutes: u64, seconds: u64) {
        self.set(title_for(minutes, seconds));
    }

    fn show_idle(&mut self) {
        self.set(IDLE_TITLE.to_string());
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<Event>, json: bool) {
    while let Some(event) = events.recv().await {
        remember_locally(&event);
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "could not encode event"),
            }
        } else if let Some(line) = describe(&event) {
            println!("{line}");
        }
    }
}

/// Theme and account survive restarts through the local config file.
fn remember_locally(event: &Event) {
    let update: Box<dyn FnOnce(&mut Config)> = match event {
        Event::ThemeChanged { dark_mode, .. } => {
            let dark_mode = *dark_mode;
            Box::new(move |config| config.ui.dark_mode = dark_mode)
        }
        Event::SignedIn { user_id, .. } => {
            let user_id = user_id.clone();
            Box::new(move |config| config.account.user_id = Some(user_id))
        }
        Event::SignedOut { .. } => Box::new(|config| config.account.user_id = None),
        _ => return,
    };

    let result = Config::load().and_then(|mut config| {
        update(&mut config);
        config.save()
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "could not update local config");
    }
}

fn describe(event: &Event) -> Option<String> {
    let line = match event {
        Event::TimerStarted {
            session_type,
            remaining_secs,
            ..
        } => format!("{session_type} running, {}", clock(*remaining_secs)),
        Event::TimerPaused {
            session_type,
            remaining_secs,
            ..
        } => format!("{session_type} paused at {}", clock(*remaining_secs)),
        Event::SessionExpired {
            ended,
            next,
            sessions_completed,
            ..
        } => format!("{ended} finished ({sessions_completed} completed), {next} started"),
        Event::SessionSkipped { from, to, .. } => format!("skipped {from}, {to} ready"),
        Event::TimerReset { .. } => "reset".to_string(),
        Event::SettingsChanged {
            work_duration_min,
            break_duration_min,
            ..
        } => format!("durations: work {work_duration_min} min, break {break_duration_min} min"),
        Event::StateSnapshot { state, .. } => format!(
            "{} {} {} | {} completed",
            state.session_type,
            if state.is_running { "running" } else { "paused" },
            clock(state.remaining_secs),
            state.sessions_completed
        ),
        Event::CuePlayed {
            outcome: CueOutcome::Silent,
            ..
        } => "(cue could not be played)".to_string(),
        Event::CuePlayed { .. } => return None,
        Event::RatingRequested { .. } => return None,
        Event::StatusShown { banner, .. } => match banner.kind {
            BannerKind::Success => banner.text.clone(),
            BannerKind::Error => format!("! {}", banner.text),
        },
        Event::StatusCleared { .. } => return None,
        Event::SignedIn { user_id, .. } => format!("signed in as {user_id}"),
        Event::SignedOut { .. } => "signed out".to_string(),
        Event::PreferencesApplied {
            work_duration_min,
            break_duration_min,
            ..
        } => format!("preferences loaded (work {work_duration_min}, break {break_duration_min})"),
        Event::ThemeChanged { dark_mode, .. } => {
            format!("theme: {}", if *dark_mode { "dark" } else { "light" })
        }
        Event::AudioToggled { enabled, .. } => {
            format!("cues {}", if *enabled { "on" } else { "off" })
        }
        Event::AmbientToggled { playing, .. } => {
            format!("music {}", if *playing { "on" } else { "off" })
        }
        Event::AmbientUnavailable { reason, .. } => format!("! music unavailable: {reason}"),
    };
    Some(line)
}

fn clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
