//! Sign-in, stored preferences and toggles through the controller loop.

mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pomobot_core::audio::{AudioBackend, BellBackend};
use pomobot_core::persistence::{PersistenceService, Preferences};
use pomobot_core::rating::RatingResponse;
use pomobot_core::{
    Collaborators, Command, Controller, Database, Event, Settings, TimerPhase, TitleDisplay,
};
use support::{drain, kinds, recording_backend, user, ScriptedPrompt, UnavailableStore};

type Running = (
    mpsc::Sender<Command>,
    mpsc::UnboundedReceiver<Event>,
    JoinHandle<()>,
);

fn start(persistence: Arc<dyn PersistenceService>) -> Running {
    start_with(Arc::new(BellBackend), persistence)
}

fn start_with(audio: Arc<dyn AudioBackend>, persistence: Arc<dyn PersistenceService>) -> Running {
    let (controller, events) = Controller::new(
        Settings::default(),
        Collaborators {
            audio,
            prompt: Arc::new(ScriptedPrompt::new(RatingResponse::Dismissed)),
            persistence,
            display: Box::new(TitleDisplay::new()),
        },
    );
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(controller.run(rx));
    (tx, events, handle)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

async fn stored_prefs() -> Arc<Database> {
    let db = Arc::new(Database::open_memory().unwrap());
    db.save_preferences(
        &user("ana"),
        &Preferences {
            work_duration_min: Some(30),
            break_duration_min: Some(10),
            audio_enabled: Some(false),
            dark_mode: Some(false),
        },
    )
    .await
    .unwrap();
    db
}

fn snapshot(events: &[Event]) -> (TimerPhase, u64, u32, u32) {
    events
        .iter()
        .rev()
        .find_map(|event| match event {
            Event::StateSnapshot {
                phase,
                state,
                work_duration_min,
                break_duration_min,
                ..
            } => Some((
                *phase,
                state.remaining_secs,
                *work_duration_min,
                *break_duration_min,
            )),
            _ => None,
        })
        .expect("no snapshot emitted")
}

#[tokio::test(start_paused = true)]
async fn preferences_apply_immediately_when_paused() {
    let db = stored_prefs().await;
    let (tx, mut events, handle) = start(db);

    tx.send(Command::SignIn(user("ana"))).await.unwrap();
    settle().await;
    tx.send(Command::Snapshot).await.unwrap();
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let events = drain(&mut events);
    let (phase, remaining, work, break_) = snapshot(&events);
    assert_eq!(phase, TimerPhase::WorkPaused);
    assert_eq!(remaining, 30 * 60);
    assert_eq!((work, break_), (30, 10));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::PreferencesApplied {
            audio_enabled: false,
            dark_mode: false,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn stored_durations_never_cut_into_a_running_session() {
    let db = stored_prefs().await;
    let (tx, mut events, handle) = start(db);

    tx.send(Command::Toggle).await.unwrap();
    tx.send(Command::SignIn(user("ana"))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600_500)).await;
    tx.send(Command::Toggle).await.unwrap();
    tx.send(Command::Toggle).await.unwrap();
    tx.send(Command::Snapshot).await.unwrap();
    settle().await;

    let resumed = drain(&mut events);
    assert!(!kinds(&resumed).contains(&"settings_changed"));
    let (phase, remaining, work, break_) = snapshot(&resumed);
    assert_eq!(phase, TimerPhase::WorkRunning);
    assert_eq!(remaining, 900);
    assert_eq!((work, break_), (30, 10));

    // The started session runs out at its old length; the break is the new one.
    tokio::time::sleep(Duration::from_millis(900_000)).await;
    tx.send(Command::Snapshot).await.unwrap();
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let later = drain(&mut events);
    assert!(later.iter().any(|e| matches!(
        e,
        Event::SessionExpired {
            ended_duration_secs: 1500,
            ..
        }
    )));
    let (phase, remaining, _, _) = snapshot(&later);
    assert_eq!(phase, TimerPhase::BreakRunning);
    assert_eq!(remaining, 600);
}

#[tokio::test(start_paused = true)]
async fn stored_durations_keep_a_paused_session_in_place() {
    let db = stored_prefs().await;
    let (tx, mut events, handle) = start(db);

    tx.send(Command::Toggle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100_500)).await;
    tx.send(Command::Toggle).await.unwrap();
    tx.send(Command::SignIn(user("ana"))).await.unwrap();
    settle().await;
    tx.send(Command::Snapshot).await.unwrap();
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let events = drain(&mut events);
    assert!(kinds(&events).contains(&"preferences_applied"));
    let (phase, remaining, work, break_) = snapshot(&events);
    assert_eq!(phase, TimerPhase::WorkPaused);
    assert_eq!(remaining, 1400);
    assert_eq!((work, break_), (30, 10));
}

#[tokio::test(start_paused = true)]
async fn toggles_are_saved_once_preferences_loaded() {
    let db = Arc::new(Database::open_memory().unwrap());
    let (tx, _events, handle) = start(db.clone());

    tx.send(Command::SignIn(user("ana"))).await.unwrap();
    settle().await;
    tx.send(Command::ToggleTheme).await.unwrap();
    tx.send(Command::ChangeSettings {
        work: "50".into(),
        break_: "0".into(),
    })
    .await
    .unwrap();
    settle().await;
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let prefs = db.load_preferences(&user("ana")).await.unwrap().unwrap();
    assert_eq!(prefs.dark_mode, Some(false));
    assert_eq!(prefs.work_duration_min, Some(50));
    assert_eq!(prefs.break_duration_min, Some(1));
    assert_eq!(prefs.audio_enabled, Some(true));
}

#[tokio::test(start_paused = true)]
async fn anonymous_toggles_are_not_saved() {
    let db = Arc::new(Database::open_memory().unwrap());
    let (tx, mut events, handle) = start(db.clone());

    tx.send(Command::ToggleAudio).await.unwrap();
    tx.send(Command::ToggleTheme).await.unwrap();
    settle().await;
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    assert!(db.load_preferences(&user("ana")).await.unwrap().is_none());
    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::AudioToggled { enabled: false, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ThemeChanged { dark_mode: false, .. })));
}

#[tokio::test(start_paused = true)]
async fn unavailable_storage_never_disturbs_the_timer() {
    let (tx, mut events, handle) = start(Arc::new(UnavailableStore));

    tx.send(Command::SignIn(user("ana"))).await.unwrap();
    tx.send(Command::Toggle).await.unwrap();
    tx.send(Command::ToggleTheme).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    tx.send(Command::Snapshot).await.unwrap();
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let events = drain(&mut events);
    let (phase, remaining, work, _) = snapshot(&events);
    assert_eq!(phase, TimerPhase::WorkRunning);
    assert_eq!(remaining, 1500 - 2);
    assert_eq!(work, 25);
    assert!(!kinds(&events).contains(&"preferences_applied"));
}

#[tokio::test(start_paused = true)]
async fn sign_out_drops_late_preferences() {
    let db = stored_prefs().await;
    let (tx, mut events, handle) = start(db);

    tx.send(Command::SignIn(user("ana"))).await.unwrap();
    tx.send(Command::SignOut).await.unwrap();
    settle().await;
    tx.send(Command::Snapshot).await.unwrap();
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let events = drain(&mut events);
    assert!(!kinds(&events).contains(&"preferences_applied"));
    let (_, remaining, work, _) = snapshot(&events);
    assert_eq!(remaining, 1500);
    assert_eq!(work, 25);
}

fn ambient_states(events: &[Event]) -> Vec<bool> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::AmbientToggled { playing, .. } => Some(*playing),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn ambient_toggle_drives_background_playback() {
    let (audio, recorder) = recording_backend();
    let (tx, mut events, handle) = start_with(audio, Arc::new(Database::open_memory().unwrap()));

    tx.send(Command::ToggleAmbient).await.unwrap();
    settle().await;
    assert!(recorder.ambient_active());
    assert!(recorder.ambient.lock().unwrap().is_some_and(|len| len > 0));

    tx.send(Command::ToggleAmbient).await.unwrap();
    settle().await;
    assert!(!recorder.ambient_active());

    tx.send(Command::ToggleAmbient).await.unwrap();
    settle().await;
    assert!(recorder.ambient_active());

    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    // Shutting down silences the loop.
    assert!(!recorder.ambient_active());
    assert_eq!(recorder.ambient_starts.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(ambient_states(&drain(&mut events)), vec![true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn ambient_toggle_reports_a_backend_without_background_audio() {
    let (tx, mut events, handle) = start(Arc::new(Database::open_memory().unwrap()));

    tx.send(Command::ToggleAmbient).await.unwrap();
    tx.send(Command::Shutdown).await.unwrap();
    handle.await.unwrap();

    let events = drain(&mut events);
    assert!(ambient_states(&events).is_empty());
    assert!(kinds(&events).contains(&"ambient_unavailable"));
}
