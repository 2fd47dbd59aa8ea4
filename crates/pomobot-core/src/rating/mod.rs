//! Rating gate for finished work sessions.
//!
//! When a work session expires under a signed-in user, the gate asks the
//! rating prompt for a score and, on submission, hands a
//! [`CompletedSessionRecord`] to the persistence collaborator. The wait runs
//! on its own task; the timer has already moved on to the break.

mod status;

pub use status::{BannerKind, StatusBanner, StatusSlot, BANNER_TTL};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::persistence::{CompletedSessionRecord, PersistenceService, Rating, UserId};
use crate::timer::SessionType;

/// How the user answered the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rating", rename_all = "snake_case")]
pub enum RatingResponse {
    Submitted(Rating),
    Dismissed,
}

/// Asks the user to rate a session. No timeout: it stays open until the user
/// answers or dismisses it.
#[async_trait]
pub trait RatingPrompt: Send + Sync {
    async fn request_rating(&self, session_type: SessionType) -> RatingResponse;
}

/// Final result of one pass through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Dismissed,
    Saved { session_id: String },
    Failed { message: String },
}

pub struct RatingGate {
    prompt: Arc<dyn RatingPrompt>,
    persistence: Arc<dyn PersistenceService>,
    status_tx: mpsc::UnboundedSender<StatusBanner>,
}

impl RatingGate {
    pub fn new(
        prompt: Arc<dyn RatingPrompt>,
        persistence: Arc<dyn PersistenceService>,
        status_tx: mpsc::UnboundedSender<StatusBanner>,
    ) -> Self {
        Self {
            prompt,
            persistence,
            status_tx,
        }
    }

    /// Open the gate for an expired work session.
    ///
    /// Returns `None` without side effects when nobody is signed in.
    /// Otherwise the prompt runs on a spawned task and the handle resolves
    /// to the outcome; the caller is free to keep ticking.
    pub fn on_work_session_expired(
        &self,
        user: Option<&UserId>,
        duration_secs: u64,
    ) -> Option<JoinHandle<GateOutcome>> {
        let user = user?.clone();
        let prompt = Arc::clone(&self.prompt);
        let persistence = Arc::clone(&self.persistence);
        let status_tx = self.status_tx.clone();

        tracing::debug!(user = %user, duration_secs, "rating requested");
        Some(tokio::spawn(async move {
            let outcome = resolve(
                prompt.as_ref(),
                persistence.as_ref(),
                &user,
                duration_secs,
            )
            .await;
            if let Some(banner) = banner_for(&outcome) {
                // Receiver gone means the controller shut down; nothing to show.
                let _ = status_tx.send(banner);
            }
            outcome
        }))
    }
}

/// Ask for a rating and store the result.
///
/// `duration_secs` is the work length that was active when the session
/// started.
pub async fn resolve(
    prompt: &dyn RatingPrompt,
    persistence: &dyn PersistenceService,
    user: &UserId,
    duration_secs: u64,
) -> GateOutcome {
    let rating = match prompt.request_rating(SessionType::Work).await {
        RatingResponse::Submitted(rating) => rating,
        RatingResponse::Dismissed => {
            tracing::debug!(user = %user, "rating dismissed");
            return GateOutcome::Dismissed;
        }
    };

    let record = CompletedSessionRecord::work(duration_secs, Some(rating), Utc::now());
    match persistence.save_completed_session(user, record).await {
        Ok(session_id) => {
            tracing::info!(user = %user, %session_id, rating = rating.value(), "session saved");
            GateOutcome::Saved { session_id }
        }
        Err(e) => {
            tracing::warn!(user = %user, error = %e, "saving rated session failed");
            GateOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}

fn banner_for(outcome: &GateOutcome) -> Option<StatusBanner> {
    match outcome {
        GateOutcome::Saved { .. } => Some(StatusBanner::success("Rating saved")),
        GateOutcome::Failed { .. } => Some(StatusBanner::error("Could not save rating")),
        GateOutcome::Dismissed => None,
    }
}
