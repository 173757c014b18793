use crate::core::clock::Clock;
use crate::core::disclosure::{anonymous_counterpart, redact_counterpart};
use crate::core::exchange::{self as machine, ExchangeRules, SubmissionOutcome};
use crate::core::{reactions, review};
use crate::error::ExchangeError;
use crate::models::{
    CompanionReview, ExchangeSession, ExchangeStats, Message, MessageView, NotificationEvent, Phase,
    Reaction, SessionStatus, SessionView,
};
use crate::services::directory::{ArtworkCatalog, ProfileDirectory};
use crate::services::notifier::{dispatch, Notifier};
use crate::services::store::{ExchangeStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

type LockTable = Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>;

/// Exclusive access to one session; the table entry is dropped with the
/// last holder
struct SessionLock<'a> {
    table: &'a LockTable,
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if table.get(&self.id).map_or(false, |lock| Arc::strong_count(lock) == 1) {
            table.remove(&self.id);
        }
    }
}

/// Result of an accepted submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub message: Message,
    pub outcome: SubmissionOutcome,
    pub session: ExchangeSession,
}

/// Owns the exchange session lifecycle
///
/// Every mutation of a session, including its messages, runs under that
/// session's lock. Sessions never share a lock, so they proceed in
/// parallel. A mutation is applied to a copy, persisted, and only then
/// returned or announced.
///
/// The lock only covers this process. Writes from other instances sharing
/// the store are caught by the store's revision check and surface as
/// `ConcurrentUpdate`.
pub struct ExchangeService {
    store: Arc<dyn ExchangeStore>,
    profiles: Arc<dyn ProfileDirectory>,
    artworks: Arc<dyn ArtworkCatalog>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    rules: ExchangeRules,
    locks: LockTable,
}

impl ExchangeService {
    pub fn new(
        store: Arc<dyn ExchangeStore>,
        profiles: Arc<dyn ProfileDirectory>,
        artworks: Arc<dyn ArtworkCatalog>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        rules: ExchangeRules,
    ) -> Self {
        Self {
            store,
            profiles,
            artworks,
            notifier,
            clock,
            rules,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock(&self, id: Uuid) -> SessionLock<'_> {
        let lock = {
            let mut table = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(table.entry(id).or_default())
        };
        let guard = lock.lock_owned().await;
        SessionLock {
            table: &self.locks,
            id,
            guard: Some(guard),
        }
    }

    /// Load a session, persisting a lazy expiry if one is due.
    /// Callers must hold the session lock.
    async fn load_fresh(&self, id: Uuid) -> Result<ExchangeSession, ExchangeError> {
        let mut session = self
            .store
            .load_session(id)
            .await?
            .ok_or(ExchangeError::SessionNotFound(id))?;

        let mut expired = session.clone();
        if machine::expire_if_idle(&mut expired, self.clock.now(), &self.rules) {
            match self.save(&mut expired).await {
                Ok(()) => {
                    info!("Session {} expired after inactivity", id);
                    session = expired;
                }
                // Another instance wrote first; report what it wrote
                Err(ExchangeError::ConcurrentUpdate(_)) => {
                    session = self
                        .store
                        .load_session(id)
                        .await?
                        .ok_or(ExchangeError::SessionNotFound(id))?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(session)
    }

    /// Persist a mutated session and adopt the revision the store assigned
    async fn save(&self, session: &mut ExchangeSession) -> Result<(), ExchangeError> {
        self.store
            .save_session(session)
            .await
            .map_err(|e| stale_write(e, session.id))?;
        session.revision += 1;
        Ok(())
    }

    pub async fn submit_message(
        &self,
        session_id: Uuid,
        sender_id: &str,
        content: &str,
        emotion_tags: &[String],
    ) -> Result<Submission, ExchangeError> {
        let _lock = self.lock(session_id).await;
        let mut session = self.load_fresh(session_id).await?;

        let (message, outcome) = machine::submit_message(
            &mut session,
            sender_id,
            content,
            emotion_tags,
            self.clock.now(),
            &self.rules,
        )?;
        self.store
            .record_submission(&session, &message)
            .await
            .map_err(|e| stale_write(e, session_id))?;
        session.revision += 1;

        debug!(
            "Message {} accepted in session {} phase {} (authoritative: {})",
            message.sequence, session_id, message.phase, outcome.authoritative
        );

        if let Some(counterpart) = session.counterpart_of(sender_id) {
            dispatch(
                &self.notifier,
                counterpart,
                NotificationEvent::MessageReceived {
                    session_id,
                    phase: message.phase,
                },
            );
        }
        if outcome.completed {
            self.announce_completion(&session);
        }

        Ok(Submission {
            message,
            outcome,
            session,
        })
    }

    pub async fn advance_phase(
        &self,
        session_id: Uuid,
        requester_id: &str,
    ) -> Result<ExchangeSession, ExchangeError> {
        let _lock = self.lock(session_id).await;
        let mut session = self.load_fresh(session_id).await?;

        let phase = machine::advance_phase(&mut session, requester_id, self.clock.now(), &self.rules)?;
        self.save(&mut session).await?;

        info!("Session {} advanced to phase {} by {}", session_id, phase, requester_id);
        let event = NotificationEvent::PhaseAdvanced { session_id, phase };
        dispatch(&self.notifier, &session.participant_a, event.clone());
        dispatch(&self.notifier, &session.participant_b, event);

        Ok(session)
    }

    pub async fn skip_final_phase(
        &self,
        session_id: Uuid,
        participant_id: &str,
    ) -> Result<ExchangeSession, ExchangeError> {
        let _lock = self.lock(session_id).await;
        let mut session = self.load_fresh(session_id).await?;

        let completed =
            machine::skip_final_phase(&mut session, participant_id, self.clock.now(), &self.rules)?;
        self.save(&mut session).await?;

        debug!("{} skipped the final phase of session {}", participant_id, session_id);
        if completed {
            self.announce_completion(&session);
        }
        Ok(session)
    }

    pub async fn abandon_session(
        &self,
        session_id: Uuid,
        participant_id: &str,
    ) -> Result<ExchangeSession, ExchangeError> {
        let _lock = self.lock(session_id).await;
        let mut session = self.load_fresh(session_id).await?;

        machine::abandon_session(&mut session, participant_id, self.clock.now())?;
        self.save(&mut session).await?;

        info!("Session {} abandoned by {}", session_id, participant_id);
        if let Some(counterpart) = session.counterpart_of(participant_id) {
            dispatch(
                &self.notifier,
                counterpart,
                NotificationEvent::SessionAbandoned { session_id },
            );
        }
        Ok(session)
    }

    fn announce_completion(&self, session: &ExchangeSession) {
        info!("Session {} completed", session.id);
        let event = NotificationEvent::SessionCompleted {
            session_id: session.id,
        };
        dispatch(&self.notifier, &session.participant_a, event.clone());
        dispatch(&self.notifier, &session.participant_b, event);
    }

    /// Phase-filtered, identity-redacted projection for one participant
    pub async fn get_session_view(
        &self,
        session_id: Uuid,
        viewer_id: &str,
    ) -> Result<SessionView, ExchangeError> {
        let session = {
            let _lock = self.lock(session_id).await;
            self.load_fresh(session_id).await?
        };
        self.build_view(&session, viewer_id).await
    }

    async fn build_view(
        &self,
        session: &ExchangeSession,
        viewer_id: &str,
    ) -> Result<SessionView, ExchangeError> {
        let counterpart_id = session
            .counterpart_of(viewer_id)
            .ok_or(ExchangeError::NotAParticipant)?;
        let progress =
            machine::phase_progress(session, viewer_id).ok_or(ExchangeError::NotAParticipant)?;

        // Nothing about the counterpart is visible in phase 1, so skip the lookup
        let counterpart = if session.current_phase > Phase::Impression {
            let profile = self
                .profiles
                .get_profile(counterpart_id)
                .await
                .map_err(|e| e.into_profile_error(counterpart_id))?;
            redact_counterpart(&profile, session.current_phase)
        } else {
            anonymous_counterpart()
        };

        let artwork = match self.artworks.get_artwork_summary(&session.artwork_id).await {
            Ok(artwork) => Some(artwork),
            Err(e) => {
                warn!("Artwork {} unavailable for view: {}", session.artwork_id, e);
                None
            }
        };

        let messages = self.store.list_messages(session.id).await?;
        let unread_count = messages
            .iter()
            .filter(|m| m.sender_id != viewer_id && m.read_at.is_none())
            .count();

        Ok(SessionView {
            session_id: session.id,
            artwork,
            status: session.status,
            current_phase: session.current_phase,
            expires_at: session.expires_at,
            counterpart,
            progress,
            messages: messages
                .iter()
                .map(|m| MessageView::from_message(m, viewer_id))
                .collect(),
            unread_count,
        })
    }

    /// Load a message and its session under the session lock
    async fn message_in_session(
        &self,
        message_id: Uuid,
    ) -> Result<(SessionLock<'_>, ExchangeSession, Message), ExchangeError> {
        let session_id = self
            .store
            .load_message(message_id)
            .await?
            .ok_or(ExchangeError::MessageNotFound(message_id))?
            .session_id;

        let lock = self.lock(session_id).await;
        let session = self.load_fresh(session_id).await?;
        let message = self
            .store
            .load_message(message_id)
            .await?
            .ok_or(ExchangeError::MessageNotFound(message_id))?;

        Ok((lock, session, message))
    }

    pub async fn react(
        &self,
        message_id: Uuid,
        reactor_id: &str,
        reaction: Reaction,
    ) -> Result<Message, ExchangeError> {
        let (_lock, session, mut message) = self.message_in_session(message_id).await?;

        reactions::react(&session, &mut message, reactor_id, reaction)?;
        if !self.store.set_reaction(message_id, reaction).await? {
            return Err(ExchangeError::AlreadyReacted);
        }

        debug!("{} reacted {} to message {}", reactor_id, reaction.as_str(), message_id);
        Ok(message)
    }

    /// Returns whether this call recorded the read
    pub async fn mark_read(&self, message_id: Uuid, reader_id: &str) -> Result<bool, ExchangeError> {
        let (_lock, session, mut message) = self.message_in_session(message_id).await?;

        let now = self.clock.now();
        let updated = reactions::mark_read(&session, &mut message, reader_id, now)?
            && self.store.mark_message_read(message_id, now).await?;
        Ok(updated)
    }

    /// Rate the counterpart once the session is completed
    pub async fn review_companion(
        &self,
        session_id: Uuid,
        reviewer_id: &str,
        rating: u8,
        tags: &[String],
        note: Option<&str>,
    ) -> Result<CompanionReview, ExchangeError> {
        let session = {
            let _lock = self.lock(session_id).await;
            self.load_fresh(session_id).await?
        };

        let review = review::build_review(&session, reviewer_id, rating, tags, note, self.clock.now())?;
        match self.store.insert_review(&review).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(ExchangeError::AlreadyReviewed),
            Err(e) => return Err(e.into()),
        }

        info!(
            "{} rated {} {}/5 for session {}",
            review.reviewer_id, review.reviewee_id, review.rating, session_id
        );
        Ok(review)
    }

    /// Reviews left on a session; visible to its participants only
    pub async fn list_reviews(
        &self,
        session_id: Uuid,
        viewer_id: &str,
    ) -> Result<Vec<CompanionReview>, ExchangeError> {
        let session = self
            .store
            .load_session(session_id)
            .await?
            .ok_or(ExchangeError::SessionNotFound(session_id))?;
        if !session.is_participant(viewer_id) {
            return Err(ExchangeError::NotAParticipant);
        }
        Ok(self.store.reviews_for_session(session_id).await?)
    }

    async fn fresh_sessions_for(&self, user_id: &str) -> Result<Vec<ExchangeSession>, ExchangeError> {
        let stored = self.store.sessions_for_user(user_id).await?;
        let mut sessions = Vec::with_capacity(stored.len());
        for session in stored {
            if session.status == SessionStatus::Active {
                let _lock = self.lock(session.id).await;
                sessions.push(self.load_fresh(session.id).await?);
            } else {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Views of every session the user takes part in, most recent first
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionView>, ExchangeError> {
        let sessions = self.fresh_sessions_for(user_id).await?;
        let mut views = Vec::with_capacity(sessions.len());
        for session in &sessions {
            views.push(self.build_view(session, user_id).await?);
        }
        Ok(views)
    }

    pub async fn stats(&self, user_id: &str) -> Result<ExchangeStats, ExchangeError> {
        let sessions = self.fresh_sessions_for(user_id).await?;
        Ok(tally(&sessions))
    }

    /// Expire idle sessions proactively; returns how many flipped
    pub async fn expire_idle_sessions(&self) -> Result<usize, ExchangeError> {
        let cutoff = self.clock.now() - self.rules.idle_timeout;
        let idle = self.store.idle_sessions(cutoff).await?;

        let mut expired = 0;
        for session in idle {
            let _lock = self.lock(session.id).await;
            if self.load_fresh(session.id).await?.status == SessionStatus::Expired {
                expired += 1;
            }
        }
        Ok(expired)
    }
}

fn stale_write(err: StoreError, session_id: Uuid) -> ExchangeError {
    match err {
        StoreError::Conflict(_) => ExchangeError::ConcurrentUpdate(session_id),
        other => other.into(),
    }
}

/// Count sessions by status
pub fn tally(sessions: &[ExchangeSession]) -> ExchangeStats {
    let mut stats = ExchangeStats {
        total: sessions.len(),
        ..ExchangeStats::default()
    };
    for session in sessions {
        match session.status {
            SessionStatus::Active => stats.active += 1,
            SessionStatus::Completed => stats.completed += 1,
            SessionStatus::Abandoned => stats.abandoned += 1,
            SessionStatus::Expired => stats.expired += 1,
        }
    }
    stats
}
