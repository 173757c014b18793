use crate::error::ExchangeError;
use crate::models::{
    CompanionRequest, CompanionReview, ExchangeSession, Message, Reaction, RequestStatus, SessionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for ExchangeError {
    fn from(err: StoreError) -> Self {
        ExchangeError::StorageUnavailable(err.to_string())
    }
}

/// Repository for requests, sessions and messages
///
/// Every method is a single atomic operation. Requests move by
/// compare-and-set on their status, sessions by compare-and-set on their
/// revision, and message fields are written only while still unset, so
/// several service instances can share one store.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Insert a new request; fails with `Conflict` when the host already
    /// has an open request for the same exhibition
    async fn insert_request(&self, request: &CompanionRequest) -> Result<(), StoreError>;

    async fn load_request(&self, id: Uuid) -> Result<Option<CompanionRequest>, StoreError>;

    async fn list_requests(
        &self,
        exhibition_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, StoreError>;

    /// Requests a host has opened, newest first
    async fn requests_for_host(
        &self,
        host_user_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, StoreError>;

    /// Open requests whose deadline is before `now`
    async fn requests_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<CompanionRequest>, StoreError>;

    /// Replace the stored request with `updated` only if its current status
    /// is `expected`. Returns whether the write happened.
    async fn transition_request(
        &self,
        updated: &CompanionRequest,
        expected: RequestStatus,
    ) -> Result<bool, StoreError>;

    async fn insert_session(&self, session: &ExchangeSession) -> Result<(), StoreError>;

    async fn load_session(&self, id: Uuid) -> Result<Option<ExchangeSession>, StoreError>;

    /// Write a session loaded at `session.revision`, bumping the stored
    /// revision; fails with `Conflict` when someone else wrote first
    async fn save_session(&self, session: &ExchangeSession) -> Result<(), StoreError>;

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<ExchangeSession>, StoreError>;

    /// Active sessions whose last activity is before `cutoff`
    async fn idle_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExchangeSession>, StoreError>;

    /// Persist a session together with a newly accepted message, with the
    /// same revision check as `save_session`
    async fn record_submission(
        &self,
        session: &ExchangeSession,
        message: &Message,
    ) -> Result<(), StoreError>;

    async fn load_message(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Messages of a session in acceptance order
    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>, StoreError>;

    /// Set the reaction unless one is present. Returns whether it was set.
    async fn set_reaction(&self, message_id: Uuid, reaction: Reaction) -> Result<bool, StoreError>;

    /// Set `read_at` unless already read. Returns whether it was set.
    async fn mark_message_read(&self, message_id: Uuid, read_at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Fails with `Conflict` when the reviewer already reviewed the session
    async fn insert_review(&self, review: &CompanionReview) -> Result<(), StoreError>;

    async fn reviews_for_session(&self, session_id: Uuid) -> Result<Vec<CompanionReview>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryTables {
    requests: HashMap<Uuid, CompanionRequest>,
    sessions: HashMap<Uuid, ExchangeSession>,
    messages: HashMap<Uuid, Message>,
    reviews: Vec<CompanionReview>,
}

impl MemoryTables {
    /// Store `session` if the stored copy is still at its revision
    fn write_session(&mut self, session: &ExchangeSession) -> Result<(), StoreError> {
        match self.sessions.get_mut(&session.id) {
            Some(current) if current.revision == session.revision => {
                *current = session.clone();
                current.revision += 1;
                Ok(())
            }
            Some(current) => Err(StoreError::Conflict(format!(
                "session {} is at revision {}, write was based on {}",
                session.id, current.revision, session.revision
            ))),
            None => Err(StoreError::Corrupt(format!("session {} does not exist", session.id))),
        }
    }
}

/// In-process store, used when no database is configured and in tests
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExchangeStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_request(&self, request: &CompanionRequest) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.requests.values().any(|existing| {
            existing.status == RequestStatus::Open
                && existing.host_user_id == request.host_user_id
                && existing.exhibition_id == request.exhibition_id
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "open request exists for {} at {}",
                request.host_user_id, request.exhibition_id
            )));
        }
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn load_request(&self, id: Uuid) -> Result<Option<CompanionRequest>, StoreError> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        exhibition_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, StoreError> {
        let tables = self.tables.read().await;
        let mut requests: Vec<CompanionRequest> = tables
            .requests
            .values()
            .filter(|r| r.exhibition_id == exhibition_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(requests)
    }

    async fn requests_for_host(
        &self,
        host_user_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, StoreError> {
        let tables = self.tables.read().await;
        let mut requests: Vec<CompanionRequest> = tables
            .requests
            .values()
            .filter(|r| r.host_user_id == host_user_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(requests)
    }

    async fn requests_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<CompanionRequest>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .values()
            .filter(|r| r.is_past_deadline(now))
            .cloned()
            .collect())
    }

    async fn transition_request(
        &self,
        updated: &CompanionRequest,
        expected: RequestStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.requests.get_mut(&updated.id) {
            Some(current) if current.status == expected => {
                *current = updated.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_session(&self, session: &ExchangeSession) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn load_session(&self, id: Uuid) -> Result<Option<ExchangeSession>, StoreError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn save_session(&self, session: &ExchangeSession) -> Result<(), StoreError> {
        self.tables.write().await.write_session(session)
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<ExchangeSession>, StoreError> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<ExchangeSession> = tables
            .sessions
            .values()
            .filter(|s| s.is_participant(user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(sessions)
    }

    async fn idle_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExchangeSession>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Active && s.last_activity_at < cutoff)
            .cloned()
            .collect())
    }

    async fn record_submission(
        &self,
        session: &ExchangeSession,
        message: &Message,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.write_session(session)?;
        tables.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn load_message(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        Ok(self.tables.read().await.messages.get(&id).cloned())
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sequence);
        Ok(messages)
    }

    async fn set_reaction(&self, message_id: Uuid, reaction: Reaction) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.messages.get_mut(&message_id) {
            Some(message) if message.reaction.is_none() => {
                message.reaction = Some(reaction);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_message_read(&self, message_id: Uuid, read_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.messages.get_mut(&message_id) {
            Some(message) if message.read_at.is_none() => {
                message.read_at = Some(read_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_review(&self, review: &CompanionReview) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let duplicate = tables
            .reviews
            .iter()
            .any(|r| r.session_id == review.session_id && r.reviewer_id == review.reviewer_id);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "{} already reviewed session {}",
                review.reviewer_id, review.session_id
            )));
        }
        tables.reviews.push(review.clone());
        Ok(())
    }

    async fn reviews_for_session(&self, session_id: Uuid) -> Result<Vec<CompanionReview>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archetype::ArchetypeCode;
    use crate::models::{MatchFilter, TimeSlot};
    use chrono::{Duration, NaiveDate};
    use std::collections::BTreeSet;

    fn request(host: &str, exhibition: &str) -> CompanionRequest {
        let now = Utc::now();
        CompanionRequest {
            id: Uuid::new_v4(),
            host_user_id: host.to_string(),
            host_archetype: ArchetypeCode::Laef,
            exhibition_id: exhibition.to_string(),
            artwork_id: "art_1".to_string(),
            preferred_date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            time_slot: TimeSlot::Morning,
            filter: MatchFilter {
                allowed_archetypes: BTreeSet::new(),
                min_compatibility: 50,
            },
            status: RequestStatus::Open,
            matched_user_id: None,
            session_id: None,
            created_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_duplicate_open_request_conflicts() {
        let store = MemoryStore::new();
        store.insert_request(&request("host", "ex1")).await.unwrap();

        let err = store.insert_request(&request("host", "ex1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Other exhibitions are fine
        store.insert_request(&request("host", "ex2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = MemoryStore::new();
        let original = request("host", "ex1");
        store.insert_request(&original).await.unwrap();

        let mut matched = original.clone();
        matched.status = RequestStatus::Matched;
        assert!(store.transition_request(&matched, RequestStatus::Open).await.unwrap());
        assert!(!store.transition_request(&matched, RequestStatus::Open).await.unwrap());

        let stored = store.load_request(original.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Matched);
    }

    fn session() -> ExchangeSession {
        crate::core::exchange::open_session(
            None,
            "art_1",
            "host",
            "owl",
            Utc::now(),
            &crate::core::exchange::ExchangeRules::default(),
        )
    }

    fn message(session_id: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            session_id,
            phase: crate::models::Phase::Impression,
            sequence: 1,
            sender_id: "host".to_string(),
            content: "hello".to_string(),
            emotion_tags: vec![],
            sent_at: Utc::now(),
            read_at: None,
            reaction: None,
        }
    }

    #[tokio::test]
    async fn test_stale_session_write_conflicts() {
        let store = MemoryStore::new();
        let original = session();
        store.insert_session(&original).await.unwrap();

        // Two writers loaded revision 0; only the first lands
        let mut first = original.clone();
        first.status = SessionStatus::Abandoned;
        store.save_session(&first).await.unwrap();

        let mut second = original.clone();
        second.current_phase = crate::models::Phase::Interpretation;
        let err = store.save_session(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err = store.record_submission(&second, &message(original.id)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.list_messages(original.id).await.unwrap().is_empty());

        let stored = store.load_session(original.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Abandoned);
        assert_eq!(stored.current_phase, crate::models::Phase::Impression);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_message_fields_written_once() {
        let store = MemoryStore::new();
        let session = session();
        store.insert_session(&session).await.unwrap();
        let message = message(session.id);
        store.record_submission(&session, &message).await.unwrap();

        assert!(store.set_reaction(message.id, Reaction::Resonate).await.unwrap());
        assert!(!store.set_reaction(message.id, Reaction::Inspiring).await.unwrap());

        let first = Utc::now();
        assert!(store.mark_message_read(message.id, first).await.unwrap());
        assert!(!store.mark_message_read(message.id, first + Duration::minutes(1)).await.unwrap());

        let stored = store.load_message(message.id).await.unwrap().unwrap();
        assert_eq!(stored.reaction, Some(Reaction::Resonate));
        assert_eq!(stored.read_at, Some(first));
    }

    #[tokio::test]
    async fn test_requests_for_host_newest_first() {
        let store = MemoryStore::new();
        let older = request("host", "ex1");
        let mut newer = request("host", "ex2");
        newer.created_at = older.created_at + Duration::minutes(5);
        newer.status = RequestStatus::Cancelled;
        store.insert_request(&older).await.unwrap();
        store.insert_request(&newer).await.unwrap();
        store.insert_request(&request("other", "ex1")).await.unwrap();

        let all = store.requests_for_host("host", None).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

        let open = store.requests_for_host("host", Some(RequestStatus::Open)).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, older.id);
    }

    #[tokio::test]
    async fn test_list_requests_filters_status() {
        let store = MemoryStore::new();
        let open = request("a", "ex1");
        let mut cancelled = request("b", "ex1");
        cancelled.status = RequestStatus::Cancelled;
        store.insert_request(&open).await.unwrap();
        store.insert_request(&cancelled).await.unwrap();

        let listed = store.list_requests("ex1", Some(RequestStatus::Open)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, open.id);
        assert_eq!(store.list_requests("ex1", None).await.unwrap().len(), 2);
    }
}
