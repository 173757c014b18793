use crate::core::archetype::ArchetypeCode;
use crate::models::{
    CompanionRequest, CompanionReview, ExchangeSession, MatchFilter, Message, Phase, PhaseRecord,
    Reaction, RequestStatus, SessionStatus, TimeSlot,
};
use crate::services::store::{ExchangeStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

/// PostgreSQL-backed exchange store
///
/// Phase records and list-valued columns are stored as JSONB; everything
/// else maps to plain columns so the tables stay queryable.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(url, max_connections.unwrap_or(10), min_connections.unwrap_or(1)).await
    }
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("unexpected {} value: {}", column, value))
}

fn request_from_row(row: &PgRow) -> Result<CompanionRequest, StoreError> {
    let host_archetype: String = row.try_get("host_archetype")?;
    let time_slot: String = row.try_get("time_slot")?;
    let status: String = row.try_get("status")?;
    let min_compatibility: i16 = row.try_get("min_compatibility")?;
    let allowed: Json<BTreeSet<ArchetypeCode>> = row.try_get("allowed_archetypes")?;

    Ok(CompanionRequest {
        id: row.try_get("id")?,
        host_user_id: row.try_get("host_user_id")?,
        host_archetype: host_archetype
            .parse()
            .map_err(|_| corrupt("host_archetype", &host_archetype))?,
        exhibition_id: row.try_get("exhibition_id")?,
        artwork_id: row.try_get("artwork_id")?,
        preferred_date: row.try_get("preferred_date")?,
        time_slot: TimeSlot::parse(&time_slot).ok_or_else(|| corrupt("time_slot", &time_slot))?,
        filter: MatchFilter {
            allowed_archetypes: allowed.0,
            min_compatibility: u8::try_from(min_compatibility)
                .map_err(|_| corrupt("min_compatibility", min_compatibility))?,
        },
        status: RequestStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        matched_user_id: row.try_get("matched_user_id")?,
        session_id: row.try_get("session_id")?,
        created_at: row.try_get("created_at")?,
        expires_at: row.try_get("expires_at")?,
    })
}

fn phase_from_column(value: i16) -> Result<Phase, StoreError> {
    u8::try_from(value)
        .ok()
        .and_then(|v| Phase::try_from(v).ok())
        .ok_or_else(|| corrupt("phase", value))
}

fn session_from_row(row: &PgRow) -> Result<ExchangeSession, StoreError> {
    let status: String = row.try_get("status")?;
    let records: Json<[PhaseRecord; 4]> = row.try_get("phase_records")?;
    let message_count: i64 = row.try_get("message_count")?;
    let revision: i64 = row.try_get("revision")?;

    Ok(ExchangeSession {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        artwork_id: row.try_get("artwork_id")?,
        participant_a: row.try_get("participant_a")?,
        participant_b: row.try_get("participant_b")?,
        current_phase: phase_from_column(row.try_get("current_phase")?)?,
        status: SessionStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        phase_records: records.0,
        message_count: message_count.max(0) as u64,
        created_at: row.try_get("created_at")?,
        last_activity_at: row.try_get("last_activity_at")?,
        expires_at: row.try_get("expires_at")?,
        ended_at: row.try_get("ended_at")?,
        revision: revision.max(0) as u64,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, StoreError> {
    let sequence: i64 = row.try_get("sequence")?;
    let tags: Json<Vec<String>> = row.try_get("emotion_tags")?;
    let reaction: Option<String> = row.try_get("reaction")?;
    let reaction = match reaction {
        Some(value) => Some(Reaction::parse(&value).ok_or_else(|| corrupt("reaction", &value))?),
        None => None,
    };

    Ok(Message {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        phase: phase_from_column(row.try_get("phase")?)?,
        sequence: sequence.max(0) as u64,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        emotion_tags: tags.0,
        sent_at: row.try_get("sent_at")?,
        read_at: row.try_get("read_at")?,
        reaction,
    })
}

fn review_from_row(row: &PgRow) -> Result<CompanionReview, StoreError> {
    let rating: i16 = row.try_get("rating")?;
    let tags: Json<Vec<String>> = row.try_get("tags")?;

    Ok(CompanionReview {
        session_id: row.try_get("session_id")?,
        reviewer_id: row.try_get("reviewer_id")?,
        reviewee_id: row.try_get("reviewee_id")?,
        rating: u8::try_from(rating).map_err(|_| corrupt("rating", rating))?,
        tags: tags.0,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Guarded on the revision the caller loaded; zero rows means a lost race
const UPDATE_SESSION: &str = r#"
    UPDATE exchange_sessions
    SET current_phase = $2,
        status = $3,
        phase_records = $4,
        message_count = $5,
        last_activity_at = $6,
        expires_at = $7,
        ended_at = $8,
        revision = revision + 1
    WHERE id = $1 AND revision = $9
"#;

fn bind_session_update<'q>(session: &'q ExchangeSession) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(UPDATE_SESSION)
        .bind(session.id)
        .bind(session.current_phase.number() as i16)
        .bind(session.status.as_str())
        .bind(Json(&session.phase_records))
        .bind(session.message_count as i64)
        .bind(session.last_activity_at)
        .bind(session.expires_at)
        .bind(session.ended_at)
        .bind(session.revision as i64)
}

fn stale_session(session: &ExchangeSession) -> StoreError {
    StoreError::Conflict(format!(
        "session {} changed since revision {}",
        session.id, session.revision
    ))
}

#[async_trait]
impl ExchangeStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert_request(&self, request: &CompanionRequest) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO companion_requests (
                id, host_user_id, host_archetype, exhibition_id, artwork_id,
                preferred_date, time_slot, allowed_archetypes, min_compatibility,
                status, matched_user_id, session_id, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#;

        let result = sqlx::query(query)
            .bind(request.id)
            .bind(&request.host_user_id)
            .bind(request.host_archetype.as_str())
            .bind(&request.exhibition_id)
            .bind(&request.artwork_id)
            .bind(request.preferred_date)
            .bind(request.time_slot.as_str())
            .bind(Json(&request.filter.allowed_archetypes))
            .bind(request.filter.min_compatibility as i16)
            .bind(request.status.as_str())
            .bind(&request.matched_user_id)
            .bind(request.session_id)
            .bind(request.created_at)
            .bind(request.expires_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::Conflict(
                format!(
                    "open request exists for {} at {}",
                    request.host_user_id, request.exhibition_id
                ),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_request(&self, id: Uuid) -> Result<Option<CompanionRequest>, StoreError> {
        let row = sqlx::query("SELECT * FROM companion_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_requests(
        &self,
        exhibition_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, StoreError> {
        let query = r#"
            SELECT *
            FROM companion_requests
            WHERE exhibition_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at, id
        "#;

        let rows = sqlx::query(query)
            .bind(exhibition_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn requests_for_host(
        &self,
        host_user_id: &str,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CompanionRequest>, StoreError> {
        let query = r#"
            SELECT *
            FROM companion_requests
            WHERE host_user_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id
        "#;

        let rows = sqlx::query(query)
            .bind(host_user_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn requests_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<CompanionRequest>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM companion_requests WHERE status = 'open' AND expires_at < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn transition_request(
        &self,
        updated: &CompanionRequest,
        expected: RequestStatus,
    ) -> Result<bool, StoreError> {
        let query = r#"
            UPDATE companion_requests
            SET status = $2, matched_user_id = $3, session_id = $4
            WHERE id = $1 AND status = $5
        "#;

        let result = sqlx::query(query)
            .bind(updated.id)
            .bind(updated.status.as_str())
            .bind(&updated.matched_user_id)
            .bind(updated.session_id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_session(&self, session: &ExchangeSession) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO exchange_sessions (
                id, request_id, artwork_id, participant_a, participant_b, current_phase,
                status, phase_records, message_count, created_at, last_activity_at,
                expires_at, ended_at, revision
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#;

        sqlx::query(query)
            .bind(session.id)
            .bind(session.request_id)
            .bind(&session.artwork_id)
            .bind(&session.participant_a)
            .bind(&session.participant_b)
            .bind(session.current_phase.number() as i16)
            .bind(session.status.as_str())
            .bind(Json(&session.phase_records))
            .bind(session.message_count as i64)
            .bind(session.created_at)
            .bind(session.last_activity_at)
            .bind(session.expires_at)
            .bind(session.ended_at)
            .bind(session.revision as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_session(&self, id: Uuid) -> Result<Option<ExchangeSession>, StoreError> {
        let row = sqlx::query("SELECT * FROM exchange_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn save_session(&self, session: &ExchangeSession) -> Result<(), StoreError> {
        let result = bind_session_update(session).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(stale_session(session));
        }
        Ok(())
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<ExchangeSession>, StoreError> {
        let query = r#"
            SELECT *
            FROM exchange_sessions
            WHERE participant_a = $1 OR participant_b = $1
            ORDER BY last_activity_at DESC
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(session_from_row).collect()
    }

    async fn idle_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExchangeSession>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM exchange_sessions WHERE status = 'active' AND last_activity_at < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(session_from_row).collect()
    }

    async fn record_submission(
        &self,
        session: &ExchangeSession,
        message: &Message,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Session first, so a stale writer fails before touching messages
        let updated = bind_session_update(session).execute(&mut *tx).await?;
        if updated.rows_affected() == 0 {
            return Err(stale_session(session));
        }

        sqlx::query(
            r#"
            INSERT INTO exchange_messages (
                id, session_id, phase, sequence, sender_id, content,
                emotion_tags, sent_at, read_at, reaction
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(message.id)
        .bind(message.session_id)
        .bind(message.phase.number() as i16)
        .bind(message.sequence as i64)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(Json(&message.emotion_tags))
        .bind(message.sent_at)
        .bind(message.read_at)
        .bind(message.reaction.map(|r| r.as_str()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_message(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query("SELECT * FROM exchange_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM exchange_messages WHERE session_id = $1 ORDER BY sequence",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn set_reaction(&self, message_id: Uuid, reaction: Reaction) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE exchange_messages SET reaction = $2 WHERE id = $1 AND reaction IS NULL",
        )
        .bind(message_id)
        .bind(reaction.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_message_read(&self, message_id: Uuid, read_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE exchange_messages SET read_at = $2 WHERE id = $1 AND read_at IS NULL",
        )
        .bind(message_id)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_review(&self, review: &CompanionReview) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO companion_reviews (
                session_id, reviewer_id, reviewee_id, rating, tags, note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        let result = sqlx::query(query)
            .bind(review.session_id)
            .bind(&review.reviewer_id)
            .bind(&review.reviewee_id)
            .bind(review.rating as i16)
            .bind(Json(&review.tags))
            .bind(&review.note)
            .bind(review.created_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::Conflict(
                format!("{} already reviewed session {}", review.reviewer_id, review.session_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn reviews_for_session(&self, session_id: Uuid) -> Result<Vec<CompanionReview>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM companion_reviews WHERE session_id = $1 ORDER BY created_at",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(review_from_row).collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_round_trip_request() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let store = PgStore::new(&url, 2, 1).await.expect("Failed to connect");
        store.health_check().await.unwrap();
        assert_eq!(store.backend(), "postgres");
    }

    #[test]
    fn test_phase_column_bounds() {
        assert_eq!(phase_from_column(3).unwrap(), Phase::Perspective);
        assert!(phase_from_column(0).is_err());
        assert!(phase_from_column(-1).is_err());
    }
}
