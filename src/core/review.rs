//! Post-visit companion reviews.

use crate::core::exchange::normalize_tags;
use crate::error::ExchangeError;
use crate::models::{CompanionReview, ExchangeSession, SessionStatus};
use chrono::{DateTime, Utc};

pub const MAX_REVIEW_TAGS: usize = 8;
pub const MAX_NOTE_CHARS: usize = 1000;

/// Build a review of the counterpart of a completed session
///
/// Tags are trimmed, lowercased and deduplicated; a blank note is dropped.
pub fn build_review(
    session: &ExchangeSession,
    reviewer_id: &str,
    rating: u8,
    tags: &[String],
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CompanionReview, ExchangeError> {
    let reviewee_id = session
        .counterpart_of(reviewer_id)
        .ok_or(ExchangeError::NotAParticipant)?;
    if session.status != SessionStatus::Completed {
        return Err(ExchangeError::SessionNotCompleted(session.status));
    }
    if !(1..=5).contains(&rating) {
        return Err(ExchangeError::InvalidRating(rating));
    }

    let tags = normalize_tags(tags);
    if tags.len() > MAX_REVIEW_TAGS {
        return Err(ExchangeError::InvalidInput(format!(
            "at most {} review tags allowed",
            MAX_REVIEW_TAGS
        )));
    }

    let note = note.map(str::trim).filter(|n| !n.is_empty());
    if note.map_or(false, |n| n.chars().count() > MAX_NOTE_CHARS) {
        return Err(ExchangeError::InvalidInput(format!(
            "review note exceeds {} characters",
            MAX_NOTE_CHARS
        )));
    }

    Ok(CompanionReview {
        session_id: session.id,
        reviewer_id: reviewer_id.to_string(),
        reviewee_id: reviewee_id.to_string(),
        rating,
        tags,
        note: note.map(str::to_string),
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::{open_session, ExchangeRules};

    fn completed() -> ExchangeSession {
        let mut session = open_session(None, "art_1", "alice", "bob", Utc::now(), &ExchangeRules::default());
        session.status = SessionStatus::Completed;
        session
    }

    #[test]
    fn test_review_targets_counterpart() {
        let session = completed();
        let tags = vec![" Punctual ".to_string(), "punctual".to_string(), "curious".to_string()];
        let review = build_review(&session, "bob", 5, &tags, Some("  Lovely afternoon.  "), Utc::now()).unwrap();

        assert_eq!(review.reviewee_id, "alice");
        assert_eq!(review.tags, vec!["punctual", "curious"]);
        assert_eq!(review.note.as_deref(), Some("Lovely afternoon."));
    }

    #[test]
    fn test_blank_note_dropped() {
        let review = build_review(&completed(), "alice", 3, &[], Some("   "), Utc::now()).unwrap();
        assert!(review.note.is_none());
    }

    #[test]
    fn test_rating_bounds() {
        let session = completed();
        for rating in [0, 6] {
            assert!(matches!(
                build_review(&session, "alice", rating, &[], None, Utc::now()),
                Err(ExchangeError::InvalidRating(r)) if r == rating
            ));
        }
    }

    #[test]
    fn test_only_completed_sessions() {
        let mut session = completed();
        session.status = SessionStatus::Active;
        assert!(matches!(
            build_review(&session, "alice", 4, &[], None, Utc::now()),
            Err(ExchangeError::SessionNotCompleted(SessionStatus::Active))
        ));
    }

    #[test]
    fn test_outsider_cannot_review() {
        assert!(matches!(
            build_review(&completed(), "mallory", 4, &[], None, Utc::now()),
            Err(ExchangeError::NotAParticipant)
        ));
    }
}
