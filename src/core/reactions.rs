//! Per-message read receipts and reactions.

use crate::error::ExchangeError;
use crate::models::{ExchangeSession, Message, Reaction};
use chrono::{DateTime, Utc};

/// Attach a reaction; at most one per message, never by its sender
pub fn react(
    session: &ExchangeSession,
    message: &mut Message,
    reactor_id: &str,
    reaction: Reaction,
) -> Result<(), ExchangeError> {
    if !session.is_participant(reactor_id) {
        return Err(ExchangeError::NotAParticipant);
    }
    if message.sender_id == reactor_id {
        return Err(ExchangeError::SelfReaction);
    }
    if message.reaction.is_some() {
        return Err(ExchangeError::AlreadyReacted);
    }

    message.reaction = Some(reaction);
    Ok(())
}

/// Record the first read by the recipient
///
/// Returns true only when `read_at` was set by this call. Reads by the
/// sender and repeated reads are no-ops.
pub fn mark_read(
    session: &ExchangeSession,
    message: &mut Message,
    reader_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, ExchangeError> {
    if !session.is_participant(reader_id) {
        return Err(ExchangeError::NotAParticipant);
    }
    if message.sender_id == reader_id || message.read_at.is_some() {
        return Ok(false);
    }

    message.read_at = Some(now);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exchange::{open_session, ExchangeRules};
    use crate::models::Phase;
    use chrono::Duration;
    use uuid::Uuid;

    fn fixture() -> (ExchangeSession, Message) {
        let now = Utc::now();
        let session = open_session(None, "art_1", "alice", "bob", now, &ExchangeRules::default());
        let message = Message {
            id: Uuid::new_v4(),
            session_id: session.id,
            phase: Phase::Impression,
            sequence: 1,
            sender_id: "alice".to_string(),
            content: "hello".to_string(),
            emotion_tags: vec![],
            sent_at: now,
            read_at: None,
            reaction: None,
        };
        (session, message)
    }

    #[test]
    fn test_react_once() {
        let (session, mut message) = fixture();
        react(&session, &mut message, "bob", Reaction::Resonate).unwrap();
        assert_eq!(message.reaction, Some(Reaction::Resonate));

        let err = react(&session, &mut message, "bob", Reaction::Inspiring).unwrap_err();
        assert!(matches!(err, ExchangeError::AlreadyReacted));
        assert_eq!(message.reaction, Some(Reaction::Resonate));
    }

    #[test]
    fn test_self_reaction_rejected() {
        let (session, mut message) = fixture();
        let err = react(&session, &mut message, "alice", Reaction::Thoughtful).unwrap_err();
        assert!(matches!(err, ExchangeError::SelfReaction));
        assert!(message.reaction.is_none());
    }

    #[test]
    fn test_outsider_cannot_react_or_read() {
        let (session, mut message) = fixture();
        assert!(matches!(
            react(&session, &mut message, "mallory", Reaction::Resonate),
            Err(ExchangeError::NotAParticipant)
        ));
        assert!(matches!(
            mark_read(&session, &mut message, "mallory", Utc::now()),
            Err(ExchangeError::NotAParticipant)
        ));
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let (session, mut message) = fixture();
        let first = Utc::now();

        assert!(mark_read(&session, &mut message, "bob", first).unwrap());
        assert!(!mark_read(&session, &mut message, "bob", first + Duration::minutes(5)).unwrap());
        assert_eq!(message.read_at, Some(first));
    }

    #[test]
    fn test_sender_read_is_ignored() {
        let (session, mut message) = fixture();
        assert!(!mark_read(&session, &mut message, "alice", Utc::now()).unwrap());
        assert!(message.read_at.is_none());
    }
}
