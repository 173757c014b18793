//! Exchange session state machine.
//!
//! Every transition validates first and mutates second, so an `Err` always
//! leaves the session untouched. Callers persist the mutated copy and only
//! then make it visible.

use crate::error::ExchangeError;
use crate::models::{
    ExchangeSession, Message, Phase, PhaseEntry, PhaseProgress, PhaseRecord, Seat, SessionStatus,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Tunable limits for exchange sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRules {
    /// Minimum trimmed length for phases 1 and 2
    pub min_message_chars: usize,
    pub max_message_chars: usize,
    pub idle_timeout: Duration,
}

impl Default for ExchangeRules {
    fn default() -> Self {
        Self {
            min_message_chars: 50,
            max_message_chars: 2000,
            idle_timeout: Duration::hours(24),
        }
    }
}

/// Outcome of an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// The message became the sender's authoritative entry for the phase
    pub authoritative: bool,
    /// The submission completed the session
    pub completed: bool,
}

/// Create a session in phase 1
pub fn open_session(
    request_id: Option<Uuid>,
    artwork_id: &str,
    participant_a: &str,
    participant_b: &str,
    now: DateTime<Utc>,
    rules: &ExchangeRules,
) -> ExchangeSession {
    ExchangeSession {
        id: Uuid::new_v4(),
        request_id,
        artwork_id: artwork_id.to_string(),
        participant_a: participant_a.to_string(),
        participant_b: participant_b.to_string(),
        current_phase: Phase::Impression,
        status: SessionStatus::Active,
        phase_records: [PhaseRecord::default(); 4],
        message_count: 0,
        created_at: now,
        last_activity_at: now,
        expires_at: now + rules.idle_timeout,
        ended_at: None,
        revision: 0,
    }
}

/// Lazily expire an idle session; returns true when the status changed
pub fn expire_if_idle(session: &mut ExchangeSession, now: DateTime<Utc>, rules: &ExchangeRules) -> bool {
    if session.status != SessionStatus::Active {
        return false;
    }
    if now <= session.last_activity_at + rules.idle_timeout {
        return false;
    }

    session.status = SessionStatus::Expired;
    session.ended_at = Some(session.last_activity_at + rules.idle_timeout);
    true
}

/// Validate message content for a phase
pub fn validate_content(phase: Phase, content: &str, rules: &ExchangeRules) -> Result<(), ExchangeError> {
    let length = content.trim().chars().count();

    if length > rules.max_message_chars {
        return Err(ExchangeError::MessageTooLong {
            max: rules.max_message_chars,
        });
    }

    match phase {
        Phase::Impression | Phase::Interpretation if length < rules.min_message_chars => {
            Err(ExchangeError::MessageTooShort {
                min: rules.min_message_chars,
                actual: length,
            })
        }
        _ if length == 0 => Err(ExchangeError::EmptyMessage),
        _ => Ok(()),
    }
}

/// Whether both participants have contributed to the current phase
pub fn can_advance(session: &ExchangeSession) -> bool {
    session.status == SessionStatus::Active
        && session.current_phase != Phase::FINAL
        && session.record(session.current_phase).is_complete()
}

fn seat_for(session: &ExchangeSession, user_id: &str) -> Result<Seat, ExchangeError> {
    session.seat_of(user_id).ok_or(ExchangeError::NotAParticipant)
}

fn ensure_active(session: &ExchangeSession) -> Result<(), ExchangeError> {
    if session.status != SessionStatus::Active {
        return Err(ExchangeError::SessionNotActive(session.status));
    }
    Ok(())
}

fn touch(session: &mut ExchangeSession, now: DateTime<Utc>, rules: &ExchangeRules) {
    session.last_activity_at = now;
    session.expires_at = now + rules.idle_timeout;
}

fn set_entry_if_empty(session: &mut ExchangeSession, seat: Seat, entry: PhaseEntry) -> bool {
    let phase = session.current_phase;
    let record = session.record_mut(phase);
    let slot = match seat {
        Seat::A => &mut record.participant_a,
        Seat::B => &mut record.participant_b,
    };
    if slot.is_some() {
        return false;
    }
    *slot = Some(entry);
    true
}

fn complete_if_finished(session: &mut ExchangeSession, now: DateTime<Utc>) -> bool {
    if session.current_phase == Phase::FINAL && session.record(Phase::FINAL).is_complete() {
        session.status = SessionStatus::Completed;
        session.ended_at = Some(now);
        return true;
    }
    false
}

/// Accept a message into the current phase
///
/// The first accepted message per participant per phase is authoritative;
/// later ones only extend the transcript.
pub fn submit_message(
    session: &mut ExchangeSession,
    sender_id: &str,
    content: &str,
    emotion_tags: &[String],
    now: DateTime<Utc>,
    rules: &ExchangeRules,
) -> Result<(Message, SubmissionOutcome), ExchangeError> {
    let seat = seat_for(session, sender_id)?;
    ensure_active(session)?;
    let phase = session.current_phase;
    validate_content(phase, content, rules)?;

    let message = Message {
        id: Uuid::new_v4(),
        session_id: session.id,
        phase,
        sequence: session.message_count + 1,
        sender_id: sender_id.to_string(),
        content: content.trim().to_string(),
        emotion_tags: normalize_tags(emotion_tags),
        sent_at: now,
        read_at: None,
        reaction: None,
    };

    session.message_count = message.sequence;
    let authoritative = set_entry_if_empty(
        session,
        seat,
        PhaseEntry::Submitted {
            message_id: message.id,
        },
    );
    touch(session, now, rules);
    let completed = complete_if_finished(session, now);

    Ok((
        message,
        SubmissionOutcome {
            authoritative,
            completed,
        },
    ))
}

/// Explicitly skip the final phase contribution
pub fn skip_final_phase(
    session: &mut ExchangeSession,
    participant_id: &str,
    now: DateTime<Utc>,
    rules: &ExchangeRules,
) -> Result<bool, ExchangeError> {
    let seat = seat_for(session, participant_id)?;
    ensure_active(session)?;
    if session.current_phase != Phase::FINAL {
        return Err(ExchangeError::PhaseNotSkippable(session.current_phase));
    }

    set_entry_if_empty(session, seat, PhaseEntry::Skipped);
    touch(session, now, rules);
    Ok(complete_if_finished(session, now))
}

/// Move to the next phase once both participants contributed
pub fn advance_phase(
    session: &mut ExchangeSession,
    requester_id: &str,
    now: DateTime<Utc>,
    rules: &ExchangeRules,
) -> Result<Phase, ExchangeError> {
    seat_for(session, requester_id)?;
    ensure_active(session)?;

    let Some(next) = session.current_phase.next() else {
        return Err(ExchangeError::AlreadyAtFinalPhase);
    };
    if !session.record(session.current_phase).is_complete() {
        return Err(ExchangeError::PhaseNotReady(session.current_phase));
    }

    session.current_phase = next;
    touch(session, now, rules);
    Ok(next)
}

/// End the session at the request of either participant
pub fn abandon_session(
    session: &mut ExchangeSession,
    participant_id: &str,
    now: DateTime<Utc>,
) -> Result<(), ExchangeError> {
    seat_for(session, participant_id)?;
    ensure_active(session)?;

    session.status = SessionStatus::Abandoned;
    session.ended_at = Some(now);
    Ok(())
}

/// Progress on the current phase from one participant's point of view
pub fn phase_progress(session: &ExchangeSession, viewer_id: &str) -> Option<PhaseProgress> {
    let seat = session.seat_of(viewer_id)?;
    let other = match seat {
        Seat::A => Seat::B,
        Seat::B => Seat::A,
    };
    let phase = session.current_phase;

    Some(PhaseProgress {
        phase,
        my_submission: session.entry(phase, seat).is_some(),
        counterpart_submission: session.entry(phase, other).is_some(),
        can_advance: can_advance(session),
    })
}

pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "The brushwork pulls me into a quiet storm of colour and memory today.";

    fn session(now: DateTime<Utc>) -> ExchangeSession {
        open_session(None, "art_1", "alice", "bob", now, &ExchangeRules::default())
    }

    fn submit(s: &mut ExchangeSession, who: &str, now: DateTime<Utc>) -> Result<(Message, SubmissionOutcome), ExchangeError> {
        submit_message(s, who, LONG, &[], now, &ExchangeRules::default())
    }

    #[test]
    fn test_new_session_starts_in_phase_one() {
        let now = Utc::now();
        let s = session(now);
        assert_eq!(s.current_phase, Phase::Impression);
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.expires_at, now + Duration::hours(24));
    }

    #[test]
    fn test_short_message_rejected_without_change() {
        let now = Utc::now();
        let mut s = session(now);
        let before = s.clone();

        let err = submit_message(&mut s, "alice", "   too short   ", &[], now, &ExchangeRules::default())
            .unwrap_err();

        assert!(matches!(err, ExchangeError::MessageTooShort { min: 50, actual: 9 }));
        assert_eq!(s, before);
    }

    #[test]
    fn test_padding_does_not_count() {
        let rules = ExchangeRules::default();
        let padded = format!("   {}   ", "x".repeat(49));
        assert!(validate_content(Phase::Impression, &padded, &rules).is_err());
        assert!(validate_content(Phase::Interpretation, &"x".repeat(50), &rules).is_ok());
    }

    #[test]
    fn test_later_phases_accept_short_but_not_empty() {
        let rules = ExchangeRules::default();
        assert!(validate_content(Phase::Perspective, "short", &rules).is_ok());
        assert!(matches!(
            validate_content(Phase::Connection, "   ", &rules),
            Err(ExchangeError::EmptyMessage)
        ));
        assert!(matches!(
            validate_content(Phase::Connection, &"x".repeat(2001), &rules),
            Err(ExchangeError::MessageTooLong { max: 2000 })
        ));
    }

    #[test]
    fn test_non_participant_rejected() {
        let now = Utc::now();
        let mut s = session(now);
        assert!(matches!(submit(&mut s, "mallory", now), Err(ExchangeError::NotAParticipant)));
        assert!(matches!(
            advance_phase(&mut s, "mallory", now, &ExchangeRules::default()),
            Err(ExchangeError::NotAParticipant)
        ));
    }

    #[test]
    fn test_advance_requires_both_sides() {
        let now = Utc::now();
        let rules = ExchangeRules::default();
        let mut s = session(now);

        assert!(matches!(
            advance_phase(&mut s, "alice", now, &rules),
            Err(ExchangeError::PhaseNotReady(Phase::Impression))
        ));

        submit(&mut s, "alice", now).unwrap();
        // Repeated messages from one side never unlock advancement
        submit(&mut s, "alice", now).unwrap();
        assert!(!can_advance(&s));
        assert!(advance_phase(&mut s, "bob", now, &rules).is_err());

        submit(&mut s, "bob", now).unwrap();
        assert!(can_advance(&s));
        assert_eq!(advance_phase(&mut s, "bob", now, &rules).unwrap(), Phase::Interpretation);
        assert_eq!(s.current_phase, Phase::Interpretation);

        // The second caller sees the new phase, which is not ready yet
        assert!(matches!(
            advance_phase(&mut s, "alice", now, &rules),
            Err(ExchangeError::PhaseNotReady(Phase::Interpretation))
        ));
    }

    #[test]
    fn test_first_message_is_authoritative() {
        let now = Utc::now();
        let mut s = session(now);
        let (first, outcome) = submit(&mut s, "alice", now).unwrap();
        assert!(outcome.authoritative);
        let (second, outcome) = submit(&mut s, "alice", now).unwrap();
        assert!(!outcome.authoritative);

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(
            s.record(Phase::Impression).participant_a,
            Some(PhaseEntry::Submitted { message_id: first.id })
        );
    }

    #[test]
    fn test_full_walk_to_completion() {
        let now = Utc::now();
        let rules = ExchangeRules::default();
        let mut s = session(now);
        let mut last_phase = s.current_phase;

        for _ in 0..3 {
            submit(&mut s, "alice", now).unwrap();
            submit(&mut s, "bob", now).unwrap();
            advance_phase(&mut s, "alice", now, &rules).unwrap();
            assert!(s.current_phase > last_phase);
            last_phase = s.current_phase;
        }
        assert_eq!(s.current_phase, Phase::Connection);
        assert!(matches!(
            advance_phase(&mut s, "alice", now, &rules),
            Err(ExchangeError::AlreadyAtFinalPhase)
        ));

        let (_, outcome) = submit(&mut s, "alice", now).unwrap();
        assert!(!outcome.completed);
        let completed = skip_final_phase(&mut s, "bob", now, &rules).unwrap();
        assert!(completed);
        assert_eq!(s.status, SessionStatus::Completed);
        assert!(matches!(submit(&mut s, "alice", now), Err(ExchangeError::SessionNotActive(SessionStatus::Completed))));
    }

    #[test]
    fn test_skip_only_in_final_phase() {
        let now = Utc::now();
        let mut s = session(now);
        assert!(matches!(
            skip_final_phase(&mut s, "alice", now, &ExchangeRules::default()),
            Err(ExchangeError::PhaseNotSkippable(Phase::Impression))
        ));
    }

    #[test]
    fn test_abandon_from_active() {
        let now = Utc::now();
        let mut s = session(now);
        abandon_session(&mut s, "bob", now).unwrap();
        assert_eq!(s.status, SessionStatus::Abandoned);
        assert!(matches!(
            abandon_session(&mut s, "alice", now),
            Err(ExchangeError::SessionNotActive(SessionStatus::Abandoned))
        ));
    }

    #[test]
    fn test_lazy_expiry() {
        let now = Utc::now();
        let rules = ExchangeRules::default();
        let mut s = session(now);

        assert!(!expire_if_idle(&mut s, now + Duration::hours(24), &rules));
        assert_eq!(s.status, SessionStatus::Active);

        assert!(expire_if_idle(&mut s, now + Duration::hours(24) + Duration::seconds(1), &rules));
        assert_eq!(s.status, SessionStatus::Expired);
        assert_eq!(s.ended_at, Some(now + Duration::hours(24)));
    }

    #[test]
    fn test_activity_extends_deadline() {
        let now = Utc::now();
        let rules = ExchangeRules::default();
        let mut s = session(now);
        let later = now + Duration::hours(20);
        submit(&mut s, "alice", later).unwrap();

        assert!(!expire_if_idle(&mut s, now + Duration::hours(30), &rules));
        assert_eq!(s.expires_at, later + Duration::hours(24));
    }

    #[test]
    fn test_progress_is_per_viewer() {
        let now = Utc::now();
        let mut s = session(now);
        submit(&mut s, "bob", now).unwrap();

        let alice = phase_progress(&s, "alice").unwrap();
        assert!(!alice.my_submission);
        assert!(alice.counterpart_submission);
        assert!(!alice.can_advance);

        let bob = phase_progress(&s, "bob").unwrap();
        assert!(bob.my_submission);
        assert!(phase_progress(&s, "mallory").is_none());
    }

    #[test]
    fn test_tags_normalized() {
        let tags = vec![" Awe ".to_string(), "awe".to_string(), "".to_string(), "calm".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["awe", "calm"]);
    }
}
