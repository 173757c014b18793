use crate::core::archetype::{ArchetypeCode, ArchetypeError};
use crate::models::{ErrorResponse, Phase, RequestStatus, SessionStatus};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Coarse error category, used for HTTP mapping and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Authorization,
    Conflict,
    NotFound,
    Dependency,
}

/// Why a match attempt did not produce a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MatchRejection {
    BelowThreshold { score: u8, required: u8 },
    ArchetypeExcluded { archetype: ArchetypeCode },
    AlreadyMatched,
    RequestClosed { status: RequestStatus },
    SelfMatch,
}

impl fmt::Display for MatchRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRejection::BelowThreshold { score, required } => {
                write!(f, "compatibility {} is below the required {}", score, required)
            }
            MatchRejection::ArchetypeExcluded { archetype } => {
                write!(f, "archetype {} is not accepted by this request", archetype)
            }
            MatchRejection::AlreadyMatched => f.write_str("request was already matched"),
            MatchRejection::RequestClosed { status } => write!(f, "request is {}", status),
            MatchRejection::SelfMatch => f.write_str("a host cannot match their own request"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Message too short: {actual} characters, at least {min} required in this phase")]
    MessageTooShort { min: usize, actual: usize },

    #[error("Message content is empty")]
    EmptyMessage,

    #[error("Message too long: at most {max} characters allowed")]
    MessageTooLong { max: usize },

    #[error("Minimum compatibility {value} outside allowed range {min}..={max}")]
    InvalidFilterRange { value: u8, min: u8, max: u8 },

    #[error("Invalid preferred date: {0}")]
    InvalidPreferredDate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rating {0} outside allowed range 1..=5")]
    InvalidRating(u8),

    #[error("Both participants must contribute to phase {0} before advancing")]
    PhaseNotReady(Phase),

    #[error("Session is already at the final phase")]
    AlreadyAtFinalPhase,

    #[error("Session is not active (status: {0})")]
    SessionNotActive(SessionStatus),

    #[error("Only completed sessions can be reviewed (status: {0})")]
    SessionNotCompleted(SessionStatus),

    #[error("Request is not open (status: {0})")]
    RequestNotOpen(RequestStatus),

    #[error("Matching window is closed")]
    MatchingWindowClosed,

    #[error("Phase {0} cannot be skipped")]
    PhaseNotSkippable(Phase),

    #[error("Match rejected: {0}")]
    MatchRejected(MatchRejection),

    #[error("User is not a participant of this session")]
    NotAParticipant,

    #[error("Users cannot react to their own messages")]
    SelfReaction,

    #[error("Only the host can modify this request")]
    NotRequestHost,

    #[error("Message already has a reaction")]
    AlreadyReacted,

    #[error("Companion already reviewed for this session")]
    AlreadyReviewed,

    #[error("Session {0} was modified concurrently; reload and retry")]
    ConcurrentUpdate(Uuid),

    #[error("Host already has an open request for exhibition {0}")]
    DuplicateOpenRequest(String),

    #[error("Companion request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("Exchange session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    #[error("Archetype not found: {0}")]
    ArchetypeNotFound(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Artwork not found: {0}")]
    ArtworkNotFound(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        use ExchangeError::*;
        match self {
            MessageTooShort { .. }
            | EmptyMessage
            | MessageTooLong { .. }
            | InvalidFilterRange { .. }
            | InvalidPreferredDate(_)
            | InvalidInput(_)
            | InvalidRating(_) => ErrorKind::Validation,
            PhaseNotReady(_)
            | AlreadyAtFinalPhase
            | SessionNotActive(_)
            | SessionNotCompleted(_)
            | RequestNotOpen(_)
            | MatchingWindowClosed
            | PhaseNotSkippable(_)
            | MatchRejected(_) => ErrorKind::State,
            NotAParticipant | SelfReaction | NotRequestHost => ErrorKind::Authorization,
            AlreadyReacted | AlreadyReviewed | ConcurrentUpdate(_) | DuplicateOpenRequest(_) => {
                ErrorKind::Conflict
            }
            RequestNotFound(_)
            | SessionNotFound(_)
            | MessageNotFound(_)
            | ArchetypeNotFound(_)
            | ProfileNotFound(_)
            | ArtworkNotFound(_) => ErrorKind::NotFound,
            StorageUnavailable(_) | DependencyUnavailable(_) => ErrorKind::Dependency,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        use ExchangeError::*;
        match self {
            MessageTooShort { .. } => "message_too_short",
            EmptyMessage => "empty_message",
            MessageTooLong { .. } => "message_too_long",
            InvalidFilterRange { .. } => "invalid_filter_range",
            InvalidPreferredDate(_) => "invalid_preferred_date",
            InvalidInput(_) => "invalid_input",
            InvalidRating(_) => "invalid_rating",
            PhaseNotReady(_) => "phase_not_ready",
            AlreadyAtFinalPhase => "already_at_final_phase",
            SessionNotActive(_) => "session_not_active",
            SessionNotCompleted(_) => "session_not_completed",
            RequestNotOpen(_) => "request_not_open",
            MatchingWindowClosed => "matching_window_closed",
            PhaseNotSkippable(_) => "phase_not_skippable",
            MatchRejected(MatchRejection::AlreadyMatched) => "already_matched",
            MatchRejected(_) => "match_rejected",
            NotAParticipant => "not_a_participant",
            SelfReaction => "self_reaction",
            NotRequestHost => "not_request_host",
            AlreadyReacted => "already_reacted",
            AlreadyReviewed => "already_reviewed",
            ConcurrentUpdate(_) => "concurrent_update",
            DuplicateOpenRequest(_) => "duplicate_open_request",
            RequestNotFound(_) => "request_not_found",
            SessionNotFound(_) => "session_not_found",
            MessageNotFound(_) => "message_not_found",
            ArchetypeNotFound(_) => "archetype_not_found",
            ProfileNotFound(_) => "profile_not_found",
            ArtworkNotFound(_) => "artwork_not_found",
            StorageUnavailable(_) => "storage_unavailable",
            DependencyUnavailable(_) => "dependency_unavailable",
        }
    }
}

impl From<ArchetypeError> for ExchangeError {
    fn from(err: ArchetypeError) -> Self {
        match err {
            ArchetypeError::UnknownCode(code) => ExchangeError::ArchetypeNotFound(code),
        }
    }
}

impl ResponseError for ExchangeError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::State | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Dependency => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_status() {
        assert_eq!(
            ExchangeError::MessageTooShort { min: 50, actual: 3 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExchangeError::PhaseNotReady(Phase::Impression).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ExchangeError::SelfReaction.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ExchangeError::StorageUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_concurrent_update_is_conflict() {
        let err = ExchangeError::ConcurrentUpdate(Uuid::nil());
        assert_eq!(err.code(), "concurrent_update");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_already_matched_code() {
        let err = ExchangeError::MatchRejected(MatchRejection::AlreadyMatched);
        assert_eq!(err.code(), "already_matched");
        assert_eq!(err.kind(), ErrorKind::State);
    }
}
