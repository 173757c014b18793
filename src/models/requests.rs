use crate::models::domain::{Reaction, RequestStatus, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to open a companion request for an exhibition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenRequestRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "host_user_id", rename = "hostUserId")]
    pub host_user_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "exhibition_id", rename = "exhibitionId")]
    pub exhibition_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "artwork_id", rename = "artworkId")]
    pub artwork_id: String,
    #[serde(alias = "preferred_date", rename = "preferredDate")]
    pub preferred_date: NaiveDate,
    #[serde(alias = "time_slot", rename = "timeSlot")]
    pub time_slot: TimeSlot,
    /// Archetype codes as free-form strings, resolved against the registry
    #[serde(default)]
    #[validate(length(max = 16))]
    #[serde(alias = "allowed_archetypes", rename = "allowedArchetypes")]
    pub allowed_archetypes: Vec<String>,
    #[serde(default = "default_min_compatibility")]
    #[serde(alias = "min_compatibility", rename = "minCompatibility")]
    pub min_compatibility: u8,
}

fn default_min_compatibility() -> u8 {
    60
}

/// Request to cancel an open companion request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelRequestRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Request to match a candidate against an open request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttemptMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "candidate_user_id", rename = "candidateUserId")]
    pub candidate_user_id: String,
}

/// Request to rank a batch of candidates for an open request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RankCandidatesRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(alias = "candidate_user_ids", rename = "candidateUserIds")]
    pub candidate_user_ids: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Compatibility preview between two archetype codes
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScorePreviewRequest {
    #[validate(length(min = 1))]
    pub a: String,
    #[validate(length(min = 1))]
    pub b: String,
}

/// Request to submit a message to the current phase
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 10))]
    #[serde(alias = "emotion_tags", rename = "emotionTags")]
    pub emotion_tags: Vec<String>,
}

/// Identifies the acting participant for session transitions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ParticipantRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

pub type AdvancePhaseRequest = ParticipantRequest;
pub type SkipPhaseRequest = ParticipantRequest;
pub type AbandonSessionRequest = ParticipantRequest;
pub type MarkReadRequest = ParticipantRequest;

/// Request to react to a message
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReactRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub reaction: Reaction,
}

/// Query string identifying the viewer of a session or listing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ViewerQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Optional status filter for a host's request listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostRequestsQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

/// Post-visit review of the counterpart
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReviewCompanionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[serde(default)]
    #[validate(length(max = 8))]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_request_defaults() {
        let body: OpenRequestRequest = serde_json::from_str(
            r#"{"hostUserId":"u1","exhibitionId":"ex1","artworkId":"a1","preferredDate":"2026-10-17","timeSlot":"afternoon"}"#,
        )
        .unwrap();
        assert_eq!(body.min_compatibility, 60);
        assert!(body.allowed_archetypes.is_empty());
        assert_eq!(body.time_slot, TimeSlot::Afternoon);
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_snake_case_aliases() {
        let body: SubmitMessageRequest =
            serde_json::from_str(r#"{"user_id":"u1","content":"hi","emotion_tags":["awe"]}"#).unwrap();
        assert_eq!(body.emotion_tags, vec!["awe"]);
    }

    #[test]
    fn test_review_rating_range() {
        let body: ReviewCompanionRequest =
            serde_json::from_str(r#"{"userId":"u1","rating":6,"tags":["kind"]}"#).unwrap();
        assert!(body.validate().is_err());

        let body: ReviewCompanionRequest = serde_json::from_str(r#"{"userId":"u1","rating":4}"#).unwrap();
        assert!(body.validate().is_ok());
        assert!(body.note.is_none());
    }

    #[test]
    fn test_host_requests_status_filter() {
        let query: HostRequestsQuery = serde_json::from_str(r#"{"status":"expired"}"#).unwrap();
        assert_eq!(query.status, Some(RequestStatus::Expired));
        let query: HostRequestsQuery = serde_json::from_str("{}").unwrap();
        assert!(query.status.is_none());
    }

    #[test]
    fn test_empty_user_rejected() {
        let body = ParticipantRequest {
            user_id: String::new(),
        };
        assert!(body.validate().is_err());
    }
}
