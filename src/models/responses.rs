use crate::models::domain::{
    CompanionRequest, CompanionReview, ExchangeSession, Phase, ScoredCandidate, SessionStatus,
};
use crate::models::views::{ExchangeStats, MessageView, SessionView};
use crate::services::cache::CacheStats;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
    #[serde(rename = "compatibilityCache")]
    pub compatibility_cache: CacheStats,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// A listing of companion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequestsResponse {
    pub requests: Vec<CompanionRequest>,
    pub total: usize,
}

/// Reviews left on one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReviewsResponse {
    pub reviews: Vec<CompanionReview>,
    pub total: usize,
}

/// Successful match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptMatchResponse {
    pub request: CompanionRequest,
    pub session: ExchangeSession,
}

/// Ranked candidates for an open request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankCandidatesResponse {
    pub candidates: Vec<ScoredCandidate>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
}

/// Accepted submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitMessageResponse {
    pub message: MessageView,
    /// Whether this message became the sender's entry for the phase
    pub authoritative: bool,
    #[serde(rename = "currentPhase")]
    pub current_phase: Phase,
    #[serde(rename = "sessionStatus")]
    pub session_status: SessionStatus,
}

/// Read receipt outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: bool,
}

/// Every session a user takes part in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionView>,
    pub stats: ExchangeStats,
}
