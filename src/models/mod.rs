// Model exports
pub mod domain;
pub mod requests;
pub mod responses;
pub mod views;

pub use domain::{
    ArtworkSummary, CompanionRequest, CompanionReview, CompatibilityResult, DimensionScores,
    ExchangeSession, MatchFilter, Message, NotificationEvent, ParticipantProfile, Phase, PhaseEntry,
    PhaseRecord, Reaction, RequestStatus, ScoredCandidate, ScoringWeights, Seat, SessionStatus,
    TimeSlot,
};
pub use requests::{
    AbandonSessionRequest, AdvancePhaseRequest, AttemptMatchRequest, CancelRequestRequest,
    HostRequestsQuery, MarkReadRequest, OpenRequestRequest, ParticipantRequest,
    RankCandidatesRequest, ReactRequest, ReviewCompanionRequest, ScorePreviewRequest,
    SkipPhaseRequest, SubmitMessageRequest, ViewerQuery,
};
pub use responses::{
    AttemptMatchResponse, ErrorResponse, HealthResponse, ListRequestsResponse, ListReviewsResponse,
    ListSessionsResponse, MarkReadResponse, RankCandidatesResponse, SubmitMessageResponse,
};
pub use views::{CounterpartView, ExchangeStats, MessageView, PhaseProgress, SessionView};
