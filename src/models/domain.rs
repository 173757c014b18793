use crate::core::archetype::ArchetypeCode;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Participant profile as served by the profile directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub nickname: String,
    #[serde(rename = "archetypeCode")]
    pub archetype: ArchetypeCode,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    /// Contact handle the user agreed to share once a session reaches the final phase
    #[serde(default)]
    pub contact: Option<String>,
}

/// Artwork metadata as served by the artwork catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkSummary {
    #[serde(rename = "artworkId")]
    pub artwork_id: String,
    pub title: String,
    pub artist: String,
    #[serde(rename = "imageRef", default)]
    pub image_ref: Option<String>,
}

/// Scoring weights and complementarity thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub social: f64,
    pub abstractness: f64,
    pub emotional: f64,
    pub structural: f64,
    pub social_complement_threshold: f64,
    pub abstractness_complement_threshold: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            social: 0.5,
            abstractness: 0.5,
            emotional: 1.0,
            structural: 1.0,
            social_complement_threshold: 50.0,
            abstractness_complement_threshold: 40.0,
        }
    }
}

/// Per-dimension compatibility, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub social: f64,
    pub artistic: f64,
    pub emotional: f64,
    pub structural: f64,
}

impl DimensionScores {
    pub fn mean(&self) -> f64 {
        (self.social + self.artistic + self.emotional + self.structural) / 4.0
    }
}

/// Derived compatibility between two archetypes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    #[serde(rename = "overallScore")]
    pub overall_score: u8,
    #[serde(rename = "dimensionScores")]
    pub dimension_scores: DimensionScores,
    #[serde(rename = "sharedInterests")]
    pub shared_interests: BTreeSet<String>,
    #[serde(rename = "complementaryTraits")]
    pub complementary_traits: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "morning" => Some(TimeSlot::Morning),
            "afternoon" => Some(TimeSlot::Afternoon),
            "evening" => Some(TimeSlot::Evening),
            _ => None,
        }
    }
}

/// Host-side filter applied to every candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilter {
    /// Empty means every archetype is allowed
    #[serde(rename = "allowedArchetypes", default)]
    pub allowed_archetypes: BTreeSet<ArchetypeCode>,
    #[serde(rename = "minCompatibility")]
    pub min_compatibility: u8,
}

impl MatchFilter {
    pub fn allows(&self, code: ArchetypeCode) -> bool {
        self.allowed_archetypes.is_empty() || self.allowed_archetypes.contains(&code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Open,
    Matched,
    Expired,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Matched => "matched",
            RequestStatus::Expired => "expired",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(RequestStatus::Open),
            "matched" => Some(RequestStatus::Matched),
            "expired" => Some(RequestStatus::Expired),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host's time-boxed offer to visit an exhibition with a companion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionRequest {
    pub id: Uuid,
    #[serde(rename = "hostUserId")]
    pub host_user_id: String,
    #[serde(rename = "hostArchetype")]
    pub host_archetype: ArchetypeCode,
    #[serde(rename = "exhibitionId")]
    pub exhibition_id: String,
    /// Artwork the resulting exchange is anchored to
    #[serde(rename = "artworkId")]
    pub artwork_id: String,
    #[serde(rename = "preferredDate")]
    pub preferred_date: NaiveDate,
    #[serde(rename = "timeSlot")]
    pub time_slot: TimeSlot,
    pub filter: MatchFilter,
    pub status: RequestStatus,
    #[serde(rename = "matchedUserId", default)]
    pub matched_user_id: Option<String>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

impl CompanionRequest {
    /// Whether an Open request has outlived its deadline
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.status == RequestStatus::Open && now > self.expires_at
    }
}

/// One of the four ordered exchange phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    Impression = 1,
    Interpretation = 2,
    Perspective = 3,
    Connection = 4,
}

impl Phase {
    pub const FINAL: Phase = Phase::Connection;

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Phase> {
        Phase::try_from(self.number() + 1).ok()
    }

    pub fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase.number()
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::Impression),
            2 => Ok(Phase::Interpretation),
            3 => Ok(Phase::Perspective),
            4 => Ok(Phase::Connection),
            other => Err(format!("phase must be between 1 and 4, got {}", other)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
            SessionStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SessionStatus::Active),
            "completed" => Some(SessionStatus::Completed),
            "abandoned" => Some(SessionStatus::Abandoned),
            "expired" => Some(SessionStatus::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant's authoritative contribution to one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PhaseEntry {
    Submitted {
        #[serde(rename = "messageId")]
        message_id: Uuid,
    },
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    #[serde(rename = "participantA", default)]
    pub participant_a: Option<PhaseEntry>,
    #[serde(rename = "participantB", default)]
    pub participant_b: Option<PhaseEntry>,
}

impl PhaseRecord {
    pub fn is_complete(&self) -> bool {
        self.participant_a.is_some() && self.participant_b.is_some()
    }
}

/// Which seat a user occupies in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    A,
    B,
}

/// Phased one-on-one conversation anchored to one artwork
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSession {
    pub id: Uuid,
    #[serde(rename = "requestId", default)]
    pub request_id: Option<Uuid>,
    #[serde(rename = "artworkId")]
    pub artwork_id: String,
    #[serde(rename = "participantA")]
    pub participant_a: String,
    #[serde(rename = "participantB")]
    pub participant_b: String,
    #[serde(rename = "currentPhase")]
    pub current_phase: Phase,
    pub status: SessionStatus,
    /// Indexed by phase number minus one
    #[serde(rename = "phaseRecords")]
    pub phase_records: [PhaseRecord; 4],
    #[serde(rename = "messageCount")]
    pub message_count: u64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "lastActivityAt")]
    pub last_activity_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "endedAt", default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Number of writes the store has accepted; a save carrying an older
    /// revision is refused
    #[serde(default)]
    pub revision: u64,
}

impl ExchangeSession {
    pub fn seat_of(&self, user_id: &str) -> Option<Seat> {
        if self.participant_a == user_id {
            Some(Seat::A)
        } else if self.participant_b == user_id {
            Some(Seat::B)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.seat_of(user_id).is_some()
    }

    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        match self.seat_of(user_id)? {
            Seat::A => Some(&self.participant_b),
            Seat::B => Some(&self.participant_a),
        }
    }

    pub fn record(&self, phase: Phase) -> &PhaseRecord {
        &self.phase_records[phase.index()]
    }

    pub fn record_mut(&mut self, phase: Phase) -> &mut PhaseRecord {
        &mut self.phase_records[phase.index()]
    }

    pub fn entry(&self, phase: Phase, seat: Seat) -> Option<PhaseEntry> {
        let record = self.record(phase);
        match seat {
            Seat::A => record.participant_a,
            Seat::B => record.participant_b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Resonate,
    Thoughtful,
    Inspiring,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Resonate => "resonate",
            Reaction::Thoughtful => "thoughtful",
            Reaction::Inspiring => "inspiring",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "resonate" => Some(Reaction::Resonate),
            "thoughtful" => Some(Reaction::Thoughtful),
            "inspiring" => Some(Reaction::Inspiring),
            _ => None,
        }
    }
}

/// One transcript entry; immutable apart from `read_at` and `reaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    pub phase: Phase,
    /// Acceptance order within the session, starting at 1
    pub sequence: u64,
    #[serde(rename = "senderId")]
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "emotionTags", default)]
    pub emotion_tags: Vec<String>,
    #[serde(rename = "sentAt")]
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "readAt", default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reaction: Option<Reaction>,
}

/// Post-visit rating of the counterpart, at most one per reviewer and session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionReview {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    #[serde(rename = "reviewerId")]
    pub reviewer_id: String,
    #[serde(rename = "revieweeId")]
    pub reviewee_id: String,
    /// 1 to 5
    pub rating: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A scored candidate for an open request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "archetypeCode")]
    pub archetype: ArchetypeCode,
    pub compatibility: CompatibilityResult,
}

/// Events delivered through the notifier, fire-and-forget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    RequestMatched {
        #[serde(rename = "requestId")]
        request_id: Uuid,
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    MessageReceived {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        phase: Phase,
    },
    PhaseAdvanced {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        phase: Phase,
    },
    SessionCompleted {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    SessionAbandoned {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ordering_and_next() {
        assert!(Phase::Impression < Phase::Connection);
        assert_eq!(Phase::Impression.next(), Some(Phase::Interpretation));
        assert_eq!(Phase::Connection.next(), None);
        assert!(Phase::try_from(0).is_err());
        assert!(Phase::try_from(5).is_err());
    }

    #[test]
    fn test_phase_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Phase::Perspective).unwrap(), "3");
        let phase: Phase = serde_json::from_str("2").unwrap();
        assert_eq!(phase, Phase::Interpretation);
    }

    #[test]
    fn test_filter_allows() {
        let mut filter = MatchFilter {
            allowed_archetypes: BTreeSet::new(),
            min_compatibility: 50,
        };
        assert!(filter.allows(ArchetypeCode::Laef));

        filter.allowed_archetypes.insert(ArchetypeCode::Srmc);
        assert!(!filter.allows(ArchetypeCode::Laef));
        assert!(filter.allows(ArchetypeCode::Srmc));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
            SessionStatus::Expired,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("matched"), Some(RequestStatus::Matched));
        assert_eq!(Reaction::parse("Inspiring"), Some(Reaction::Inspiring));
    }
}
