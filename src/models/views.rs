use crate::core::archetype::ArchetypeCode;
use crate::models::domain::{ArtworkSummary, Message, Phase, Reaction, SessionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Counterpart identity, redacted according to the session phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterpartView {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub nickname: Option<String>,
    #[serde(rename = "archetypeCode")]
    pub archetype: Option<ArchetypeCode>,
    #[serde(rename = "archetypeName")]
    pub archetype_name: Option<String>,
    pub animal: Option<String>,
    pub keywords: Option<BTreeSet<String>>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub contact: Option<String>,
}

/// A transcript message as seen by one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub phase: Phase,
    pub sequence: u64,
    #[serde(rename = "fromMe")]
    pub from_me: bool,
    pub content: String,
    #[serde(rename = "emotionTags")]
    pub emotion_tags: Vec<String>,
    #[serde(rename = "sentAt")]
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "readAt")]
    pub read_at: Option<DateTime<Utc>>,
    pub reaction: Option<Reaction>,
}

impl MessageView {
    pub fn from_message(message: &Message, viewer_id: &str) -> Self {
        Self {
            id: message.id,
            phase: message.phase,
            sequence: message.sequence,
            from_me: message.sender_id == viewer_id,
            content: message.content.clone(),
            emotion_tags: message.emotion_tags.clone(),
            sent_at: message.sent_at,
            read_at: message.read_at,
            reaction: message.reaction,
        }
    }
}

/// Who has contributed to the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub phase: Phase,
    #[serde(rename = "mySubmission")]
    pub my_submission: bool,
    #[serde(rename = "counterpartSubmission")]
    pub counterpart_submission: bool,
    #[serde(rename = "canAdvance")]
    pub can_advance: bool,
}

/// Phase-filtered, identity-redacted projection of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    pub artwork: Option<ArtworkSummary>,
    pub status: SessionStatus,
    #[serde(rename = "currentPhase")]
    pub current_phase: Phase,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    pub counterpart: CounterpartView,
    pub progress: PhaseProgress,
    pub messages: Vec<MessageView>,
    #[serde(rename = "unreadCount")]
    pub unread_count: usize,
}

/// Per-user exchange counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub abandoned: usize,
    pub expired: usize,
}
