//! Progressive identity disclosure.
//!
//! What a participant may learn about their counterpart depends only on the
//! session phase. Redaction happens on the read path, so stored profiles are
//! never altered.

use crate::core::archetype::ArchetypeRegistry;
use crate::models::{CounterpartView, ParticipantProfile, Phase};

pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous viewer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DisclosureLevel {
    /// Nothing identifying
    Anonymous,
    /// Nickname only
    Nickname,
    /// Nickname, archetype code and the archetype's public profile
    Archetype,
    /// Everything, including avatar, bio and contact handle
    Full,
}

impl DisclosureLevel {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Impression => DisclosureLevel::Anonymous,
            Phase::Interpretation => DisclosureLevel::Nickname,
            Phase::Perspective => DisclosureLevel::Archetype,
            Phase::Connection => DisclosureLevel::Full,
        }
    }
}

/// The view of a counterpart before anything is disclosed
pub fn anonymous_counterpart() -> CounterpartView {
    CounterpartView {
        display_name: ANONYMOUS_DISPLAY_NAME.to_string(),
        ..CounterpartView::default()
    }
}

/// Project a counterpart profile through the disclosure level of `phase`
pub fn redact_counterpart(profile: &ParticipantProfile, phase: Phase) -> CounterpartView {
    let level = DisclosureLevel::for_phase(phase);
    let mut view = anonymous_counterpart();

    if level >= DisclosureLevel::Nickname {
        view.display_name = profile.nickname.clone();
        view.nickname = Some(profile.nickname.clone());
    }

    if level >= DisclosureLevel::Archetype {
        let archetype = ArchetypeRegistry::global().get(profile.archetype);
        view.archetype = Some(profile.archetype);
        view.archetype_name = Some(archetype.name.clone());
        view.animal = Some(archetype.animal.clone());
        view.keywords = Some(archetype.keywords.clone());
    }

    if level >= DisclosureLevel::Full {
        view.avatar_url = profile.avatar_url.clone();
        view.bio = profile.bio.clone();
        view.contact = profile.contact.clone();
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archetype::ArchetypeCode;

    fn profile() -> ParticipantProfile {
        ParticipantProfile {
            user_id: "user_b".to_string(),
            nickname: "moonlit".to_string(),
            archetype: ArchetypeCode::Lamf,
            avatar_url: Some("https://img.example/moonlit.png".to_string()),
            bio: Some("Rothko and rain".to_string()),
            contact: Some("@moonlit".to_string()),
        }
    }

    #[test]
    fn test_phase_one_is_anonymous() {
        let view = redact_counterpart(&profile(), Phase::Impression);
        assert_eq!(view.display_name, ANONYMOUS_DISPLAY_NAME);
        assert!(view.nickname.is_none());
        assert!(view.archetype.is_none());
        assert!(view.avatar_url.is_none());
        assert!(view.contact.is_none());
    }

    #[test]
    fn test_phase_two_reveals_nickname_only() {
        let view = redact_counterpart(&profile(), Phase::Interpretation);
        assert_eq!(view.nickname.as_deref(), Some("moonlit"));
        assert_eq!(view.display_name, "moonlit");
        assert!(view.archetype.is_none());
        assert!(view.keywords.is_none());
        assert!(view.avatar_url.is_none());
    }

    #[test]
    fn test_phase_three_reveals_archetype() {
        let view = redact_counterpart(&profile(), Phase::Perspective);
        assert_eq!(view.archetype, Some(ArchetypeCode::Lamf));
        assert_eq!(view.animal.as_deref(), Some("Owl"));
        assert!(view.keywords.is_some());
        assert!(view.avatar_url.is_none());
        assert!(view.bio.is_none());
        assert!(view.contact.is_none());
    }

    #[test]
    fn test_phase_four_reveals_everything() {
        let view = redact_counterpart(&profile(), Phase::Connection);
        assert_eq!(view.avatar_url.as_deref(), Some("https://img.example/moonlit.png"));
        assert_eq!(view.bio.as_deref(), Some("Rothko and rain"));
        assert_eq!(view.contact.as_deref(), Some("@moonlit"));
    }
}
