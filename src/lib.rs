//! Artmate - companion matching and progressive-disclosure perception exchange
//!
//! Hosts open companion requests for an exhibition, candidates are scored by
//! personality archetype, and a successful match starts a four-phase exchange
//! around one artwork that reveals identity as both sides engage.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{ArchetypeCode, ArchetypeRegistry, Matcher};
pub use error::{ExchangeError, MatchRejection};
pub use models::{CompanionRequest, CompatibilityResult, ExchangeSession, Message, Phase, ScoringWeights};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matcher = Matcher::with_default_weights();
        let result = matcher.score_codes(ArchetypeCode::Laef, ArchetypeCode::Laef);
        assert_eq!(result.overall_score, 100);
        assert_eq!(ArchetypeRegistry::global().len(), 16);
    }
}
