use crate::core::{
    archetype::{ArchetypeCode, ArchetypeRegistry, PersonalityArchetype},
    filters::check_candidate,
    scoring::calculate_compatibility,
};
use crate::error::MatchRejection;
use crate::models::{CompatibilityResult, MatchFilter, ParticipantProfile, ScoredCandidate, ScoringWeights};

/// Result of ranking candidates for a request
#[derive(Debug)]
pub struct MatchResult {
    pub candidates: Vec<ScoredCandidate>,
    pub total_candidates: usize,
}

/// Compatibility orchestrator shared by previews, ranking and match attempts
///
/// # Pipeline Stages
/// 1. Self exclusion
/// 2. Archetype filter
/// 3. Compatibility scoring and threshold
/// 4. Ranking
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    registry: &'static ArchetypeRegistry,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            registry: ArchetypeRegistry::global(),
        }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default())
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn registry(&self) -> &'static ArchetypeRegistry {
        self.registry
    }

    /// Score two archetype records directly
    pub fn score(&self, a: &PersonalityArchetype, b: &PersonalityArchetype) -> CompatibilityResult {
        calculate_compatibility(a, b, &self.weights)
    }

    /// Score two archetypes by code
    pub fn score_codes(&self, a: ArchetypeCode, b: ArchetypeCode) -> CompatibilityResult {
        self.score(self.registry.get(a), self.registry.get(b))
    }

    /// Score a candidate against a host and apply the host's filter
    pub fn evaluate(
        &self,
        host: ArchetypeCode,
        candidate: ArchetypeCode,
        filter: &MatchFilter,
    ) -> Result<CompatibilityResult, MatchRejection> {
        let compatibility = self.score_codes(host, candidate);
        check_candidate(filter, candidate, &compatibility)?;
        Ok(compatibility)
    }

    /// Rank candidates for a host request
    ///
    /// Candidates failing the filter are dropped. Survivors are ordered by
    /// overall score, then by number of shared interests, then by user id so
    /// the ordering is stable.
    pub fn rank_candidates(
        &self,
        host_user_id: &str,
        host: ArchetypeCode,
        filter: &MatchFilter,
        candidates: Vec<ParticipantProfile>,
        limit: usize,
    ) -> MatchResult {
        let total_candidates = candidates.len();

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            // Stage 1: never pair a host with themselves
            .filter(|profile| profile.user_id != host_user_id)
            // Stages 2 & 3: archetype filter, scoring and threshold
            .filter_map(|profile| {
                match self.evaluate(host, profile.archetype, filter) {
                    Ok(compatibility) => Some(ScoredCandidate {
                        user_id: profile.user_id,
                        archetype: profile.archetype,
                        compatibility,
                    }),
                    Err(reason) => {
                        tracing::trace!("Candidate {} dropped: {}", profile.user_id, reason);
                        None
                    }
                }
            })
            .collect();

        // Stage 4: ranking
        scored.sort_by(|a, b| {
            b.compatibility
                .overall_score
                .cmp(&a.compatibility.overall_score)
                .then_with(|| {
                    b.compatibility
                        .shared_interests
                        .len()
                        .cmp(&a.compatibility.shared_interests.len())
                })
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        scored.dedup_by(|a, b| a.user_id == b.user_id);
        scored.truncate(limit);

        MatchResult {
            candidates: scored,
            total_candidates,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn candidate(id: &str, archetype: ArchetypeCode) -> ParticipantProfile {
        ParticipantProfile {
            user_id: id.to_string(),
            nickname: format!("User {}", id),
            archetype,
            avatar_url: None,
            bio: None,
            contact: None,
        }
    }

    fn open_filter(min: u8) -> MatchFilter {
        MatchFilter {
            allowed_archetypes: BTreeSet::new(),
            min_compatibility: min,
        }
    }

    #[test]
    fn test_rank_excludes_host() {
        let matcher = Matcher::with_default_weights();
        let candidates = vec![
            candidate("host", ArchetypeCode::Laef),
            candidate("1", ArchetypeCode::Laef),
        ];

        let result = matcher.rank_candidates("host", ArchetypeCode::Laef, &open_filter(40), candidates, 10);

        assert_eq!(result.total_candidates, 2);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].user_id, "1");
        assert_eq!(result.candidates[0].compatibility.overall_score, 100);
    }

    #[test]
    fn test_rank_sorted_by_score() {
        let matcher = Matcher::with_default_weights();
        let candidates: Vec<ParticipantProfile> = ArchetypeCode::ALL
            .iter()
            .enumerate()
            .map(|(i, code)| candidate(&i.to_string(), *code))
            .collect();

        let result = matcher.rank_candidates("host", ArchetypeCode::Saec, &open_filter(40), candidates, 16);

        assert!(!result.candidates.is_empty());
        assert_eq!(result.candidates[0].archetype, ArchetypeCode::Saec);
        for pair in result.candidates.windows(2) {
            assert!(pair[0].compatibility.overall_score >= pair[1].compatibility.overall_score);
        }
        for c in &result.candidates {
            assert!(c.compatibility.overall_score >= 40);
        }
    }

    #[test]
    fn test_rank_respects_allowed_archetypes_and_limit() {
        let matcher = Matcher::with_default_weights();
        let mut filter = open_filter(40);
        filter.allowed_archetypes.insert(ArchetypeCode::Laef);

        let candidates = vec![
            candidate("1", ArchetypeCode::Laef),
            candidate("2", ArchetypeCode::Srmc),
            candidate("3", ArchetypeCode::Laef),
        ];

        let result = matcher.rank_candidates("host", ArchetypeCode::Laef, &filter, candidates, 1);
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].archetype, ArchetypeCode::Laef);
    }

    #[test]
    fn test_evaluate_rejects_below_threshold() {
        let matcher = Matcher::with_default_weights();
        let score = matcher.score_codes(ArchetypeCode::Laef, ArchetypeCode::Srmc).overall_score;
        let rejection = matcher
            .evaluate(ArchetypeCode::Laef, ArchetypeCode::Srmc, &open_filter(score + 1))
            .unwrap_err();
        assert!(matches!(rejection, MatchRejection::BelowThreshold { .. }));
    }
}
