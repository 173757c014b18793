use crate::core::archetype::PersonalityArchetype;
use crate::models::{CompatibilityResult, DimensionScores, ScoringWeights};
use std::collections::BTreeSet;

/// Calculate the compatibility (0-100) between two archetypes
///
/// Scoring formula, per dimension:
/// dimension = clamp(100 - |a - b| * weight, 0, 100)
///
/// ```text
/// social      weight 0.5   (trait: social)
/// artistic    weight 0.5   (trait: abstractness)
/// emotional   weight 1.0   (trait: emotionality)
/// structural  weight 1.0   (trait: structure)
/// ```
///
/// overall = round(mean of the four dimensions)
///
/// Pure and symmetric; callers resolve archetype codes before scoring.
pub fn calculate_compatibility(
    a: &PersonalityArchetype,
    b: &PersonalityArchetype,
    weights: &ScoringWeights,
) -> CompatibilityResult {
    let ta = a.trait_vector;
    let tb = b.trait_vector;

    let social_gap = trait_gap(ta.social, tb.social);
    let abstract_gap = trait_gap(ta.abstractness, tb.abstractness);

    let dimension_scores = DimensionScores {
        social: dimension_score(social_gap, weights.social),
        artistic: dimension_score(abstract_gap, weights.abstractness),
        emotional: dimension_score(trait_gap(ta.emotionality, tb.emotionality), weights.emotional),
        structural: dimension_score(trait_gap(ta.structure, tb.structure), weights.structural),
    };

    let overall_score = dimension_scores.mean().round().clamp(0.0, 100.0) as u8;

    let shared_interests: BTreeSet<String> = a
        .keywords
        .intersection(&b.keywords)
        .cloned()
        .collect();

    // Only social and artistic differences count as complementary
    let mut complementary_traits = BTreeSet::new();
    if social_gap > weights.social_complement_threshold {
        complementary_traits.insert("social".to_string());
    }
    if abstract_gap > weights.abstractness_complement_threshold {
        complementary_traits.insert("artistic".to_string());
    }

    CompatibilityResult {
        overall_score,
        dimension_scores,
        shared_interests,
        complementary_traits,
    }
}

#[inline]
fn trait_gap(a: u8, b: u8) -> f64 {
    (a as f64 - b as f64).abs()
}

#[inline]
fn dimension_score(gap: f64, weight: f64) -> f64 {
    (100.0 - gap * weight).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archetype::{ArchetypeCode, ArchetypeRegistry, TraitVector};

    fn archetype(code: ArchetypeCode, traits: [u8; 4], keywords: &[&str]) -> PersonalityArchetype {
        PersonalityArchetype {
            code,
            name: format!("Test {}", code),
            animal: "Test".to_string(),
            trait_vector: TraitVector {
                social: traits[0],
                abstractness: traits[1],
                emotionality: traits[2],
                structure: traits[3],
            },
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            color_palette: vec![],
        }
    }

    #[test]
    fn test_fox_owl_worked_example() {
        let fox = archetype(ArchetypeCode::Laef, [80, 30, 70, 20], &["dreams", "color"]);
        let owl = archetype(ArchetypeCode::Lamf, [20, 80, 40, 90], &["philosophy", "color"]);

        let result = calculate_compatibility(&fox, &owl, &ScoringWeights::default());

        assert_eq!(result.dimension_scores.social, 70.0);
        assert_eq!(result.dimension_scores.artistic, 75.0);
        assert_eq!(result.dimension_scores.emotional, 70.0);
        assert_eq!(result.dimension_scores.structural, 30.0);
        assert_eq!(result.overall_score, 61);
        assert_eq!(result.shared_interests.len(), 1);
        assert!(result.shared_interests.contains("color"));
        // |80-20| = 60 > 50 and |30-80| = 50 > 40
        assert!(result.complementary_traits.contains("social"));
        assert!(result.complementary_traits.contains("artistic"));
    }

    #[test]
    fn test_identical_archetypes_score_full() {
        let weights = ScoringWeights::default();
        for a in ArchetypeRegistry::global().iter() {
            let result = calculate_compatibility(a, a, &weights);
            assert_eq!(result.overall_score, 100);
            assert!(result.complementary_traits.is_empty());
            assert_eq!(result.shared_interests, a.keywords);
        }
    }

    #[test]
    fn test_overall_is_symmetric() {
        let weights = ScoringWeights::default();
        let registry = ArchetypeRegistry::global();
        for a in registry.iter() {
            for b in registry.iter() {
                let ab = calculate_compatibility(a, b, &weights);
                let ba = calculate_compatibility(b, a, &weights);
                assert_eq!(ab.overall_score, ba.overall_score, "{} vs {}", a.code, b.code);
                assert_eq!(ab.complementary_traits, ba.complementary_traits);
            }
        }
    }

    #[test]
    fn test_dimension_clamped_at_zero() {
        let weights = ScoringWeights {
            structural: 2.0,
            ..ScoringWeights::default()
        };
        let a = archetype(ArchetypeCode::Lrmc, [0, 0, 0, 0], &[]);
        let b = archetype(ArchetypeCode::Saef, [0, 0, 0, 100], &[]);

        let result = calculate_compatibility(&a, &b, &weights);
        assert_eq!(result.dimension_scores.structural, 0.0);
        assert_eq!(result.overall_score, 75);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let a = archetype(ArchetypeCode::Laef, [20, 20, 50, 50], &[]);
        let b = archetype(ArchetypeCode::Saef, [70, 60, 50, 50], &[]);

        let result = calculate_compatibility(&a, &b, &ScoringWeights::default());
        // Gaps exactly at the thresholds are not complementary
        assert!(result.complementary_traits.is_empty());
    }
}
