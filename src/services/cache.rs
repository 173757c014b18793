use crate::core::archetype::ArchetypeCode;
use crate::core::matcher::Matcher;
use crate::models::CompatibilityResult;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cache key for an unordered archetype pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey(ArchetypeCode, ArchetypeCode);

impl PairKey {
    pub fn new(a: ArchetypeCode, b: ArchetypeCode) -> Self {
        if a <= b {
            PairKey(a, b)
        } else {
            PairKey(b, a)
        }
    }
}

/// In-process cache of compatibility results
///
/// Scoring is pure and symmetric over immutable reference data, so entries
/// never need invalidation; the TTL only bounds memory after config reloads.
pub struct CompatibilityCache {
    matcher: Matcher,
    entries: Cache<PairKey, CompatibilityResult>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CompatibilityCache {
    pub fn new(matcher: Matcher, capacity: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            matcher,
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Score a pair, computing it on first use
    pub async fn score(&self, a: ArchetypeCode, b: ArchetypeCode) -> CompatibilityResult {
        let key = PairKey::new(a, b);

        if let Some(result) = self.entries.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Compatibility cache hit: {}-{}", key.0, key.1);
            return result;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = self.matcher.score_codes(key.0, key.1);
        self.entries.insert(key, result.clone()).await;
        tracing::debug!("Scored {}-{}: {}", key.0, key.1, result.overall_score);
        result
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            entries: self.entries.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    #[serde(rename = "hitCount")]
    pub hit_count: u64,
    #[serde(rename = "missCount")]
    pub miss_count: u64,
    #[serde(rename = "hitRate")]
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_unordered() {
        assert_eq!(
            PairKey::new(ArchetypeCode::Srmc, ArchetypeCode::Laef),
            PairKey::new(ArchetypeCode::Laef, ArchetypeCode::Srmc)
        );
    }

    #[tokio::test]
    async fn test_score_is_cached_across_orderings() {
        let cache = CompatibilityCache::new(Matcher::default(), 100, 60);

        let first = cache.score(ArchetypeCode::Laef, ArchetypeCode::Lamf).await;
        let second = cache.score(ArchetypeCode::Lamf, ArchetypeCode::Laef).await;

        assert_eq!(first, second);
        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }
}
