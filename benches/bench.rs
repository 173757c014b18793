// Criterion benchmarks for artmate

use artmate::core::{exchange, ArchetypeCode, ExchangeRules, Matcher};
use artmate::models::{MatchFilter, ParticipantProfile};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeSet;

fn create_candidate(id: usize) -> ParticipantProfile {
    ParticipantProfile {
        user_id: format!("user_{}", id),
        nickname: format!("Visitor {}", id),
        archetype: ArchetypeCode::ALL[id % ArchetypeCode::ALL.len()],
        avatar_url: None,
        bio: None,
        contact: None,
    }
}

fn bench_score_all_pairs(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights();

    c.bench_function("score_all_pairs", |b| {
        b.iter(|| {
            let mut total = 0u32;
            for a in ArchetypeCode::ALL {
                for other in ArchetypeCode::ALL {
                    total += matcher.score_codes(black_box(a), black_box(other)).overall_score as u32;
                }
            }
            total
        });
    });
}

fn bench_rank_candidates(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights();
    let filter = MatchFilter {
        allowed_archetypes: BTreeSet::new(),
        min_compatibility: 60,
    };

    let mut group = c.benchmark_group("rank_candidates");

    for candidate_count in [10, 50, 100, 500, 1000].iter() {
        let candidates: Vec<ParticipantProfile> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(candidate_count),
            &candidates,
            |b, candidates| {
                b.iter(|| {
                    matcher.rank_candidates(
                        black_box("host"),
                        black_box(ArchetypeCode::Laef),
                        black_box(&filter),
                        black_box(candidates.clone()),
                        black_box(20),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_exchange_walk(c: &mut Criterion) {
    let rules = ExchangeRules::default();
    let content = "The brushwork feels hurried, like the painter was racing the light itself.";

    c.bench_function("exchange_full_walk", |b| {
        b.iter(|| {
            let now = Utc::now();
            let mut session = exchange::open_session(None, "art_1", "a", "b", now, &rules);
            for _ in 0..3 {
                let _ = exchange::submit_message(&mut session, "a", content, &[], now, &rules);
                let _ = exchange::submit_message(&mut session, "b", content, &[], now, &rules);
                let _ = exchange::advance_phase(&mut session, "a", now, &rules);
            }
            let _ = exchange::skip_final_phase(&mut session, "a", now, &rules);
            let _ = exchange::skip_final_phase(&mut session, "b", now, &rules);
            black_box(session)
        });
    });
}

criterion_group!(benches, bench_score_all_pairs, bench_rank_candidates, bench_exchange_walk);
criterion_main!(benches);
