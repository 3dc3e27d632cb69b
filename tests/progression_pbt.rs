//! Property-based tests for the progression engine
//!
//! Invariants covered:
//! - Completed is terminal and bestScore never decreases
//! - Recommended paths are ordered by (priority, chapter id)
//! - Difficulty always lands inside the configured bounds
//! - Mastery averages stay within the range of the underlying scores

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use curriculum_progression::engine::difficulty::DifficultyAdapter;
use curriculum_progression::engine::mastery::{MasterySummarizer, MasteryWindow};
use curriculum_progression::engine::unlock::record_chapter_result;
use curriculum_progression::engine::{
    AttemptRecord, Chapter, ChapterProgress, ChapterState, CurriculumGraph, EdgeType,
    EngineConfig, MasteryKey, MasteryScore, Pace, Prerequisite, ProgressionEngine, StudentProfile,
    StudentSnapshot, Trend,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_score() -> impl Strategy<Value = f64> {
    (0u32..=1000u32).prop_map(|v| v as f64 / 10.0)
}

fn arb_pace() -> impl Strategy<Value = Pace> {
    prop_oneof![Just(Pace::Slow), Just(Pace::Medium), Just(Pace::Fast)]
}

/// Chapters `c0..cN`; each may depend on earlier chapters only, so the
/// result is always acyclic. The last chapter is remedial for "shared".
fn arb_curriculum() -> impl Strategy<Value = Vec<Chapter>> {
    prop::collection::vec(
        (
            prop::collection::vec((0usize..16, any::<bool>()), 0..3),
            any::<bool>(),
        ),
        1..10,
    )
    .prop_map(|layout| {
        let count = layout.len();
        let mut chapters: Vec<Chapter> = layout
            .into_iter()
            .enumerate()
            .map(|(i, (edges, tagged))| {
                let mut seen = BTreeSet::new();
                let prerequisites = if i == 0 {
                    Vec::new()
                } else {
                    edges
                        .into_iter()
                        .filter_map(|(target, linear)| {
                            let id = format!("c{}", target % i);
                            seen.insert(id.clone()).then(|| Prerequisite {
                                chapter_id: id,
                                edge: if linear { EdgeType::Linear } else { EdgeType::Alternative },
                            })
                        })
                        .collect()
                };
                let mut tags = BTreeSet::from([format!("t{i}")]);
                if tagged {
                    tags.insert("shared".to_string());
                }
                chapter(format!("c{i}"), tags, prerequisites, None)
            })
            .collect();
        chapters.push(chapter(
            format!("c{count}"),
            BTreeSet::from(["shared".to_string()]),
            Vec::new(),
            Some("shared".to_string()),
        ));
        chapters
    })
}

fn chapter(
    id: String,
    concept_tags: BTreeSet<String>,
    prerequisites: Vec<Prerequisite>,
    remedial_for: Option<String>,
) -> Chapter {
    Chapter {
        id,
        curriculum_id: "m".to_string(),
        subject: "math".to_string(),
        title: None,
        concept_tags,
        difficulty_tier: 2,
        prerequisites,
        remedial_for,
    }
}

fn attempt(concept: &str, score: f64, hour: i64) -> AttemptRecord {
    AttemptRecord {
        student_id: "s1".to_string(),
        subject: "math".to_string(),
        concept: concept.to_string(),
        score,
        time_spent_seconds: 60,
        completed_at: DateTime::<Utc>::from_timestamp(1_700_000_000 + hour * 3600, 0).unwrap(),
    }
}

fn fold_results(chapter_id: &str, scores: &[f64], config: &EngineConfig) -> Vec<ChapterProgress> {
    let mut history: Vec<ChapterProgress> = Vec::new();
    for score in scores {
        let next = record_chapter_result(history.last(), "s1", chapter_id, *score, config);
        history.push(next);
    }
    history
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_completed_is_terminal(scores in prop::collection::vec(arb_score(), 1..20)) {
        let config = EngineConfig::default();
        let history = fold_results("c0", &scores, &config);

        let mut completed = false;
        let mut best = f64::MIN;
        for (progress, score) in history.iter().zip(&scores) {
            if completed {
                prop_assert_eq!(progress.state, ChapterState::Completed);
            }
            completed |= progress.state == ChapterState::Completed;
            prop_assert!(progress.best_score >= best);
            prop_assert!(progress.best_score >= *score);
            best = progress.best_score;
        }
        prop_assert_eq!(history.last().map(|p| p.attempts), Some(scores.len() as u32));
    }

    #[test]
    fn prop_path_is_sorted_by_priority_then_id(
        chapters in arb_curriculum(),
        results in prop::collection::vec(proptest::option::of(arb_score()), 10),
        shared_scores in prop::collection::vec(arb_score(), 0..4),
        limit in 1usize..12,
    ) {
        let config = EngineConfig::default();
        let progress: Vec<ChapterProgress> = chapters
            .iter()
            .zip(&results)
            .filter_map(|(c, r)| r.map(|score| record_chapter_result(None, "s1", &c.id, score, &config)))
            .collect();
        let attempts = shared_scores
            .iter()
            .enumerate()
            .map(|(i, s)| attempt("shared", *s, i as i64))
            .collect();
        let graph = CurriculumGraph::build(chapters).unwrap();
        let snapshot = StudentSnapshot {
            profile: StudentProfile::new("s1", Pace::Medium),
            attempts,
            progress,
        };
        let engine = ProgressionEngine::new(config);

        let path = engine.recommended_path(&graph, "m", &snapshot, limit);
        prop_assert!(path.len() <= limit);
        for pair in path.windows(2) {
            let a = (pair[0].priority, &pair[0].chapter_id);
            let b = (pair[1].priority, &pair[1].chapter_id);
            prop_assert!(a < b, "{:?} !< {:?}", a, b);
        }

        let report = engine.unlock_states(&graph, "m", &snapshot);
        for rec in &path {
            prop_assert_eq!(report.state_of(&rec.chapter_id), Some(ChapterState::Unlocked));
        }

        let again = engine.recommended_path(&graph, "m", &snapshot.clone(), limit);
        prop_assert_eq!(path, again);
    }

    #[test]
    fn prop_difficulty_stays_in_bounds(
        pace in arb_pace(),
        average in proptest::option::of(arb_score()),
        listed_weak in any::<bool>(),
    ) {
        let mastery = average.map(|average_score| MasteryScore {
            student_id: "s1".to_string(),
            key: MasteryKey::concept("math", "fracciones"),
            average_score,
            attempts_count: 3,
            trend: Trend::Stable,
            last_attempt_at: None,
        });
        let mut weak = BTreeSet::new();
        if listed_weak {
            weak.insert("fracciones".to_string());
        }

        let decision = DifficultyAdapter::default().decide(
            pace,
            "fracciones",
            mastery.as_ref(),
            &BTreeSet::new(),
            &weak,
        );
        prop_assert!((0.1..=1.0).contains(&decision.value), "{}", decision.value);
    }

    #[test]
    fn prop_mastery_average_is_bounded_by_scores(scores in prop::collection::vec(arb_score(), 1..15)) {
        let attempts: Vec<AttemptRecord> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| attempt("fracciones", *s, i as i64))
            .collect();
        let map = MasterySummarizer::new(&EngineConfig::default())
            .summarize("s1", &attempts, &MasteryWindow::all_time());

        let score = &map[&MasteryKey::concept("math", "fracciones")];
        let min = scores.iter().cloned().fold(f64::MAX, f64::min);
        let max = scores.iter().cloned().fold(f64::MIN, f64::max);
        prop_assert_eq!(score.attempts_count, scores.len());
        prop_assert!(score.average_score >= min - 1e-9 && score.average_score <= max + 1e-9);
    }
}
