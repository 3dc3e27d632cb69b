//! Built-in demo data served when no snapshot file is configured.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::engine::types::{
    AttemptRecord, Chapter, ChapterProgress, ChapterState, Pace, Prerequisite, StudentProfile,
};
use crate::store::ProgressSnapshot;

pub const DEMO_STUDENT: &str = "demo-student";
pub const NEW_STUDENT: &str = "new-student";
pub const MATH_CURRICULUM: &str = "math-3";
pub const SCIENCE_CURRICULUM: &str = "science-3";

const BASE_TS: i64 = 1_700_000_000;

pub fn demo_snapshot() -> ProgressSnapshot {
    ProgressSnapshot {
        chapters: demo_chapters(),
        students: vec![
            StudentProfile {
                student_id: DEMO_STUDENT.to_string(),
                pace: Pace::Medium,
                strong_concepts: tags(&["sumas"]),
                weak_concepts: tags(&["fracciones"]),
            },
            StudentProfile::new(NEW_STUDENT, Pace::Fast),
        ],
        attempts: demo_attempts(),
        progress: vec![
            completed("math-3-sumas", 80.0),
            completed("math-3-restas", 70.0),
            completed("science-3-plantas", 92.0),
        ],
    }
}

fn demo_chapters() -> Vec<Chapter> {
    vec![
        chapter(MATH_CURRICULUM, "math-3-sumas", "Sumas", &["sumas"], 1, vec![], None),
        chapter(
            MATH_CURRICULUM,
            "math-3-restas",
            "Restas",
            &["restas"],
            2,
            vec![Prerequisite::linear("math-3-sumas")],
            None,
        ),
        chapter(
            MATH_CURRICULUM,
            "math-3-fracciones",
            "Fracciones",
            &["fracciones", "proporciones"],
            3,
            vec![Prerequisite::linear("math-3-restas")],
            None,
        ),
        chapter(
            MATH_CURRICULUM,
            "math-3-retos",
            "Retos de cálculo",
            &["sumas", "restas"],
            4,
            vec![Prerequisite::alternative("math-3-restas")],
            None,
        ),
        chapter(
            MATH_CURRICULUM,
            "math-3-fracciones-repaso",
            "Repaso de fracciones",
            &["fracciones"],
            1,
            vec![],
            Some("fracciones"),
        ),
        chapter(
            MATH_CURRICULUM,
            "math-3-medidas",
            "Medidas",
            &["medidas", "proporciones"],
            3,
            vec![Prerequisite::linear("math-3-fracciones")],
            None,
        ),
        chapter(SCIENCE_CURRICULUM, "science-3-plantas", "Las plantas", &["plantas"], 1, vec![], None),
        chapter(
            SCIENCE_CURRICULUM,
            "science-3-mezclas",
            "Mezclas",
            &["proporciones", "medidas"],
            2,
            vec![Prerequisite::linear("science-3-plantas")],
            None,
        ),
        chapter(
            SCIENCE_CURRICULUM,
            "science-3-laboratorio",
            "Laboratorio",
            &["medidas", "fracciones"],
            4,
            vec![Prerequisite::alternative("science-3-plantas")],
            None,
        ),
    ]
}

fn demo_attempts() -> Vec<AttemptRecord> {
    let math = [
        ("sumas", 85.0),
        ("restas", 72.0),
        ("fracciones", 40.0),
        ("fracciones", 45.0),
        ("fracciones", 50.0),
    ];
    let science = [("plantas", 92.0), ("plantas", 88.0), ("medidas", 81.0)];

    math.iter()
        .map(|(concept, score)| ("math", *concept, *score))
        .chain(science.iter().map(|(concept, score)| ("science", *concept, *score)))
        .enumerate()
        .map(|(i, (subject, concept, score))| AttemptRecord {
            student_id: DEMO_STUDENT.to_string(),
            subject: subject.to_string(),
            concept: concept.to_string(),
            score,
            time_spent_seconds: 240,
            completed_at: at(i as i64 * 3600),
        })
        .collect()
}

fn chapter(
    curriculum_id: &str,
    id: &str,
    title: &str,
    concept_tags: &[&str],
    difficulty_tier: u8,
    prerequisites: Vec<Prerequisite>,
    remedial_for: Option<&str>,
) -> Chapter {
    let subject = curriculum_id.split('-').next().unwrap_or(curriculum_id);
    Chapter {
        id: id.to_string(),
        curriculum_id: curriculum_id.to_string(),
        subject: subject.to_string(),
        title: Some(title.to_string()),
        concept_tags: tags(concept_tags),
        difficulty_tier,
        prerequisites,
        remedial_for: remedial_for.map(str::to_string),
    }
}

fn completed(chapter_id: &str, best_score: f64) -> ChapterProgress {
    ChapterProgress {
        student_id: DEMO_STUDENT.to_string(),
        chapter_id: chapter_id.to_string(),
        state: ChapterState::Completed,
        best_score,
        attempts: 1,
    }
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn at(offset_secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(BASE_TS + offset_secs, 0).unwrap_or_default()
}
