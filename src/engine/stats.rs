use serde::{Deserialize, Serialize};

use crate::engine::graph::CurriculumGraph;
use crate::engine::types::{ChapterState, EdgeType};
use crate::engine::unlock::UnlockReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTypeCounts {
    pub linear: usize,
    pub alternative: usize,
    pub reinforcement: usize,
}

/// Shape consumed directly by the curriculum map view. Field names are part
/// of the public contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumMapStats {
    pub total_chapters: usize,
    pub completed_chapters: usize,
    pub unlocked_chapters: usize,
    pub average_score: f64,
    pub path_type_counts: PathTypeCounts,
}

pub fn curriculum_map_stats(graph: &CurriculumGraph, report: &UnlockReport) -> CurriculumMapStats {
    let chapters = &report.chapters;
    let count_state = |state: ChapterState| chapters.values().filter(|e| e.state == state).count();

    let attempted: Vec<f64> = chapters
        .values()
        .filter(|e| e.attempts > 0)
        .map(|e| e.best_score)
        .collect();
    let average_score = if attempted.is_empty() {
        0.0
    } else {
        let mean = attempted.iter().sum::<f64>() / attempted.len() as f64;
        (mean * 100.0).round() / 100.0
    };

    let authored = |edge: EdgeType| {
        graph
            .chapters_in(&report.curriculum_id)
            .flat_map(|c| c.prerequisites.iter())
            .filter(|p| p.edge == edge)
            .count()
    };

    CurriculumMapStats {
        total_chapters: chapters.len(),
        completed_chapters: count_state(ChapterState::Completed),
        unlocked_chapters: count_state(ChapterState::Unlocked),
        average_score,
        path_type_counts: PathTypeCounts {
            linear: authored(EdgeType::Linear),
            alternative: authored(EdgeType::Alternative),
            reinforcement: report.reinforcement.len(),
        },
    }
}
