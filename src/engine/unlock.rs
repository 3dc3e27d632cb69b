//! Computes the lock state of every chapter of a curriculum for one student.
//!
//! `Completed` is terminal and `bestScore` never decreases. A chapter the
//! student already entered stays at least `Unlocked`, except remedial
//! chapters: those close again once no reinforcement trigger is active.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::graph::CurriculumGraph;
use crate::engine::mastery::concept_mastery;
use crate::engine::types::{
    Chapter, ChapterId, ChapterProgress, ChapterState, EdgeType, MasteryMap,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterEvaluation {
    pub chapter_id: ChapterId,
    pub state: ChapterState,
    pub best_score: f64,
    pub attempts: u32,
    /// Edge kinds that currently open this chapter. Empty only when locked.
    pub unlocked_via: BTreeSet<EdgeType>,
}

/// A synthesized reinforcement path: low mastery in `concept` opens the
/// remedial chapter, virtually linked from every chapter carrying the concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinforcementTrigger {
    pub concept: String,
    pub remedial_chapter_id: ChapterId,
    pub average_score: f64,
    pub attempts_count: usize,
    pub sources: Vec<ChapterId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockReport {
    pub curriculum_id: String,
    pub chapters: BTreeMap<ChapterId, ChapterEvaluation>,
    pub reinforcement: Vec<ReinforcementTrigger>,
}

impl UnlockReport {
    pub fn state_of(&self, chapter_id: &str) -> Option<ChapterState> {
        self.chapters.get(chapter_id).map(|e| e.state)
    }

    pub fn states(&self) -> BTreeMap<ChapterId, ChapterState> {
        self.chapters
            .iter()
            .map(|(id, e)| (id.clone(), e.state))
            .collect()
    }

    pub fn frontier(&self) -> impl Iterator<Item = &ChapterEvaluation> {
        self.chapters
            .values()
            .filter(|e| e.state == ChapterState::Unlocked)
    }

    pub fn trigger_for(&self, chapter_id: &str) -> Option<&ReinforcementTrigger> {
        self.reinforcement
            .iter()
            .find(|t| t.remedial_chapter_id == chapter_id)
    }
}

pub struct UnlockEvaluator<'a> {
    graph: &'a CurriculumGraph,
    config: &'a EngineConfig,
}

impl<'a> UnlockEvaluator<'a> {
    pub fn new(graph: &'a CurriculumGraph, config: &'a EngineConfig) -> Self {
        Self { graph, config }
    }

    pub fn evaluate(
        &self,
        curriculum_id: &str,
        progress: &[ChapterProgress],
        mastery: &MasteryMap,
    ) -> UnlockReport {
        let stored: HashMap<&str, &ChapterProgress> = progress
            .iter()
            .map(|p| (p.chapter_id.as_str(), p))
            .collect();

        let reinforcement = self.reinforcement_triggers(curriculum_id, mastery);
        let reinforced: BTreeSet<&str> = reinforcement
            .iter()
            .map(|t| t.remedial_chapter_id.as_str())
            .collect();

        let mut chapters = BTreeMap::new();
        for chapter in self.graph.chapters_in(curriculum_id) {
            let record = stored.get(chapter.id.as_str()).copied();
            let best_score = record.map_or(0.0, |p| p.best_score);
            let attempts = record.map_or(0, |p| p.attempts);
            let stored_state = record.map_or(ChapterState::Locked, |p| p.state);

            let mut unlocked_via = self.open_paths(chapter, &stored);
            if reinforced.contains(chapter.id.as_str()) {
                unlocked_via.insert(EdgeType::Reinforcement);
            }

            let entered = stored_state != ChapterState::Locked || attempts > 0;
            if unlocked_via.is_empty() && entered && !chapter.is_remedial() {
                unlocked_via.insert(authored_path(chapter));
            }

            let state = if stored_state == ChapterState::Completed {
                ChapterState::Completed
            } else if unlocked_via.is_empty() {
                ChapterState::Locked
            } else {
                ChapterState::Unlocked
            };

            chapters.insert(
                chapter.id.clone(),
                ChapterEvaluation {
                    chapter_id: chapter.id.clone(),
                    state,
                    best_score,
                    attempts,
                    unlocked_via,
                },
            );
        }

        UnlockReport {
            curriculum_id: curriculum_id.to_string(),
            chapters,
            reinforcement,
        }
    }

    fn open_paths(
        &self,
        chapter: &Chapter,
        stored: &HashMap<&str, &ChapterProgress>,
    ) -> BTreeSet<EdgeType> {
        let mut via = BTreeSet::new();

        if chapter.prerequisites.is_empty() {
            if !chapter.is_remedial() {
                via.insert(EdgeType::Linear);
            }
            return via;
        }

        let mut linear = chapter
            .prerequisites
            .iter()
            .filter(|p| p.edge == EdgeType::Linear)
            .peekable();
        if linear.peek().is_some()
            && linear.all(|p| {
                stored.get(p.chapter_id.as_str()).is_some_and(|rec| {
                    rec.state == ChapterState::Completed
                        && rec.best_score >= self.config.passing_threshold
                })
            })
        {
            via.insert(EdgeType::Linear);
        }

        let bonus = chapter
            .prerequisites
            .iter()
            .filter(|p| p.edge == EdgeType::Alternative)
            .any(|p| {
                stored
                    .get(p.chapter_id.as_str())
                    .is_some_and(|rec| rec.best_score >= self.config.bonus_threshold)
            });
        if bonus {
            via.insert(EdgeType::Alternative);
        }

        via
    }

    fn reinforcement_triggers(
        &self,
        curriculum_id: &str,
        mastery: &MasteryMap,
    ) -> Vec<ReinforcementTrigger> {
        let mut triggers = Vec::new();

        for remedial in self.graph.chapters_in(curriculum_id) {
            let Some(concept) = remedial.remedial_for.as_deref() else {
                continue;
            };
            let Some(score) = concept_mastery(mastery, &remedial.subject, concept) else {
                continue;
            };
            if !needs_reinforcement(score.attempts_count, score.average_score, self.config) {
                continue;
            }

            let sources = self
                .graph
                .chapters_in(curriculum_id)
                .filter(|c| !c.is_remedial() && c.concept_tags.contains(concept))
                .map(|c| c.id.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            triggers.push(ReinforcementTrigger {
                concept: concept.to_string(),
                remedial_chapter_id: remedial.id.clone(),
                average_score: score.average_score,
                attempts_count: score.attempts_count,
                sources,
            });
        }

        triggers.sort_by(|a, b| a.remedial_chapter_id.cmp(&b.remedial_chapter_id));
        triggers
    }
}

pub fn needs_reinforcement(attempts: usize, average: f64, config: &EngineConfig) -> bool {
    attempts >= config.reinforcement_min_attempts && average < config.reinforcement_threshold
}

/// Path kind implied by how a non-remedial chapter is authored, used for
/// chapters the student entered earlier whose gate is no longer open.
fn authored_path(chapter: &Chapter) -> EdgeType {
    if chapter.prerequisites.is_empty()
        || chapter.prerequisites.iter().any(|p| p.edge == EdgeType::Linear)
    {
        EdgeType::Linear
    } else {
        EdgeType::Alternative
    }
}

/// Write-path rule for a finished chapter attempt.
pub fn record_chapter_result(
    previous: Option<&ChapterProgress>,
    student_id: &str,
    chapter_id: &str,
    score: f64,
    config: &EngineConfig,
) -> ChapterProgress {
    let best_score = previous.map_or(score, |p| p.best_score.max(score));
    let attempts = previous.map_or(0, |p| p.attempts).saturating_add(1);
    let already_completed = previous.is_some_and(|p| p.state == ChapterState::Completed);

    let state = if already_completed || score >= config.passing_threshold {
        ChapterState::Completed
    } else {
        ChapterState::Unlocked
    };

    ChapterProgress {
        student_id: student_id.to_string(),
        chapter_id: chapter_id.to_string(),
        state,
        best_score,
        attempts,
    }
}
