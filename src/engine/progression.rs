//! One full pass over an immutable student snapshot. Everything here is pure:
//! identical snapshots produce identical output.

use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::cross_subject::{CrossSubjectAdvice, CrossSubjectAdvisor};
use crate::engine::difficulty::{DifficultyAdapter, DifficultyDecision};
use crate::engine::graph::CurriculumGraph;
use crate::engine::mastery::{concept_mastery, MasterySummarizer, MasteryWindow};
use crate::engine::path::PathRecommender;
use crate::engine::stats::{curriculum_map_stats, CurriculumMapStats};
use crate::engine::types::{
    AttemptRecord, ChapterProgress, MasteryMap, Recommendation, StudentProfile,
};
use crate::engine::unlock::{UnlockEvaluator, UnlockReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSnapshot {
    pub profile: StudentProfile,
    pub attempts: Vec<AttemptRecord>,
    pub progress: Vec<ChapterProgress>,
}

impl StudentSnapshot {
    pub fn student_id(&self) -> &str {
        &self.profile.student_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
    config: EngineConfig,
}

impl ProgressionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mastery(&self, snapshot: &StudentSnapshot, window: &MasteryWindow) -> MasteryMap {
        MasterySummarizer::new(&self.config).summarize(snapshot.student_id(), &snapshot.attempts, window)
    }

    pub fn difficulty(
        &self,
        snapshot: &StudentSnapshot,
        subject: &str,
        concept: &str,
    ) -> DifficultyDecision {
        let mastery = self.mastery(snapshot, &MasteryWindow::for_subject(subject));
        let profile = &snapshot.profile;

        DifficultyAdapter::new(self.config.difficulty.clone()).decide(
            profile.pace,
            concept,
            concept_mastery(&mastery, subject, concept),
            &profile.strong_concepts,
            &profile.weak_concepts,
        )
    }

    pub fn unlock_states(
        &self,
        graph: &CurriculumGraph,
        curriculum_id: &str,
        snapshot: &StudentSnapshot,
    ) -> UnlockReport {
        let mastery = self.mastery(snapshot, &MasteryWindow::all_time());
        UnlockEvaluator::new(graph, &self.config).evaluate(curriculum_id, &snapshot.progress, &mastery)
    }

    pub fn recommended_path(
        &self,
        graph: &CurriculumGraph,
        curriculum_id: &str,
        snapshot: &StudentSnapshot,
        limit: usize,
    ) -> Vec<Recommendation> {
        let report = self.unlock_states(graph, curriculum_id, snapshot);
        PathRecommender::new(graph, self.config.bonus_threshold).recommend(&report, limit)
    }

    pub fn cross_subject_advice(
        &self,
        catalog: &CurriculumGraph,
        snapshot: &StudentSnapshot,
    ) -> Vec<CrossSubjectAdvice> {
        let mastery = self.mastery(snapshot, &MasteryWindow::all_time());
        CrossSubjectAdvisor::new(catalog, &self.config).advise(&mastery)
    }

    pub fn map_stats(
        &self,
        graph: &CurriculumGraph,
        curriculum_id: &str,
        snapshot: &StudentSnapshot,
    ) -> CurriculumMapStats {
        let report = self.unlock_states(graph, curriculum_id, snapshot);
        curriculum_map_stats(graph, &report)
    }
}
