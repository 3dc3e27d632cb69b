use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::{keys, MemoryCache};
use crate::engine::cross_subject::CrossSubjectAdvice;
use crate::engine::difficulty::DifficultyDecision;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::mastery::MasteryWindow;
use crate::engine::stats::CurriculumMapStats;
use crate::engine::types::{
    AttemptRecord, ChapterId, ChapterProgress, ChapterState, MasteryMap, Recommendation,
};
use crate::engine::unlock::UnlockReport;
use crate::engine::{EngineConfig, ProgressionEngine, StudentSnapshot};
use crate::store::{validate_score, ProgressStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPathResult {
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<Recommendation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request-facing entry point. Fetches a snapshot from the store, runs the
/// pure engine pass, and caches derived values per student.
///
/// Every write bumps the student's generation. A value computed under an
/// older generation is returned to its caller but never cached.
pub struct ProgressionService {
    store: Arc<dyn ProgressStore>,
    engine: ProgressionEngine,
    cache: MemoryCache,
    generations: RwLock<HashMap<String, u64>>,
}

impl ProgressionService {
    pub fn new(store: Arc<dyn ProgressStore>, config: EngineConfig) -> Self {
        Self {
            store,
            engine: ProgressionEngine::new(config),
            cache: MemoryCache::new(),
            generations: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> Arc<dyn ProgressStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config().cache_ttl_secs)
    }

    fn snapshot(&self, student_id: &str, curriculum_id: Option<&str>) -> EngineResult<StudentSnapshot> {
        require_id("studentId", student_id)?;
        let profile = self.store.get_student(student_id)?;
        let attempts = self.store.get_attempts(student_id, None, None)?;
        let progress = self.store.get_chapter_progress(student_id, curriculum_id)?;
        Ok(StudentSnapshot {
            profile,
            attempts,
            progress,
        })
    }

    pub fn compute_mastery(&self, student_id: &str, window: &MasteryWindow) -> EngineResult<MasteryMap> {
        require_id("studentId", student_id)?;
        let key = keys::mastery_key(student_id, window.subject.as_deref(), &window.period_label());
        self.cached(student_id, &key, || {
            let profile = self.store.get_student(student_id)?;
            let attempts = self
                .store
                .get_attempts(student_id, window.subject.as_deref(), window.since)?;
            let snapshot = StudentSnapshot {
                profile,
                attempts,
                progress: Vec::new(),
            };
            Ok(self.engine.mastery(&snapshot, window))
        })
    }

    pub fn compute_difficulty(
        &self,
        student_id: &str,
        subject: &str,
        concept: &str,
    ) -> EngineResult<DifficultyDecision> {
        require_id("subject", subject)?;
        require_id("concept", concept)?;
        let key = keys::difficulty_key(student_id, subject, concept);
        self.cached(student_id, &key, || {
            let snapshot = self.snapshot(student_id, None)?;
            let decision = self.engine.difficulty(&snapshot, subject, concept);
            tracing::debug!(
                student = %student_id,
                subject = %subject,
                concept = %concept,
                difficulty = decision.value,
                "difficulty computed"
            );
            Ok(decision)
        })
    }

    pub fn compute_unlock_report(&self, student_id: &str, curriculum_id: &str) -> EngineResult<UnlockReport> {
        require_id("curriculumId", curriculum_id)?;
        let key = keys::unlocks_key(student_id, curriculum_id);
        self.cached(student_id, &key, || {
            let graph = self.store.get_curriculum_graph(curriculum_id)?;
            let snapshot = self.snapshot(student_id, Some(curriculum_id))?;
            Ok(self.engine.unlock_states(&graph, curriculum_id, &snapshot))
        })
    }

    pub fn compute_unlock_states(
        &self,
        student_id: &str,
        curriculum_id: &str,
    ) -> EngineResult<BTreeMap<ChapterId, ChapterState>> {
        Ok(self.compute_unlock_report(student_id, curriculum_id)?.states())
    }

    pub fn compute_recommended_path(
        &self,
        student_id: &str,
        curriculum_id: &str,
        limit: usize,
    ) -> EngineResult<Vec<Recommendation>> {
        require_id("curriculumId", curriculum_id)?;
        let key = keys::path_key(student_id, curriculum_id, limit);
        self.cached(student_id, &key, || {
            let graph = self.store.get_curriculum_graph(curriculum_id)?;
            let snapshot = self.snapshot(student_id, Some(curriculum_id))?;
            let path = self.engine.recommended_path(&graph, curriculum_id, &snapshot, limit);
            tracing::debug!(
                student = %student_id,
                curriculum = %curriculum_id,
                recommendations = path.len(),
                "recommended path computed"
            );
            Ok(path)
        })
    }

    pub fn compute_cross_subject_advice(&self, student_id: &str) -> EngineResult<Vec<CrossSubjectAdvice>> {
        let key = keys::cross_subject_key(student_id);
        self.cached(student_id, &key, || {
            let snapshot = self.snapshot(student_id, None)?;
            Ok(self.engine.cross_subject_advice(&self.store.catalog(), &snapshot))
        })
    }

    pub fn get_curriculum_map_stats(
        &self,
        student_id: &str,
        curriculum_id: &str,
    ) -> EngineResult<CurriculumMapStats> {
        require_id("curriculumId", curriculum_id)?;
        let key = keys::map_stats_key(student_id, curriculum_id);
        self.cached(student_id, &key, || {
            let graph = self.store.get_curriculum_graph(curriculum_id)?;
            let snapshot = self.snapshot(student_id, Some(curriculum_id))?;
            Ok(self.engine.map_stats(&graph, curriculum_id, &snapshot))
        })
    }

    /// Requests for different students share nothing mutable, so the batch
    /// fans out across the rayon pool.
    pub fn compute_recommended_paths_batch(
        &self,
        student_ids: &[String],
        curriculum_id: &str,
        limit: usize,
    ) -> Vec<BatchPathResult> {
        student_ids
            .par_iter()
            .map(|student_id| match self.compute_recommended_path(student_id, curriculum_id, limit) {
                Ok(recommendations) => BatchPathResult {
                    student_id: student_id.clone(),
                    recommendations: Some(recommendations),
                    error: None,
                },
                Err(err) => BatchPathResult {
                    student_id: student_id.clone(),
                    recommendations: None,
                    error: Some(err.to_string()),
                },
            })
            .collect()
    }

    pub fn record_attempt(&self, attempt: AttemptRecord) -> EngineResult<()> {
        require_id("studentId", &attempt.student_id)?;
        require_id("subject", &attempt.subject)?;
        require_id("concept", &attempt.concept)?;
        let student_id = attempt.student_id.clone();
        self.store.append_attempt(attempt)?;
        self.invalidate(&student_id);
        Ok(())
    }

    pub fn record_chapter_result(
        &self,
        student_id: &str,
        chapter_id: &str,
        score: f64,
    ) -> EngineResult<ChapterProgress> {
        require_id("studentId", student_id)?;
        validate_score(score)?;

        let curriculum_id = self
            .store
            .catalog()
            .chapter(chapter_id)
            .map(|c| c.curriculum_id.clone())
            .ok_or_else(|| EngineError::UnknownChapter(chapter_id.to_string()))?;
        let report = self.compute_unlock_report(student_id, &curriculum_id)?;
        if report.state_of(chapter_id) == Some(ChapterState::Locked) {
            tracing::debug!(
                student = %student_id,
                chapter = %chapter_id,
                "result rejected for locked chapter"
            );
            return Err(EngineError::InvalidInput(format!(
                "chapter {chapter_id} is locked for student {student_id}"
            )));
        }

        let progress = self
            .store
            .record_chapter_result(student_id, chapter_id, score, self.config())?;
        self.invalidate(student_id);
        Ok(progress)
    }

    pub fn invalidate(&self, student_id: &str) {
        let mut generations = self.generations.write();
        *generations.entry(student_id.to_string()).or_insert(0) += 1;
        let removed = self.cache.delete_prefix(&keys::student_prefix(student_id));
        tracing::trace!(student = %student_id, removed, "derived cache invalidated");
    }

    fn generation(&self, student_id: &str) -> u64 {
        self.generations.read().get(student_id).copied().unwrap_or(0)
    }

    fn cached<T, F>(&self, student_id: &str, key: &str, compute: F) -> EngineResult<T>
    where
        T: Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> EngineResult<T>,
    {
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }

        let generation = self.generation(student_id);
        let value = compute()?;

        // Held across the check and the write so `invalidate` cannot interleave.
        let generations = self.generations.read();
        if generations.get(student_id).copied().unwrap_or(0) == generation {
            self.cache.set(key, &value, self.ttl());
        } else {
            tracing::trace!(student = %student_id, key, "stale result not cached");
        }
        Ok(value)
    }
}

fn require_id(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
