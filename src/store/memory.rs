use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::engine::config::EngineConfig;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::graph::CurriculumGraph;
use crate::engine::types::{AttemptRecord, Chapter, ChapterId, ChapterProgress, StudentProfile};
use crate::engine::unlock;
use crate::store::{validate_score, ProgressSnapshot, ProgressStore, StoreError};

#[derive(Default)]
struct StudentRecords {
    attempts: Vec<AttemptRecord>,
    progress: BTreeMap<ChapterId, ChapterProgress>,
}

/// Process-local stand-in for the external progress store. Writes for all
/// students go through one lock, which serializes appends per student.
pub struct InMemoryStore {
    students: BTreeMap<String, StudentProfile>,
    curricula: BTreeMap<String, Arc<CurriculumGraph>>,
    catalog: Arc<CurriculumGraph>,
    records: RwLock<HashMap<String, StudentRecords>>,
}

impl InMemoryStore {
    pub fn from_snapshot(snapshot: ProgressSnapshot) -> Result<Self, StoreError> {
        let catalog = Arc::new(CurriculumGraph::build(snapshot.chapters.clone())?);

        let mut by_curriculum: BTreeMap<String, Vec<Chapter>> = BTreeMap::new();
        for chapter in snapshot.chapters {
            by_curriculum
                .entry(chapter.curriculum_id.clone())
                .or_default()
                .push(chapter);
        }

        let mut curricula = BTreeMap::new();
        for (curriculum_id, chapters) in by_curriculum {
            let graph = CurriculumGraph::build(chapters).map_err(|err| {
                tracing::error!(curriculum = %curriculum_id, error = %err, "curriculum failed validation");
                err
            })?;
            tracing::debug!(curriculum = %curriculum_id, chapters = graph.len(), "curriculum loaded");
            curricula.insert(curriculum_id, Arc::new(graph));
        }

        let students: BTreeMap<String, StudentProfile> = snapshot
            .students
            .into_iter()
            .map(|s| (s.student_id.clone(), s))
            .collect();

        let mut records: HashMap<String, StudentRecords> = students
            .keys()
            .map(|id| (id.clone(), StudentRecords::default()))
            .collect();

        for attempt in snapshot.attempts {
            validate_score(attempt.score)
                .map_err(|err| StoreError::InvalidRecord(err.to_string()))?;
            let entry = records.get_mut(&attempt.student_id).ok_or_else(|| {
                StoreError::InvalidRecord(format!("attempt for unknown student {}", attempt.student_id))
            })?;
            entry.attempts.push(attempt);
        }

        for progress in snapshot.progress {
            if !catalog.contains(&progress.chapter_id) {
                return Err(StoreError::InvalidRecord(format!(
                    "progress for unknown chapter {}",
                    progress.chapter_id
                )));
            }
            let entry = records.get_mut(&progress.student_id).ok_or_else(|| {
                StoreError::InvalidRecord(format!("progress for unknown student {}", progress.student_id))
            })?;
            entry.progress.insert(progress.chapter_id.clone(), progress);
        }

        tracing::info!(
            curricula = curricula.len(),
            chapters = catalog.len(),
            students = students.len(),
            "progress store loaded"
        );

        Ok(Self {
            students,
            curricula,
            catalog,
            records: RwLock::new(records),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshot: ProgressSnapshot = serde_json::from_str(&raw)?;
        Self::from_snapshot(snapshot)
    }

    fn require_student(&self, student_id: &str) -> EngineResult<&StudentProfile> {
        self.students
            .get(student_id)
            .ok_or_else(|| EngineError::UnknownStudent(student_id.to_string()))
    }
}

impl ProgressStore for InMemoryStore {
    fn get_student(&self, student_id: &str) -> EngineResult<StudentProfile> {
        self.require_student(student_id).cloned()
    }

    fn student_ids(&self) -> Vec<String> {
        self.students.keys().cloned().collect()
    }

    fn get_attempts(
        &self,
        student_id: &str,
        subject: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<AttemptRecord>> {
        self.require_student(student_id)?;
        let records = self.records.read();
        let attempts = records
            .get(student_id)
            .map(|r| {
                r.attempts
                    .iter()
                    .filter(|a| subject.map_or(true, |s| a.subject == s))
                    .filter(|a| since.map_or(true, |t| a.completed_at >= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(attempts)
    }

    fn get_chapter_progress(
        &self,
        student_id: &str,
        curriculum_id: Option<&str>,
    ) -> EngineResult<Vec<ChapterProgress>> {
        self.require_student(student_id)?;
        if let Some(cid) = curriculum_id {
            self.get_curriculum_graph(cid)?;
        }

        let records = self.records.read();
        let progress = records
            .get(student_id)
            .map(|r| {
                r.progress
                    .values()
                    .filter(|p| {
                        curriculum_id.map_or(true, |cid| {
                            self.catalog
                                .chapter(&p.chapter_id)
                                .is_some_and(|c| c.curriculum_id == cid)
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(progress)
    }

    fn get_curriculum_graph(&self, curriculum_id: &str) -> EngineResult<Arc<CurriculumGraph>> {
        self.curricula
            .get(curriculum_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownCurriculum(curriculum_id.to_string()))
    }

    fn catalog(&self) -> Arc<CurriculumGraph> {
        Arc::clone(&self.catalog)
    }

    fn append_attempt(&self, attempt: AttemptRecord) -> EngineResult<()> {
        self.require_student(&attempt.student_id)?;
        validate_score(attempt.score)?;

        let mut records = self.records.write();
        let entry = records.entry(attempt.student_id.clone()).or_default();
        tracing::debug!(
            student = %attempt.student_id,
            subject = %attempt.subject,
            concept = %attempt.concept,
            score = attempt.score,
            "attempt appended"
        );
        entry.attempts.push(attempt);
        Ok(())
    }

    fn record_chapter_result(
        &self,
        student_id: &str,
        chapter_id: &str,
        score: f64,
        config: &EngineConfig,
    ) -> EngineResult<ChapterProgress> {
        self.require_student(student_id)?;
        validate_score(score)?;
        if !self.catalog.contains(chapter_id) {
            return Err(EngineError::UnknownChapter(chapter_id.to_string()));
        }

        let mut records = self.records.write();
        let entry = records.entry(student_id.to_string()).or_default();
        let updated = unlock::record_chapter_result(
            entry.progress.get(chapter_id),
            student_id,
            chapter_id,
            score,
            config,
        );
        entry.progress.insert(chapter_id.to_string(), updated.clone());
        tracing::debug!(
            student = %student_id,
            chapter = %chapter_id,
            score,
            best = updated.best_score,
            state = updated.state.as_str(),
            "chapter result recorded"
        );
        Ok(updated)
    }
}
