//! Seam to the external progress/attempt store. The engine never talks to a
//! database; it only reads snapshots through this trait.

pub mod memory;
pub mod seed;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::config::EngineConfig;
use crate::engine::error::{EngineResult, GraphIntegrityError};
use crate::engine::graph::CurriculumGraph;
use crate::engine::types::{AttemptRecord, Chapter, ChapterProgress, StudentProfile};

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("curriculum rejected: {0}")]
    Graph(#[from] GraphIntegrityError),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Serialized form of everything the store holds, used for seeding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub students: Vec<StudentProfile>,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
    #[serde(default)]
    pub progress: Vec<ChapterProgress>,
}

pub trait ProgressStore: Send + Sync {
    fn get_student(&self, student_id: &str) -> EngineResult<StudentProfile>;

    fn student_ids(&self) -> Vec<String>;

    fn get_attempts(
        &self,
        student_id: &str,
        subject: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<AttemptRecord>>;

    fn get_chapter_progress(
        &self,
        student_id: &str,
        curriculum_id: Option<&str>,
    ) -> EngineResult<Vec<ChapterProgress>>;

    /// Validated once at load, shared for the lifetime of the process.
    fn get_curriculum_graph(&self, curriculum_id: &str) -> EngineResult<Arc<CurriculumGraph>>;

    /// Every loaded curriculum in one graph.
    fn catalog(&self) -> Arc<CurriculumGraph>;

    fn append_attempt(&self, attempt: AttemptRecord) -> EngineResult<()>;

    fn record_chapter_result(
        &self,
        student_id: &str,
        chapter_id: &str,
        score: f64,
        config: &EngineConfig,
    ) -> EngineResult<ChapterProgress>;
}

pub fn validate_score(score: f64) -> EngineResult<f64> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(score)
    } else {
        Err(crate::engine::EngineError::InvalidInput(format!(
            "score {score} outside 0..=100"
        )))
    }
}
