use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::mastery::MasteryWindow;
use crate::engine::types::{AttemptRecord, ChapterId, ChapterState};
use crate::engine::unlock::ReinforcementTrigger;
use crate::response::{ok, AppError};
use crate::state::AppState;

const DEFAULT_PATH_LIMIT: usize = 5;
const MAX_PATH_LIMIT: usize = 50;
const MAX_BATCH_STUDENTS: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/students/:student_id/mastery", get(get_mastery))
        .route("/students/:student_id/difficulty", get(get_difficulty))
        .route("/students/:student_id/cross-subject", get(get_cross_subject))
        .route("/students/:student_id/attempts", post(post_attempt))
        .route(
            "/students/:student_id/chapters/:chapter_id/results",
            post(post_chapter_result),
        )
        .route(
            "/students/:student_id/curricula/:curriculum_id/unlocks",
            get(get_unlocks),
        )
        .route(
            "/students/:student_id/curricula/:curriculum_id/path",
            get(get_path),
        )
        .route(
            "/students/:student_id/curricula/:curriculum_id/stats",
            get(get_stats),
        )
        .route("/batch/path", post(post_batch_path))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MasteryQuery {
    subject: Option<String>,
    last_attempts: Option<usize>,
    since_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DifficultyQuery {
    subject: String,
    concept: String,
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptPayload {
    subject: String,
    concept: String,
    score: f64,
    #[serde(default)]
    time_spent_seconds: u32,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ChapterResultPayload {
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchPathPayload {
    student_ids: Vec<String>,
    curriculum_id: String,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnlockStatesData {
    curriculum_id: String,
    states: BTreeMap<ChapterId, ChapterState>,
    reinforcement: Vec<ReinforcementTrigger>,
}

async fn get_mastery(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(query): Query<MasteryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut window = MasteryWindow {
        subject: query.subject.filter(|s| !s.trim().is_empty()),
        ..MasteryWindow::default()
    };
    if let Some(k) = query.last_attempts {
        if k == 0 {
            return Err(AppError::validation("lastAttempts must be at least 1"));
        }
        window = window.last_attempts(k);
    }
    if let Some(days) = query.since_days {
        if days < 0 {
            return Err(AppError::validation("sinceDays must not be negative"));
        }
        window = window.last_days(days, Utc::now());
    }

    let mastery = state.progression().compute_mastery(&student_id, &window)?;
    Ok(ok(mastery))
}

async fn get_difficulty(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(query): Query<DifficultyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let decision = state
        .progression()
        .compute_difficulty(&student_id, &query.subject, &query.concept)?;
    Ok(ok(decision))
}

async fn get_unlocks(
    State(state): State<AppState>,
    Path((student_id, curriculum_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let report = state
        .progression()
        .compute_unlock_report(&student_id, &curriculum_id)?;
    Ok(ok(UnlockStatesData {
        states: report.states(),
        curriculum_id: report.curriculum_id,
        reinforcement: report.reinforcement,
    }))
}

async fn get_path(
    State(state): State<AppState>,
    Path((student_id, curriculum_id)): Path<(String, String)>,
    Query(query): Query<PathQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = clamp_limit(query.limit);
    let path = state
        .progression()
        .compute_recommended_path(&student_id, &curriculum_id, limit)?;
    Ok(ok(path))
}

async fn get_stats(
    State(state): State<AppState>,
    Path((student_id, curriculum_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .progression()
        .get_curriculum_map_stats(&student_id, &curriculum_id)?;
    Ok(ok(stats))
}

async fn get_cross_subject(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let advice = state.progression().compute_cross_subject_advice(&student_id)?;
    Ok(ok(advice))
}

async fn post_attempt(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(payload): Json<AttemptPayload>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = AttemptRecord {
        student_id,
        subject: payload.subject,
        concept: payload.concept,
        score: payload.score,
        time_spent_seconds: payload.time_spent_seconds,
        completed_at: payload.completed_at.unwrap_or_else(Utc::now),
    };
    state.progression().record_attempt(attempt.clone())?;
    Ok(ok(attempt))
}

async fn post_chapter_result(
    State(state): State<AppState>,
    Path((student_id, chapter_id)): Path<(String, String)>,
    Json(payload): Json<ChapterResultPayload>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state
        .progression()
        .record_chapter_result(&student_id, &chapter_id, payload.score)?;
    Ok(ok(progress))
}

async fn post_batch_path(
    State(state): State<AppState>,
    Json(payload): Json<BatchPathPayload>,
) -> Result<impl IntoResponse, AppError> {
    if payload.student_ids.len() > MAX_BATCH_STUDENTS {
        return Err(AppError::validation(format!(
            "at most {MAX_BATCH_STUDENTS} students per batch"
        )));
    }

    let limit = clamp_limit(payload.limit);
    let service = state.progression();
    let results = tokio::task::spawn_blocking(move || {
        service.compute_recommended_paths_batch(&payload.student_ids, &payload.curriculum_id, limit)
    })
    .await
    .map_err(|err| AppError::internal(format!("batch worker failed: {err}")))?;

    Ok(ok(results))
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PATH_LIMIT).min(MAX_PATH_LIMIT)
}
