use axum::http::StatusCode;
use serde_json::json;

mod common;

const MATH: &str = "/api/progression/students/demo-student/curricula/math-3";

#[tokio::test]
async fn test_health_root() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["curricula"], 2);
    assert_eq!(body["students"], 2);
}

#[tokio::test]
async fn test_health_live() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, "/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_info() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, "/health/info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "curriculum-progression");
}

#[tokio::test]
async fn test_unlock_states_for_demo_student() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, &format!("{MATH}/unlocks")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let states = &body["data"]["states"];
    assert_eq!(states["math-3-sumas"], "completed");
    assert_eq!(states["math-3-restas"], "completed");
    assert_eq!(states["math-3-fracciones"], "unlocked");
    assert_eq!(states["math-3-fracciones-repaso"], "unlocked");
    assert_eq!(states["math-3-retos"], "locked");
    assert_eq!(states["math-3-medidas"], "locked");
    assert_eq!(body["data"]["reinforcement"][0]["concept"], "fracciones");
}

#[tokio::test]
async fn test_recommended_path_puts_reinforcement_first() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, &format!("{MATH}/path?limit=5")).await;

    assert_eq!(status, StatusCode::OK);
    let path = body["data"].as_array().unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path[0]["chapterId"], "math-3-fracciones-repaso");
    assert_eq!(path[0]["priority"], 1);
    assert_eq!(path[1]["chapterId"], "math-3-fracciones");
    assert_eq!(path[1]["priority"], 2);
}

#[tokio::test]
async fn test_path_limit_truncates() {
    let app = common::create_test_app();
    let (_, body) = common::get_json(&app, &format!("{MATH}/path?limit=1")).await;

    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_curriculum_map_stats_shape() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, &format!("{MATH}/stats")).await;

    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["totalChapters"], 6);
    assert_eq!(stats["completedChapters"], 2);
    assert_eq!(stats["unlockedChapters"], 2);
    assert_eq!(stats["averageScore"], 75.0);
    assert_eq!(
        stats["pathTypeCounts"],
        json!({ "linear": 3, "alternative": 1, "reinforcement": 1 })
    );
}

#[tokio::test]
async fn test_difficulty_is_lowered_for_weak_concept() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(
        &app,
        "/api/progression/students/demo-student/difficulty?subject=math&concept=fracciones",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value = body["data"]["value"].as_f64().unwrap();
    assert!((0.1..0.5).contains(&value), "{value}");
}

#[tokio::test]
async fn test_cross_subject_advice_targets_math() {
    let app = common::create_test_app();
    let (status, body) =
        common::get_json(&app, "/api/progression/students/demo-student/cross-subject").await;

    assert_eq!(status, StatusCode::OK);
    let advice = body["data"].as_array().unwrap();
    assert_eq!(advice.len(), 1);
    assert_eq!(advice[0]["weakSubject"], "math");
    let suggestions = advice[0]["suggestions"].as_array().unwrap();
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().all(|s| s["subject"] == "science"));
    assert!(suggestions.iter().all(|s| s["priority"] == "medium"));
}

#[tokio::test]
async fn test_mastery_window_filters_subject() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(
        &app,
        "/api/progression/students/demo-student/mastery?subject=science&lastAttempts=1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let map = body["data"].as_object().unwrap();
    assert!(map.keys().all(|k| k.starts_with("science")));
    assert_eq!(map["science"]["attemptsCount"], 1);
}

#[tokio::test]
async fn test_chapter_result_unlocks_successor() {
    let app = common::create_test_app();
    let uri = "/api/progression/students/new-student/curricula/math-3/unlocks";

    let (_, before) = common::get_json(&app, uri).await;
    assert_eq!(before["data"]["states"]["math-3-restas"], "locked");

    let (status, body) = common::post_json(
        &app,
        "/api/progression/students/new-student/chapters/math-3-sumas/results",
        json!({ "score": 78.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "completed");

    let (_, after) = common::get_json(&app, uri).await;
    assert_eq!(after["data"]["states"]["math-3-restas"], "unlocked");
}

#[tokio::test]
async fn test_attempt_is_recorded() {
    let app = common::create_test_app();
    let (status, _) = common::post_json(
        &app,
        "/api/progression/students/new-student/attempts",
        json!({ "subject": "math", "concept": "sumas", "score": 64.0, "timeSpentSeconds": 120 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) =
        common::get_json(&app, "/api/progression/students/new-student/mastery").await;
    assert_eq!(body["data"]["math|sumas"]["averageScore"], 64.0);
}

#[tokio::test]
async fn test_out_of_range_score_is_rejected() {
    let app = common::create_test_app();
    let (status, body) = common::post_json(
        &app,
        "/api/progression/students/new-student/chapters/math-3-sumas/results",
        json!({ "score": 140.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_result_for_locked_chapter_is_rejected() {
    let app = common::create_test_app();
    let (status, body) = common::post_json(
        &app,
        "/api/progression/students/new-student/chapters/math-3-fracciones/results",
        json!({ "score": 90.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, after) =
        common::get_json(&app, "/api/progression/students/new-student/curricula/math-3/unlocks").await;
    assert_eq!(after["data"]["states"]["math-3-fracciones"], "locked");
}

#[tokio::test]
async fn test_batch_path_reports_each_student() {
    let app = common::create_test_app();
    let (status, body) = common::post_json(
        &app,
        "/api/progression/batch/path",
        json!({ "studentIds": ["demo-student", "ghost"], "curriculumId": "math-3", "limit": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["studentId"], "demo-student");
    assert!(results[0]["recommendations"].is_array());
    assert!(results[1]["error"].is_string());
}

#[tokio::test]
async fn test_unknown_student_is_404() {
    let app = common::create_test_app();
    let (status, body) =
        common::get_json(&app, "/api/progression/students/ghost/cross-subject").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_curriculum_is_404() {
    let app = common::create_test_app();
    let (status, _) = common::get_json(
        &app,
        "/api/progression/students/demo-student/curricula/history-9/path",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_404_not_found() {
    let app = common::create_test_app();
    let (status, body) = common::get_json(&app, "/nonexistent/path").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
