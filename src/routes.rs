use axum::{
    extract::{FromRequest, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::path::PathBuf;
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::{engine::ProgressionEngine, error::EngineError, models::*};

type ApiResult<T> = Result<T, EngineError>;

/// `Json` whose rejections answer with the engine's 400 body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(EngineError))]
struct ApiJson<T>(T);

pub fn router(engine: ProgressionEngine, data_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        // progress
        .route("/api/users/:user_id/courses/:course_id/progress", get(get_progress))
        .route(
            "/api/users/:user_id/courses/:course_id/lessons/:lesson_id/progress",
            post(report_playback),
        )
        .route(
            "/api/users/:user_id/courses/:course_id/lessons/:lesson_id/quizzes/:quiz_id/submit",
            post(submit_quiz),
        )
        // gating + completion
        .route(
            "/api/users/:user_id/courses/:course_id/lessons/:lesson_id/access",
            get(lesson_access),
        )
        .route("/api/users/:user_id/courses/:course_id/unlocked", get(unlocked_lessons))
        .route("/api/users/:user_id/courses/:course_id/completion", get(completion))
        // certificates
        .route(
            "/api/users/:user_id/courses/:course_id/certificate",
            post(issue_certificate),
        )
        .route("/api/users/:user_id/certificates", get(list_certificates))
        .route("/api/certificates/:code/verify", get(verify_certificate))
        // rendered certificate artifacts
        .nest_service("/content", ServeDir::new(data_dir.into()))
        .with_state(engine)
}

async fn get_progress(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ProgressRecord>> {
    Ok(Json(engine.get_progress(&user_id, course_id).await?))
}

async fn report_playback(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id, lesson_id)): Path<(String, Uuid, Uuid)>,
    ApiJson(req): ApiJson<PlaybackReport>,
) -> ApiResult<Json<LessonProgress>> {
    let progress = engine
        .report_playback(&user_id, course_id, lesson_id, req.current_time, req.duration)
        .await?;
    Ok(Json(progress))
}

async fn submit_quiz(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id, lesson_id, quiz_id)): Path<(String, Uuid, Uuid, Uuid)>,
    ApiJson(req): ApiJson<QuizSubmission>,
) -> ApiResult<Json<QuizOutcome>> {
    let outcome = engine
        .submit_quiz(&user_id, course_id, lesson_id, quiz_id, &req.answers)
        .await?;
    Ok(Json(outcome))
}

async fn lesson_access(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id, lesson_id)): Path<(String, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    engine
        .ensure_lesson_access(&user_id, course_id, lesson_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unlocked_lessons(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<UnlockedLessons>> {
    let lessons = engine.unlocked_lessons(&user_id, course_id).await?;
    Ok(Json(UnlockedLessons { lessons }))
}

async fn completion(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<CourseSummary>> {
    Ok(Json(engine.course_summary(&user_id, course_id).await?))
}

async fn issue_certificate(
    State(engine): State<ProgressionEngine>,
    Path((user_id, course_id)): Path<(String, Uuid)>,
) -> ApiResult<(StatusCode, Json<Certificate>)> {
    let (cert, created) = engine.issue_certificate(&user_id, course_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(cert)))
}

async fn list_certificates(
    State(engine): State<ProgressionEngine>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Certificate>>> {
    Ok(Json(engine.certificates_for_user(&user_id).await?))
}

async fn verify_certificate(
    State(engine): State<ProgressionEngine>,
    Path(code): Path<String>,
) -> ApiResult<Json<CertificateVerification>> {
    Ok(Json(engine.verify_certificate(&code).await?))
}
