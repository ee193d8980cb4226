// src/handlers/assessment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    engine::{
        access::{self, Access},
        lifecycle,
    },
    error::AppError,
    models::{
        attempt::{AttemptStatus, OverviewResponse, StartResponse, SubmitRequest},
        question::PublicQuestion,
    },
    notify::{self, AttemptEvent},
    utils::jwt::Claims,
};

/// Candidate-facing summary of an assessment: duration, question count and
/// the caller's attempt standing. Carries no answer content.
pub async fn overview(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let test = lifecycle::load_test(&pool, &slug).await?;
    let assignment = lifecycle::load_assignment(&pool, test.id, &claims.email).await?;

    access::check_access(&claims, &test, assignment.as_ref(), now)?;

    let question_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM test_questions WHERE test_id = ?")
            .bind(test.id)
            .fetch_one(&pool)
            .await?;
    let attempts_used = lifecycle::count_attempts(&pool, test.id, &claims.email).await?;
    let best_score_so_far = lifecycle::best_score(&pool, test.id, &claims.email).await?;

    Ok(Json(OverviewResponse {
        title: test.title.clone(),
        duration_minutes: test.duration_minutes,
        question_count,
        attempts_used,
        attempts_allowed: lifecycle::applicable_ceiling(&test, assignment.as_ref()),
        best_score_so_far,
        attempt_policy: test.attempt_policy,
    }))
}

/// Releases the sanitized question payload. The answer key never leaves
/// the store, for any question type or caller.
pub async fn question_payload(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let test = lifecycle::load_test(&pool, &slug).await?;
    let assignment = lifecycle::load_assignment(&pool, test.id, &claims.email).await?;

    access::check_access(&claims, &test, assignment.as_ref(), now)?;

    let questions = lifecycle::load_questions(&pool, test.id).await?;
    let payload: Vec<PublicQuestion> =
        questions.iter().map(PublicQuestion::from_question).collect();

    Ok(Json(payload))
}

/// Eager protocol: creates the durable in-progress attempt and hands the
/// candidate the sanitized questions in the same response.
pub async fn start(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let test = lifecycle::load_test(&pool, &slug).await?;
    let assignment = lifecycle::load_assignment(&pool, test.id, &claims.email).await?;

    if access::check_access(&claims, &test, assignment.as_ref(), now)? != Access::Candidate {
        return Err(AppError::AccessDenied(
            "Staff access is read-only".to_string(),
        ));
    }

    let questions = lifecycle::load_questions(&pool, test.id).await?;
    let (attempt_id, started_at) =
        lifecycle::start_attempt(&pool, &test, &claims.email, now).await?;

    Ok(Json(StartResponse {
        attempt_id,
        started_at,
        questions: questions.iter().map(PublicQuestion::from_question).collect(),
    }))
}

/// Submits answers, voluntarily or on timer expiry; the lifecycle manager
/// dispatches on the test's attempt policy.
pub async fn submit(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let test = lifecycle::load_test(&pool, &slug).await?;
    let assignment = lifecycle::load_assignment(&pool, test.id, &claims.email).await?;

    if access::check_access(&claims, &test, assignment.as_ref(), now)? != Access::Candidate {
        return Err(AppError::AccessDenied(
            "Staff access is read-only".to_string(),
        ));
    }

    let questions = lifecycle::load_questions(&pool, test.id).await?;
    let response = lifecycle::submit(
        &pool,
        &test,
        &questions,
        &claims,
        assignment.as_ref(),
        req,
        now,
    )
    .await?;

    notify::dispatch(
        &config,
        AttemptEvent {
            event: if response.status == AttemptStatus::Evaluated {
                "attempt.evaluated"
            } else {
                "attempt.submitted"
            },
            test_slug: test.slug,
            candidate_email: claims.email,
            attempt_id: response.attempt_id,
            status: response.status.as_str(),
            total_score: response.total_score,
        },
    );

    Ok(Json(response))
}
