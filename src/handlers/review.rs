// src/handlers/review.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    engine::lifecycle,
    error::AppError,
    models::attempt::{EvaluateRequest, EvaluateResponse},
    notify::{self, AttemptEvent},
    utils::jwt::Claims,
};

/// Lists all attempts against a test for review.
/// Restricted to staff of the owning organization.
pub async fn list_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let test = lifecycle::load_test(&pool, &slug).await?;

    if !claims.is_staff_of(test.org_id) {
        return Err(AppError::AccessDenied(
            "Only staff of the owning organization may review attempts".to_string(),
        ));
    }

    let attempts = lifecycle::list_attempts(&pool, test.id).await?;
    Ok(Json(attempts))
}

/// Enters the manual portion of an attempt's score.
///
/// Replaces the attempt's entire manual-score mapping; finalizes once
/// every free-response question is covered. Restricted to staff of the
/// owning organization.
pub async fn evaluate(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<EvaluateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();

    for input in req.scores.values() {
        if let Err(validation_errors) = input.validate() {
            return Err(AppError::ValidationFailed(validation_errors.to_string()));
        }
    }

    let attempt = lifecycle::load_attempt(&pool, attempt_id).await?;
    let test = lifecycle::load_test_by_id(&pool, attempt.test_id).await?;

    if !claims.is_staff_of(test.org_id) {
        return Err(AppError::AccessDenied(
            "Only staff of the owning organization may evaluate attempts".to_string(),
        ));
    }

    let questions = lifecycle::load_questions(&pool, test.id).await?;
    let (status, total_score) =
        lifecycle::evaluate(&pool, &attempt, &questions, &claims, req.scores, now).await?;

    if let Some(total) = total_score {
        notify::dispatch(
            &config,
            AttemptEvent {
                event: "attempt.evaluated",
                test_slug: test.slug,
                candidate_email: attempt.candidate_email,
                attempt_id: attempt.id,
                status: status.as_str(),
                total_score: Some(total),
            },
        );
    }

    Ok(Json(EvaluateResponse {
        status,
        total_score,
    }))
}
