// src/engine/lifecycle.rs

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    engine::{scoring, timer},
    error::AppError,
    models::{
        assignment::CandidateAssignment,
        attempt::{Attempt, AttemptRow, AttemptStatus, ManualScore, SubmitRequest, SubmitResponse},
        question::{QuestionType, TestQuestion, TestQuestionRow},
        test_def::{AttemptPolicy, TestDefinition, TestRow},
    },
    utils::jwt::Claims,
};

/// Loads a test definition by its public slug.
pub async fn load_test(pool: &SqlitePool, slug: &str) -> Result<TestDefinition, AppError> {
    let row = sqlx::query_as::<_, TestRow>(
        r#"
        SELECT id, slug, org_id, title, duration_minutes, max_attempts,
               attempt_policy, allowed_candidates
        FROM tests
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    TestDefinition::from_row(row)
}

/// Loads a test definition by primary key (used when resolving an attempt
/// back to its test).
pub async fn load_test_by_id(pool: &SqlitePool, test_id: i64) -> Result<TestDefinition, AppError> {
    let row = sqlx::query_as::<_, TestRow>(
        r#"
        SELECT id, slug, org_id, title, duration_minutes, max_attempts,
               attempt_policy, allowed_candidates
        FROM tests
        WHERE id = ?
        "#,
    )
    .bind(test_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    TestDefinition::from_row(row)
}

/// Loads the test's questions in order, with per-test point overrides
/// applied. Every question reference must resolve; a dangling reference is
/// a data-integrity failure, not a caller error.
pub async fn load_questions(
    pool: &SqlitePool,
    test_id: i64,
) -> Result<Vec<TestQuestion>, AppError> {
    let rows = sqlx::query_as::<_, TestQuestionRow>(
        r#"
        SELECT q.id, q.type, q.content, q.options, q.answer,
               COALESCE(tq.points, q.points) AS points, tq.position
        FROM test_questions tq
        JOIN questions q ON q.id = tq.question_id
        WHERE tq.test_id = ?
        ORDER BY tq.position
        "#,
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let referenced: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM test_questions WHERE test_id = ?")
            .bind(test_id)
            .fetch_one(pool)
            .await?;

    if referenced != rows.len() as i64 {
        return Err(AppError::Internal(format!(
            "Test {} references questions that do not exist",
            test_id
        )));
    }

    rows.into_iter().map(TestQuestion::from_row).collect()
}

/// Loads the external per-candidate override for this (candidate, test)
/// pair, if one exists.
pub async fn load_assignment(
    pool: &SqlitePool,
    test_id: i64,
    candidate_email: &str,
) -> Result<Option<CandidateAssignment>, AppError> {
    let assignment = sqlx::query_as::<_, CandidateAssignment>(
        r#"
        SELECT id, test_id, candidate_email, valid_from, valid_until,
               max_attempts_override
        FROM assignments
        WHERE test_id = ? AND candidate_email = ?
        "#,
    )
    .bind(test_id)
    .bind(candidate_email)
    .fetch_optional(pool)
    .await?;

    Ok(assignment)
}

/// The attempt ceiling that applies to this candidate: the eager protocol
/// caps at exactly one regardless of configuration; otherwise the
/// assignment override supersedes the test's ceiling.
pub fn applicable_ceiling(
    test: &TestDefinition,
    assignment: Option<&CandidateAssignment>,
) -> i64 {
    match test.attempt_policy {
        AttemptPolicy::Eager => 1,
        AttemptPolicy::DirectLink => assignment
            .and_then(|a| a.max_attempts_override)
            .unwrap_or(test.max_attempts),
    }
}

pub async fn count_attempts(
    pool: &SqlitePool,
    test_id: i64,
    candidate_email: &str,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attempts WHERE test_id = ? AND candidate_email = ?",
    )
    .bind(test_id)
    .bind(candidate_email)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn best_score(
    pool: &SqlitePool,
    test_id: i64,
    candidate_email: &str,
) -> Result<Option<f64>, AppError> {
    let best = sqlx::query_scalar(
        "SELECT MAX(total_score) FROM attempts WHERE test_id = ? AND candidate_email = ?",
    )
    .bind(test_id)
    .bind(candidate_email)
    .fetch_one(pool)
    .await?;
    Ok(best)
}

pub async fn load_attempt(pool: &SqlitePool, attempt_id: i64) -> Result<Attempt, AppError> {
    let row = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT id, test_id, candidate_email, started_at, submitted_at, answers,
               status, auto_score, manual_scores, total_score, evaluated_at,
               evaluated_by
        FROM attempts
        WHERE id = ?
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;

    Attempt::from_row(row)
}

/// All attempts against one test, newest first, for staff review.
pub async fn list_attempts(pool: &SqlitePool, test_id: i64) -> Result<Vec<Attempt>, AppError> {
    let rows = sqlx::query_as::<_, AttemptRow>(
        r#"
        SELECT id, test_id, candidate_email, started_at, submitted_at, answers,
               status, auto_score, manual_scores, total_score, evaluated_at,
               evaluated_by
        FROM attempts
        WHERE test_id = ?
        ORDER BY started_at DESC, id DESC
        "#,
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Attempt::from_row).collect()
}

/// Eager protocol: creates the durable in-progress record.
///
/// Any existing attempt for the pair, whatever its status, blocks a new
/// start; the existence check and the insert are one statement so two
/// racing starts cannot both pass.
pub async fn start_attempt(
    pool: &SqlitePool,
    test: &TestDefinition,
    candidate_email: &str,
    now: DateTime<Utc>,
) -> Result<(i64, DateTime<Utc>), AppError> {
    if test.attempt_policy != AttemptPolicy::Eager {
        return Err(AppError::ValidationFailed(
            "This assessment does not support starting an attempt in advance".to_string(),
        ));
    }

    let attempt_id: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO attempts (test_id, candidate_email, started_at, answers, status, manual_scores)
        SELECT ?1, ?2, ?3, '{}', 'in_progress', '{}'
        WHERE NOT EXISTS (
            SELECT 1 FROM attempts WHERE test_id = ?1 AND candidate_email = ?2
        )
        RETURNING id
        "#,
    )
    .bind(test.id)
    .bind(candidate_email)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    match attempt_id {
        Some(id) => {
            tracing::info!(
                test = %test.slug,
                candidate = %candidate_email,
                attempt_id = id,
                "attempt started"
            );
            Ok((id, now))
        }
        None => Err(AppError::LimitExceeded(
            "You have already started or completed this assessment".to_string(),
        )),
    }
}

/// Finalized scoring fields shared by both submission paths.
struct Finalized {
    status: AttemptStatus,
    auto_score: f64,
    total_score: Option<f64>,
    manual_required: bool,
}

fn finalize(questions: &[TestQuestion], req: &SubmitRequest) -> Result<Finalized, AppError> {
    scoring::validate_answers(questions, &req.answers)?;
    let auto = scoring::score_answers(questions, &req.answers);

    // No manual portion: the Submitted state is skipped entirely and the
    // attempt finalizes in the same call.
    Ok(if auto.manual_required {
        Finalized {
            status: AttemptStatus::Submitted,
            auto_score: auto.points,
            total_score: None,
            manual_required: true,
        }
    } else {
        Finalized {
            status: AttemptStatus::Evaluated,
            auto_score: auto.points,
            total_score: Some(auto.points),
            manual_required: false,
        }
    })
}

/// Submits answers for a test, dispatching on its attempt policy.
/// Voluntary submission and timer-triggered expiry share this path.
pub async fn submit(
    pool: &SqlitePool,
    test: &TestDefinition,
    questions: &[TestQuestion],
    identity: &Claims,
    assignment: Option<&CandidateAssignment>,
    req: SubmitRequest,
    now: DateTime<Utc>,
) -> Result<SubmitResponse, AppError> {
    match test.attempt_policy {
        AttemptPolicy::Eager => submit_eager(pool, test, questions, identity, req, now).await,
        AttemptPolicy::DirectLink => {
            let ceiling = applicable_ceiling(test, assignment);
            submit_direct(pool, test, questions, identity, req, now, ceiling).await
        }
    }
}

/// Eager protocol: transitions the in-progress record to its terminal
/// state. The status check and the transition are a single conditional
/// UPDATE, so a concurrent second submit cannot also succeed.
async fn submit_eager(
    pool: &SqlitePool,
    test: &TestDefinition,
    questions: &[TestQuestion],
    identity: &Claims,
    req: SubmitRequest,
    now: DateTime<Utc>,
) -> Result<SubmitResponse, AppError> {
    let attempt_id = req.attempt_id.ok_or_else(|| {
        AppError::ValidationFailed("attemptId is required for this assessment".to_string())
    })?;

    let attempt = load_attempt(pool, attempt_id).await?;
    if attempt.test_id != test.id || attempt.candidate_email != identity.email {
        // Do not reveal other candidates' attempt ids.
        return Err(AppError::NotFound("Attempt not found".to_string()));
    }

    // Server-authoritative expiry check. An over-time submission still
    // goes through the normal finalize path; expiry is not a distinct
    // code path from voluntary submission.
    let verdict = timer::check(attempt.started_at, test.duration_minutes, now);
    if verdict.is_expired() {
        tracing::warn!(
            test = %test.slug,
            attempt_id,
            "submission received after the deadline; finalizing what was answered"
        );
    }

    let outcome = finalize(questions, &req)?;
    let answers_json = serde_json::to_string(&req.answers)?;
    let evaluated_at = outcome.total_score.map(|_| now);

    let result = sqlx::query(
        r#"
        UPDATE attempts
        SET submitted_at = ?, answers = ?, status = ?, auto_score = ?,
            total_score = ?, evaluated_at = ?
        WHERE id = ? AND status = 'in_progress'
        "#,
    )
    .bind(now)
    .bind(&answers_json)
    .bind(outcome.status.as_str())
    .bind(outcome.auto_score)
    .bind(outcome.total_score)
    .bind(evaluated_at)
    .bind(attempt_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InvalidState(
            "This attempt was already submitted".to_string(),
        ));
    }

    tracing::info!(
        test = %test.slug,
        attempt_id,
        auto_score = outcome.auto_score,
        manual_required = outcome.manual_required,
        "attempt submitted"
    );

    Ok(SubmitResponse {
        attempt_id,
        status: outcome.status,
        auto_score: outcome.auto_score,
        total_score: outcome.total_score,
        manual_required: outcome.manual_required,
    })
}

/// Direct-link protocol: no in-progress record exists; the attempt is
/// created already terminal. The ceiling check and the insert are one
/// atomic statement, so two racing submissions cannot both slip under the
/// ceiling.
async fn submit_direct(
    pool: &SqlitePool,
    test: &TestDefinition,
    questions: &[TestQuestion],
    identity: &Claims,
    req: SubmitRequest,
    now: DateTime<Utc>,
    ceiling: i64,
) -> Result<SubmitResponse, AppError> {
    let outcome = finalize(questions, &req)?;
    let answers_json = serde_json::to_string(&req.answers)?;
    // The client holds the only in-progress timer for this protocol; its
    // reported start is recorded verbatim.
    let started_at = req.started_at.unwrap_or(now);
    let evaluated_at = outcome.total_score.map(|_| now);

    let attempt_id: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO attempts (test_id, candidate_email, started_at, submitted_at,
                              answers, status, auto_score, manual_scores,
                              total_score, evaluated_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, '{}', ?8, ?9
        WHERE (
            SELECT COUNT(*) FROM attempts
            WHERE test_id = ?1 AND candidate_email = ?2
        ) < ?10
        RETURNING id
        "#,
    )
    .bind(test.id)
    .bind(&identity.email)
    .bind(started_at)
    .bind(now)
    .bind(&answers_json)
    .bind(outcome.status.as_str())
    .bind(outcome.auto_score)
    .bind(outcome.total_score)
    .bind(evaluated_at)
    .bind(ceiling)
    .fetch_optional(pool)
    .await?;

    let attempt_id = attempt_id.ok_or_else(|| {
        AppError::LimitExceeded("Maximum attempts reached for this assessment".to_string())
    })?;

    tracing::info!(
        test = %test.slug,
        attempt_id,
        auto_score = outcome.auto_score,
        manual_required = outcome.manual_required,
        "direct-link attempt recorded"
    );

    Ok(SubmitResponse {
        attempt_id,
        status: outcome.status,
        auto_score: outcome.auto_score,
        total_score: outcome.total_score,
        manual_required: outcome.manual_required,
    })
}

/// Evaluator merge: replaces the attempt's entire manual-score mapping
/// (not additive; a later call overwrites an earlier one). The attempt
/// finalizes to Evaluated once the mapping covers every free-response
/// question; a partial mapping keeps it Submitted and correctable. A
/// finalized attempt rejects further evaluation permanently.
pub async fn evaluate(
    pool: &SqlitePool,
    attempt: &Attempt,
    questions: &[TestQuestion],
    evaluator: &Claims,
    scores: std::collections::HashMap<i64, crate::models::attempt::ManualScoreInput>,
    now: DateTime<Utc>,
) -> Result<(AttemptStatus, Option<f64>), AppError> {
    match attempt.status {
        AttemptStatus::Submitted => {}
        AttemptStatus::Evaluated => {
            return Err(AppError::InvalidState(
                "This attempt was already evaluated".to_string(),
            ));
        }
        AttemptStatus::InProgress => {
            return Err(AppError::InvalidState(
                "This attempt has not been submitted yet".to_string(),
            ));
        }
    }

    scoring::validate_manual_scores(questions, &scores)?;

    let manual_scores: std::collections::HashMap<i64, ManualScore> = scores
        .into_iter()
        .map(|(question_id, input)| {
            (
                question_id,
                ManualScore {
                    score: input.score,
                    feedback: input.feedback,
                    evaluator: evaluator.email.clone(),
                    evaluated_at: now,
                },
            )
        })
        .collect();

    // Finalize only once every free-response question has a score; a
    // partial pass stays Submitted so a later call can correct it.
    let complete = questions
        .iter()
        .filter(|q| q.kind == QuestionType::FreeResponse)
        .all(|q| manual_scores.contains_key(&q.id));

    let auto_score = attempt.auto_score.unwrap_or(0.0);
    let manual_json = serde_json::to_string(&manual_scores)?;

    let (status, total_score) = if complete {
        (
            AttemptStatus::Evaluated,
            Some(scoring::merge_total(auto_score, &manual_scores)),
        )
    } else {
        (AttemptStatus::Submitted, None)
    };
    let evaluated_at = total_score.map(|_| now);

    let result = sqlx::query(
        r#"
        UPDATE attempts
        SET manual_scores = ?, total_score = ?, status = ?,
            evaluated_at = ?, evaluated_by = ?
        WHERE id = ? AND status = 'submitted'
        "#,
    )
    .bind(&manual_json)
    .bind(total_score)
    .bind(status.as_str())
    .bind(evaluated_at)
    .bind(&evaluator.email)
    .bind(attempt.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Lost a race with another evaluator's finalization.
        return Err(AppError::InvalidState(
            "This attempt was already evaluated".to_string(),
        ));
    }

    tracing::info!(
        attempt_id = attempt.id,
        evaluator = %evaluator.email,
        ?total_score,
        finalized = complete,
        "attempt evaluated"
    );

    Ok((status, total_score))
}
