// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::error::AppError;
use crate::models::question::PublicQuestion;

/// Attempt lifecycle states. `Evaluated` is terminal; `Submitted` exists
/// only while a free-response question awaits an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Evaluated,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::Evaluated => "evaluated",
        }
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "submitted" => Ok(AttemptStatus::Submitted),
            "evaluated" => Ok(AttemptStatus::Evaluated),
            other => Err(AppError::Internal(format!(
                "Unknown attempt status '{}'",
                other
            ))),
        }
    }
}

/// A submitted answer value: option index for choice questions, text
/// otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Choice(i64),
    Text(String),
}

/// Evaluator-entered score for one free-response question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualScore {
    pub score: f64,
    pub feedback: Option<String>,
    pub evaluator: String,
    pub evaluated_at: DateTime<Utc>,
}

/// Raw row from the 'attempts' table; `answers` and `manual_scores` hold
/// JSON maps as text.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRow {
    pub id: i64,
    pub test_id: i64,
    pub candidate_email: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: String,
    pub status: String,
    pub auto_score: Option<f64>,
    pub manual_scores: String,
    pub total_score: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub evaluated_by: Option<String>,
}

/// One instance of a candidate taking a test.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub test_id: i64,
    pub candidate_email: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: HashMap<i64, AnswerValue>,
    pub status: AttemptStatus,
    pub auto_score: Option<f64>,
    pub manual_scores: HashMap<i64, ManualScore>,
    pub total_score: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub evaluated_by: Option<String>,
}

impl Attempt {
    pub fn from_row(row: AttemptRow) -> Result<Self, AppError> {
        Ok(Self {
            id: row.id,
            test_id: row.test_id,
            candidate_email: row.candidate_email,
            started_at: row.started_at,
            submitted_at: row.submitted_at,
            answers: serde_json::from_str(&row.answers)?,
            status: AttemptStatus::parse(&row.status)?,
            auto_score: row.auto_score,
            manual_scores: serde_json::from_str(&row.manual_scores)?,
            total_score: row.total_score,
            evaluated_at: row.evaluated_at,
            evaluated_by: row.evaluated_by,
        })
    }
}

/// Candidate-facing summary of a test, with no answer content.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub title: String,
    pub duration_minutes: i64,
    pub question_count: i64,
    pub attempts_used: i64,
    pub attempts_allowed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score_so_far: Option<f64>,
    pub attempt_policy: crate::models::test_def::AttemptPolicy,
}

/// Response to a successful eager-protocol start.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub attempt_id: i64,
    pub started_at: DateTime<Utc>,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for submitting answers.
///
/// `attempt_id` addresses the in-progress record for the eager protocol.
/// `started_at` is the client-reported start for the direct-link protocol,
/// recorded verbatim (the client is the timer authority there).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub answers: HashMap<i64, AnswerValue>,
    pub attempt_id: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub attempt_id: i64,
    pub status: AttemptStatus,
    pub auto_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    pub manual_required: bool,
}

/// One evaluator-entered score in an evaluate request.
#[derive(Debug, Deserialize, Validate)]
pub struct ManualScoreInput {
    #[validate(range(min = 0.0, message = "Score must be non-negative."))]
    pub score: f64,
    #[validate(length(max = 2000, message = "Feedback is limited to 2000 characters."))]
    pub feedback: Option<String>,
}

/// DTO for the evaluator merge. Replaces the attempt's entire manual-score
/// mapping; not additive.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub scores: HashMap<i64, ManualScoreInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub status: AttemptStatus,
    /// Present once the attempt is finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
}
