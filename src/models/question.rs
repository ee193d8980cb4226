// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::error::AppError;

/// Question kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Single-choice: the submitted value is an option index.
    Choice,
    /// Objective short answer: the submitted value is a string.
    FillBlank,
    /// Human-scored long answer.
    FreeResponse,
}

impl QuestionType {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "choice" => Ok(QuestionType::Choice),
            "fill_blank" => Ok(QuestionType::FillBlank),
            "free_response" => Ok(QuestionType::FreeResponse),
            other => Err(AppError::Internal(format!(
                "Unknown question type '{}'",
                other
            ))),
        }
    }
}

/// Raw row from the 'questions' table joined with 'test_questions'.
/// `options` holds a JSON array as text; `answer` is the answer key.
#[derive(Debug, Clone, FromRow)]
pub struct TestQuestionRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Option<String>,
    pub answer: Option<String>,
    pub points: f64,
    pub position: i64,
}

/// A question as it appears inside one test: decoded type and options,
/// with the test's point override already applied to `points`.
#[derive(Debug, Clone)]
pub struct TestQuestion {
    pub id: i64,
    pub kind: QuestionType,
    pub content: String,
    pub options: Vec<String>,
    /// Answer key: correct option index (as text) for choice, expected
    /// string for fill-blank, None for free-response. Never serialized.
    pub answer: Option<String>,
    pub points: f64,
}

impl TestQuestion {
    pub fn from_row(row: TestQuestionRow) -> Result<Self, AppError> {
        let kind = QuestionType::parse(&row.question_type)?;
        let options = match row.options {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        Ok(Self {
            id: row.id,
            kind,
            content: row.content,
            options,
            answer: row.answer,
            points: row.points,
        })
    }

    /// For choice questions, the correct option index from the answer key.
    pub fn correct_index(&self) -> Option<i64> {
        self.answer.as_deref().and_then(|a| a.trim().parse().ok())
    }
}

/// DTO for releasing a question to a candidate: never carries the answer
/// key or any correctness data, for any caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub points: f64,
}

impl PublicQuestion {
    pub fn from_question(q: &TestQuestion) -> Self {
        Self {
            id: q.id,
            question_type: q.kind,
            content: q.content.clone(),
            options: if q.options.is_empty() {
                None
            } else {
                Some(q.options.clone())
            },
            points: q.points,
        }
    }
}
