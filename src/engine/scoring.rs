// src/engine/scoring.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerValue, ManualScore, ManualScoreInput},
        question::{QuestionType, TestQuestion},
    },
};

/// Result of scoring the objective portion of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoScore {
    pub points: f64,
    /// True when the test contains at least one free-response question,
    /// i.e. an evaluator still owes the manual portion.
    pub manual_required: bool,
}

/// Rejects answer payloads that do not fit the test: unknown question ids
/// or a value of the wrong shape for the question type.
pub fn validate_answers(
    questions: &[TestQuestion],
    answers: &HashMap<i64, AnswerValue>,
) -> Result<(), AppError> {
    let by_id: HashMap<i64, &TestQuestion> = questions.iter().map(|q| (q.id, q)).collect();

    for (question_id, value) in answers {
        let question = by_id.get(question_id).ok_or_else(|| {
            AppError::ValidationFailed(format!(
                "Question {} is not part of this assessment",
                question_id
            ))
        })?;
        match (question.kind, value) {
            (QuestionType::Choice, AnswerValue::Choice(idx)) => {
                if *idx < 0 || *idx as usize >= question.options.len() {
                    return Err(AppError::ValidationFailed(format!(
                        "Option index {} is out of range for question {}",
                        idx, question_id
                    )));
                }
            }
            (QuestionType::Choice, AnswerValue::Text(_)) => {
                return Err(AppError::ValidationFailed(format!(
                    "Question {} expects an option index",
                    question_id
                )));
            }
            (_, AnswerValue::Choice(_)) => {
                return Err(AppError::ValidationFailed(format!(
                    "Question {} expects a text answer",
                    question_id
                )));
            }
            (_, AnswerValue::Text(_)) => {}
        }
    }
    Ok(())
}

/// Computes the automatic portion of the score.
///
/// Choice questions award full configured points iff the submitted index
/// equals the correct option's index; no partial credit. Fill-blank
/// questions award full points on a trimmed exact match. Free-response
/// questions contribute nothing and flag the manual portion.
pub fn score_answers(
    questions: &[TestQuestion],
    answers: &HashMap<i64, AnswerValue>,
) -> AutoScore {
    let mut points = 0.0;
    let mut manual_required = false;

    for question in questions {
        match question.kind {
            QuestionType::FreeResponse => {
                manual_required = true;
            }
            QuestionType::Choice => {
                if let (Some(AnswerValue::Choice(submitted)), Some(correct)) =
                    (answers.get(&question.id), question.correct_index())
                {
                    if *submitted == correct {
                        points += question.points;
                    }
                }
            }
            QuestionType::FillBlank => {
                if let (Some(AnswerValue::Text(submitted)), Some(expected)) =
                    (answers.get(&question.id), question.answer.as_deref())
                {
                    if submitted.trim() == expected.trim() {
                        points += question.points;
                    }
                }
            }
        }
    }

    AutoScore {
        points,
        manual_required,
    }
}

/// Validates an evaluator's manual-score payload against the test: every
/// entry must target one of its free-response questions.
pub fn validate_manual_scores(
    questions: &[TestQuestion],
    scores: &HashMap<i64, ManualScoreInput>,
) -> Result<(), AppError> {
    let by_id: HashMap<i64, &TestQuestion> = questions.iter().map(|q| (q.id, q)).collect();

    for question_id in scores.keys() {
        match by_id.get(question_id) {
            Some(q) if q.kind == QuestionType::FreeResponse => {}
            Some(_) => {
                return Err(AppError::ValidationFailed(format!(
                    "Question {} is auto-scored and cannot be manually scored",
                    question_id
                )));
            }
            None => {
                return Err(AppError::ValidationFailed(format!(
                    "Question {} is not part of this assessment",
                    question_id
                )));
            }
        }
    }
    Ok(())
}

/// Total score after the evaluator merge: the automatic portion plus the
/// sum of manual contributions, each counted exactly once.
pub fn merge_total(auto_score: f64, manual_scores: &HashMap<i64, ManualScore>) -> f64 {
    auto_score + manual_scores.values().map(|m| m.score).sum::<f64>()
}
