// src/models/test_def.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::error::AppError;

/// How attempts against a test come into existence.
///
/// Kept as an explicit stored variant so the lifecycle manager dispatches
/// on the test definition, not on incidental request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPolicy {
    /// Position-linked: a durable in-progress record is created at start
    /// time and the candidate gets exactly one attempt, no retakes.
    Eager,
    /// Shared-link: no in-progress record; the attempt is created at
    /// submission time and the ceiling is enforced by counting.
    DirectLink,
}

impl AttemptPolicy {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "eager" => Ok(AttemptPolicy::Eager),
            "direct_link" => Ok(AttemptPolicy::DirectLink),
            other => Err(AppError::Internal(format!(
                "Unknown attempt policy '{}'",
                other
            ))),
        }
    }
}

/// Raw row from the 'tests' table.
#[derive(Debug, Clone, FromRow)]
pub struct TestRow {
    pub id: i64,
    pub slug: String,
    pub org_id: i64,
    pub title: String,
    pub duration_minutes: i64,
    pub max_attempts: i64,
    pub attempt_policy: String,
    pub allowed_candidates: Option<String>,
}

/// A test definition, consumed read-only by the engine.
#[derive(Debug, Clone)]
pub struct TestDefinition {
    pub id: i64,
    pub slug: String,
    pub org_id: i64,
    pub title: String,
    /// 0 means untimed.
    pub duration_minutes: i64,
    pub max_attempts: i64,
    pub attempt_policy: AttemptPolicy,
    /// None or empty means unrestricted.
    pub allowed_candidates: Option<Vec<String>>,
}

impl TestDefinition {
    pub fn from_row(row: TestRow) -> Result<Self, AppError> {
        let attempt_policy = AttemptPolicy::parse(&row.attempt_policy)?;
        let allowed_candidates = match row.allowed_candidates {
            Some(raw) => Some(serde_json::from_str::<Vec<String>>(&raw)?),
            None => None,
        };
        Ok(Self {
            id: row.id,
            slug: row.slug,
            org_id: row.org_id,
            title: row.title,
            duration_minutes: row.duration_minutes,
            max_attempts: row.max_attempts,
            attempt_policy,
            allowed_candidates,
        })
    }
}
