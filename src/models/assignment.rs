// src/models/assignment.rs

use serde::Serialize;
use sqlx::prelude::FromRow;

/// Per-candidate override record for one test, owned by an external
/// subsystem and consumed read-only here.
///
/// A present `max_attempts_override` supersedes the test's ceiling for
/// this candidate; a present validity window gates access on every query.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CandidateAssignment {
    pub id: i64,
    pub test_id: i64,
    pub candidate_email: String,
    pub valid_from: Option<chrono::DateTime<chrono::Utc>>,
    pub valid_until: Option<chrono::DateTime<chrono::Utc>>,
    pub max_attempts_override: Option<i64>,
}
