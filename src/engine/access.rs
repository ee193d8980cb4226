// src/engine/access.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{assignment::CandidateAssignment, test_def::TestDefinition},
    utils::jwt::Claims,
};

/// Outcome of a successful gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The caller may take the assessment.
    Candidate,
    /// Staff of the owning organization: read access for review, never a
    /// write grant on answers.
    StaffReview,
}

/// Decides whether the question payload may be released to this identity.
///
/// Pure decision function with no side effects; queried on every access
/// rather than cached, because assignments can change between queries.
/// The assignment validity window gates both attempt protocols uniformly.
pub fn check_access(
    identity: &Claims,
    test: &TestDefinition,
    assignment: Option<&CandidateAssignment>,
    now: DateTime<Utc>,
) -> Result<Access, AppError> {
    if identity.is_staff_of(test.org_id) {
        return Ok(Access::StaffReview);
    }

    if let Some(allowed) = &test.allowed_candidates {
        if !allowed.is_empty() && !allowed.iter().any(|e| e == &identity.email) {
            return Err(AppError::AccessDenied(
                "You are not authorized for this assessment".to_string(),
            ));
        }
    }

    if let Some(assignment) = assignment {
        if let Some(valid_from) = assignment.valid_from {
            if now < valid_from {
                return Err(AppError::AccessDenied(
                    "This assessment is not yet open".to_string(),
                ));
            }
        }
        if let Some(valid_until) = assignment.valid_until {
            if now > valid_until {
                return Err(AppError::AccessDenied(
                    "The assessment window has closed".to_string(),
                ));
            }
        }
    }

    Ok(Access::Candidate)
}
