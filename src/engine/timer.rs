// src/engine/timer.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::attempt::AnswerValue};

/// Where an attempt stands against its time box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerVerdict {
    /// The test has no duration.
    Untimed,
    /// Time remains.
    Within(Duration),
    /// The deadline has passed by this much.
    Expired(Duration),
}

impl TimerVerdict {
    pub fn is_expired(&self) -> bool {
        matches!(self, TimerVerdict::Expired(_))
    }
}

/// The submission deadline for an attempt, or None when untimed.
pub fn deadline(started_at: DateTime<Utc>, duration_minutes: i64) -> Option<DateTime<Utc>> {
    if duration_minutes <= 0 {
        None
    } else {
        Some(started_at + Duration::minutes(duration_minutes))
    }
}

/// Server-side elapsed-time check.
///
/// For the eager protocol this is the sole authority over expiry: the
/// server knows `started_at`, so the verdict holds regardless of what the
/// client reports. The direct-link protocol has no server-side start
/// record and never consults this.
pub fn check(
    started_at: DateTime<Utc>,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> TimerVerdict {
    match deadline(started_at, duration_minutes) {
        None => TimerVerdict::Untimed,
        Some(deadline) if now <= deadline => TimerVerdict::Within(deadline - now),
        Some(deadline) => TimerVerdict::Expired(now - deadline),
    }
}

/// The in-progress state a direct-link client persists locally, keyed by
/// test slug, while no server-side record exists.
///
/// The client writes it on every answer change, replays it as an ordinary
/// submission on the next load of the same assessment, and discards it
/// only once a submission is acknowledged. A reload therefore finalizes
/// whatever was answered instead of leaving a dangling session; it also
/// resets the visible countdown, an accepted weakness of the
/// client-authoritative timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSession {
    pub answers: HashMap<i64, AnswerValue>,
    pub started_at: DateTime<Utc>,
}

impl LocalSession {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            answers: HashMap::new(),
            started_at,
        }
    }

    /// Storage key for the side-channel the client persists this under.
    pub fn storage_key(test_slug: &str) -> String {
        format!("assessment-session:{}", test_slug)
    }

    pub fn record_answer(&mut self, question_id: i64, value: AnswerValue) {
        self.answers.insert(question_id, value);
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }
}
