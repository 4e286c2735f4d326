// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{AnswerValue, PublicQuestion};

/// Lifecycle states of an attempt.
///
/// `Timeout` is a reserved terminal state for server-initiated expiry.
/// No current code path produces it, but stored rows carrying it must
/// round-trip and read as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Timeout,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "IN_PROGRESS",
            AttemptStatus::Completed => "COMPLETED",
            AttemptStatus::Timeout => "TIMEOUT",
        }
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(AttemptStatus::InProgress),
            "COMPLETED" => Ok(AttemptStatus::Completed),
            "TIMEOUT" => Ok(AttemptStatus::Timeout),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

/// One user's single pass through the fixed quiz.
///
/// The store holds at most one row per user; the engine enforces that
/// at most one of them is `IN_PROGRESS`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub user_id: String,
    pub status: AttemptStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Question id -> recorded answer. Keys are always a subset of the
    /// question bank's ids.
    pub answers: HashMap<String, AnswerValue>,
    /// Last-viewed position, kept for resume.
    pub current_question_index: i64,
    /// 10 points per correct question, set on completion.
    pub score: i64,
    /// Whole percent 0-100, set on completion.
    pub accuracy: i64,
    pub time_taken_seconds: i64,
}

/// Append-only audit record for reattempt-override requests, granted
/// or denied alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReattemptLog {
    pub id: String,
    pub user_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub reason: Option<String>,
    pub granted: bool,
    pub ip_address: String,
    pub user_agent: String,
}

/// Response for `GET /api/quiz/status`. Derived purely from current
/// attempt + user rows; never mutates state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatusResponse {
    pub can_attempt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_attempt: Option<Attempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_attempt: Option<Attempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retake_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Response for `POST /api/quiz/start` (fresh or resumed).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub attempt_id: String,
    pub questions: Vec<PublicQuestion>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

/// Request body for `POST /api/quiz/answer`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 100))]
    pub question_id: String,
    pub answer: AnswerValue,
}

/// Request body for `POST /api/quiz/save-progress`. Replaces the whole
/// answers map, not a merge.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
    pub question_index: i64,
    pub answers: HashMap<String, AnswerValue>,
}

/// Response for `POST /api/quiz/restore-progress`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreProgressResponse {
    pub success: bool,
    pub attempt_id: String,
    pub current_question_index: i64,
    pub answers: HashMap<String, AnswerValue>,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub questions: Vec<PublicQuestion>,
}

/// Request body for `POST /api/quiz/reattempt`. The password is the
/// out-of-band admin shared secret, not a user credential.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReattemptRequest {
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// One row of the derived leaderboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub best_score: i64,
    pub total_score: i64,
    pub attempts: i64,
    /// Accuracy of the best completed attempt.
    pub accuracy: i64,
    /// Time of the best completed attempt, formatted "XmYs".
    pub time_taken: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}
