// src/engine.rs
//
// Attempt lifecycle engine: owns every state transition of a user's
// quiz attempt and the aggregate bookkeeping hanging off it. Handlers
// stay thin; everything that touches attempt or user rows goes
// through here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::attempt::{
    Attempt, AttemptStatus, LeaderboardEntry, QuizStatusResponse, ReattemptLog,
    RestoreProgressResponse, StartQuizResponse,
};
use crate::models::question::AnswerValue;
use crate::models::user::Identity;
use crate::questions::QuestionBank;
use crate::storage::Storage;

/// Points awarded per correct question.
pub const POINTS_PER_QUESTION: i64 = 10;

/// Leaderboard length cap.
const LEADERBOARD_LIMIT: usize = 50;

/// Audit metadata accompanying a reattempt-override request.
#[derive(Debug, Clone)]
pub struct ReattemptContext {
    pub reason: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Clone)]
pub struct Engine {
    storage: Arc<dyn Storage>,
    bank: Arc<QuestionBank>,
    cooldown: chrono::Duration,
}

impl Engine {
    pub fn new(storage: Arc<dyn Storage>, bank: Arc<QuestionBank>, cooldown_hours: i64) -> Self {
        Engine {
            storage,
            bank,
            cooldown: chrono::Duration::hours(cooldown_hours),
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Pure status read. Never mutates state.
    pub async fn status(&self, user_id: &str) -> Result<QuizStatusResponse, AppError> {
        let attempt = self.storage.get_attempt(user_id).await?;
        let user = self.storage.get_user(user_id).await?;
        let now = Utc::now();

        let (active_attempt, completed_attempt) = match attempt {
            Some(a) if a.status.is_terminal() => (None, Some(a)),
            Some(a) => (Some(a), None),
            None => (None, None),
        };

        let can_retake_at = user.and_then(|u| u.can_retake_at);
        let can_attempt = match (&active_attempt, &completed_attempt) {
            (Some(_), _) => false,
            (None, Some(_)) => cooldown_elapsed(can_retake_at, now),
            (None, None) => true,
        };
        let next_retake_at = match &completed_attempt {
            Some(_) => can_retake_at.filter(|t| *t > now),
            None => None,
        };

        Ok(QuizStatusResponse {
            can_attempt,
            active_attempt,
            completed_attempt,
            next_retake_at,
        })
    }

    /// Starts a new attempt, or resumes the existing IN_PROGRESS one
    /// (same attempt id, original start time, elapsed time never
    /// resets). A terminal attempt blocks starting until the cooldown
    /// has elapsed; once it has, the stale row is replaced.
    pub async fn start(&self, identity: &Identity) -> Result<StartQuizResponse, AppError> {
        let user = self.storage.upsert_user(identity).await?;

        if let Some(existing) = self.storage.get_attempt(&user.id).await? {
            if existing.status == AttemptStatus::InProgress {
                return Ok(StartQuizResponse {
                    attempt_id: existing.id,
                    questions: self.bank.sanitized(),
                    start_time: existing.started_at,
                });
            }

            if !cooldown_elapsed(user.can_retake_at, Utc::now()) {
                return Err(AppError::Validation(
                    "You have already attempted the quiz.".to_string(),
                ));
            }

            self.storage.delete_attempt(&user.id).await?;
        }

        let attempt = self.storage.create_attempt(&user.id).await?;
        tracing::info!(user_id = %user.id, attempt_id = %attempt.id, "attempt started");

        Ok(StartQuizResponse {
            attempt_id: attempt.id,
            questions: self.bank.sanitized(),
            start_time: attempt.started_at,
        })
    }

    /// Upserts one key in the answers map. The answer's shape is not
    /// checked against the question's type here; only scoring looks at
    /// it.
    pub async fn submit_answer(
        &self,
        user_id: &str,
        question_id: &str,
        answer: &AnswerValue,
    ) -> Result<(), AppError> {
        self.require_active(user_id).await?;

        if !self.bank.contains(question_id) {
            return Err(AppError::Validation(format!(
                "Unknown question id: {}",
                question_id
            )));
        }

        self.storage
            .merge_answer(user_id, question_id, answer)
            .await?;
        Ok(())
    }

    /// Bulk autosave: replaces the whole answers map and the position.
    /// Deliberately not a merge; this is the wholesale counterpart of
    /// [`Engine::submit_answer`].
    pub async fn save_progress(
        &self,
        user_id: &str,
        question_index: i64,
        answers: &HashMap<String, AnswerValue>,
    ) -> Result<(), AppError> {
        self.require_active(user_id).await?;

        if question_index < 0 || question_index as usize >= self.bank.len().max(1) {
            return Err(AppError::Validation(format!(
                "Question index {} out of range",
                question_index
            )));
        }
        for question_id in answers.keys() {
            if !self.bank.contains(question_id) {
                return Err(AppError::Validation(format!(
                    "Unknown question id: {}",
                    question_id
                )));
            }
        }

        self.storage
            .save_progress(user_id, question_index, answers)
            .await?;
        Ok(())
    }

    /// Returns everything a client needs to resume an interrupted
    /// session.
    pub async fn restore_progress(
        &self,
        user_id: &str,
    ) -> Result<RestoreProgressResponse, AppError> {
        let attempt = self.require_active(user_id).await?;

        Ok(RestoreProgressResponse {
            success: true,
            attempt_id: attempt.id,
            current_question_index: attempt.current_question_index,
            answers: attempt.answers,
            start_time: attempt.started_at,
            questions: self.bank.sanitized(),
        })
    }

    /// Scores the stored answers, finalizes the attempt and updates
    /// the owner's aggregates. Terminal fields are written exactly
    /// once; a second finish fails the active-attempt check.
    pub async fn finish(&self, user_id: &str) -> Result<Attempt, AppError> {
        let attempt = match self.storage.get_attempt(user_id).await? {
            Some(a) if a.status == AttemptStatus::InProgress => a,
            _ => {
                return Err(AppError::Validation(
                    "No active attempt to finish.".to_string(),
                ));
            }
        };

        let now = Utc::now();
        let (score, accuracy) = score_answers(&self.bank, &attempt.answers);
        let time_taken_seconds = (now - attempt.started_at).num_seconds().max(0);

        let finished = self
            .storage
            .finish_attempt(user_id, now, score, accuracy, time_taken_seconds)
            .await?;

        if let Some(mut user) = self.storage.get_user(user_id).await? {
            user.total_attempts += 1;
            user.total_score += score;
            user.best_score = user.best_score.max(score);
            user.last_attempt_at = Some(now);
            user.can_retake_at = Some(now + self.cooldown);
            self.storage.put_user(&user).await?;
        }

        tracing::info!(
            user_id = %user_id,
            score,
            accuracy,
            time_taken_seconds,
            "attempt completed"
        );
        Ok(finished)
    }

    /// Deletes the user's attempt row, whatever its status. Aggregates
    /// and the cooldown timestamp are untouched. No password gate here;
    /// only the reattempt override checks the shared secret.
    pub async fn restart(&self, user_id: &str) -> Result<(), AppError> {
        self.storage.delete_attempt(user_id).await?;
        tracing::info!(user_id = %user_id, "attempt deleted by restart");
        Ok(())
    }

    /// Administrative override. Every request is audit-logged, granted
    /// or not. On grant: the blocking attempt is deleted and the user
    /// becomes immediately eligible. On denial nothing else changes
    /// and the caller gets a Forbidden error.
    pub async fn reattempt(
        &self,
        user_id: &str,
        granted: bool,
        ctx: ReattemptContext,
    ) -> Result<(), AppError> {
        let entry = ReattemptLog {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            reason: ctx.reason,
            granted,
            ip_address: ctx.ip_address,
            user_agent: ctx.user_agent,
        };
        self.storage.append_reattempt_log(&entry).await?;

        if !granted {
            tracing::warn!(user_id = %user_id, ip = %entry.ip_address, "reattempt denied");
            return Err(AppError::Forbidden(
                "Invalid reattempt password.".to_string(),
            ));
        }

        self.storage.delete_attempt(user_id).await?;
        if let Some(mut user) = self.storage.get_user(user_id).await? {
            user.can_retake_at = Some(Utc::now());
            self.storage.put_user(&user).await?;
        }

        tracing::info!(user_id = %user_id, "reattempt granted");
        Ok(())
    }

    /// Recomputes the ranked leaderboard from user aggregates plus
    /// each user's stored completed attempt. No caching; the dataset
    /// is small.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, AppError> {
        let users = self.storage.list_users().await?;
        let mut rows = Vec::new();

        for user in users {
            if user.total_attempts == 0 {
                continue;
            }
            // Accuracy/time come from the stored completed attempt;
            // restart may have deleted it, in which case they read 0.
            let (accuracy, time_taken_seconds) = match self.storage.get_attempt(&user.id).await? {
                Some(a) if a.status == AttemptStatus::Completed => {
                    (a.accuracy, a.time_taken_seconds)
                }
                _ => (0, 0),
            };
            rows.push(LeaderboardRow {
                username: user.display_name(),
                best_score: user.best_score,
                total_score: user.total_score,
                attempts: user.total_attempts,
                accuracy,
                time_taken_seconds,
                profile_image_url: user.profile_image_url,
            });
        }

        Ok(rank_entries(rows))
    }

    async fn require_active(&self, user_id: &str) -> Result<Attempt, AppError> {
        match self.storage.get_attempt(user_id).await? {
            Some(a) if a.status == AttemptStatus::InProgress => Ok(a),
            _ => Err(AppError::Validation("No active attempt found.".to_string())),
        }
    }
}

fn cooldown_elapsed(can_retake_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match can_retake_at {
        Some(t) => now >= t,
        None => true,
    }
}

/// Scores the stored answers against the bank in bank order.
///
/// Missing answers score 0. Multiple-choice answers are compared as
/// sorted lists, so order does not matter but a duplicated entry does
/// (`["a", "a"]` mismatches a correct `["a"]`). Everything else is
/// exact, case-sensitive string equality. Returns `(score, accuracy)`.
pub fn score_answers(bank: &QuestionBank, answers: &HashMap<String, AnswerValue>) -> (i64, i64) {
    let mut score = 0;

    for question in bank.questions() {
        let Some(given) = answers.get(&question.id) else {
            continue;
        };
        let correct = match (&question.correct_answer, given) {
            (AnswerValue::Multiple(expected), AnswerValue::Multiple(given)) => {
                let mut expected = expected.clone();
                let mut given = given.clone();
                expected.sort();
                given.sort();
                expected == given
            }
            (AnswerValue::Single(expected), AnswerValue::Single(given)) => expected == given,
            // Shape mismatch (list for a single-answer question or
            // vice versa) never scores.
            _ => false,
        };
        if correct {
            score += POINTS_PER_QUESTION;
        }
    }

    let max = bank.len() as i64 * POINTS_PER_QUESTION;
    let accuracy = if max == 0 {
        0
    } else {
        ((score as f64 / max as f64) * 100.0).round() as i64
    };
    (score, accuracy)
}

struct LeaderboardRow {
    username: String,
    best_score: i64,
    total_score: i64,
    attempts: i64,
    accuracy: i64,
    time_taken_seconds: i64,
    profile_image_url: Option<String>,
}

/// Sorts by best score desc, accuracy desc, time ascending, then
/// assigns 1-based ranks (ties get distinct consecutive ranks) and
/// truncates to the display cap.
fn rank_entries(mut rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| {
        b.best_score
            .cmp(&a.best_score)
            .then(b.accuracy.cmp(&a.accuracy))
            .then(a.time_taken_seconds.cmp(&b.time_taken_seconds))
    });

    rows.into_iter()
        .take(LEADERBOARD_LIMIT)
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            username: row.username,
            best_score: row.best_score,
            total_score: row.total_score,
            attempts: row.attempts,
            accuracy: row.accuracy,
            time_taken: format_time_taken(row.time_taken_seconds),
            profile_image_url: row.profile_image_url,
        })
        .collect()
}

fn format_time_taken(seconds: i64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}
