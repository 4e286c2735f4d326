// src/storage/sqlite.rs

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::models::attempt::{Attempt, AttemptStatus, ReattemptLog};
use crate::models::question::AnswerValue;
use crate::models::user::{Identity, User};
use crate::storage::{Storage, StorageError};

/// SQLite-backed store, selected when `DATABASE_URL` is configured.
/// Uses the runtime query API; the answers map is kept as a JSON text
/// column so [`SqliteStorage::merge_answer`] can update a single key
/// in one statement.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating the file if needed) and migrates the database.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(SqliteStorage { pool })
    }

    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // A pooled in-memory database must stay on one connection or
        // each checkout sees a different empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(SqliteStorage { pool })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    profile_image_url: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    total_attempts: i64,
    best_score: i64,
    total_score: i64,
    last_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
    can_retake_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            profile_image_url: row.profile_image_url,
            created_at: row.created_at,
            total_attempts: row.total_attempts,
            best_score: row.best_score,
            total_score: row.total_score,
            last_attempt_at: row.last_attempt_at,
            can_retake_at: row.can_retake_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: String,
    user_id: String,
    status: String,
    started_at: chrono::DateTime<chrono::Utc>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    answers: String,
    current_question_index: i64,
    score: i64,
    accuracy: i64,
    time_taken_seconds: i64,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<Attempt, StorageError> {
        let status = self
            .status
            .parse::<AttemptStatus>()
            .map_err(StorageError::Corrupt)?;
        let answers: HashMap<String, AnswerValue> = serde_json::from_str(&self.answers)?;
        Ok(Attempt {
            id: self.id,
            user_id: self.user_id,
            status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            answers,
            current_question_index: self.current_question_index,
            score: self.score,
            accuracy: self.accuracy,
            time_taken_seconds: self.time_taken_seconds,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReattemptLogRow {
    id: String,
    user_id: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    reason: Option<String>,
    granted: bool,
    ip_address: String,
    user_agent: String,
}

impl From<ReattemptLogRow> for ReattemptLog {
    fn from(row: ReattemptLogRow) -> Self {
        ReattemptLog {
            id: row.id,
            user_id: row.user_id,
            timestamp: row.timestamp,
            reason: row.reason,
            granted: row.granted,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
        }
    }
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, profile_image_url, created_at, \
     total_attempts, best_score, total_score, last_attempt_at, can_retake_at";

const ATTEMPT_COLUMNS: &str = "id, user_id, status, started_at, completed_at, answers, \
     current_question_index, score, accuracy, time_taken_seconds";

#[async_trait]
impl Storage for SqliteStorage {
    async fn upsert_user(&self, identity: &Identity) -> Result<User, StorageError> {
        if let Some(existing) = self.get_user(&identity.id).await? {
            return Ok(existing);
        }

        let (first_name, last_name) = identity.name_parts();
        let user = User {
            id: identity.id.clone(),
            email: identity.email.clone(),
            first_name,
            last_name,
            profile_image_url: identity.picture.clone(),
            created_at: chrono::Utc::now(),
            total_attempts: 0,
            best_score: 0,
            total_score: 0,
            last_attempt_at: None,
            can_retake_at: None,
        };

        // ON CONFLICT DO NOTHING covers the race where two requests
        // upsert the same first-seen user.
        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, profile_image_url, created_at, \
             total_attempts, best_score, total_score, last_attempt_at, can_retake_at) \
             VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, NULL, NULL) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.profile_image_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        self.get_user(&identity.id)
            .await?
            .ok_or_else(|| StorageError::Backend("user vanished after upsert".to_string()))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE users SET email = ?, first_name = ?, last_name = ?, profile_image_url = ?, \
             total_attempts = ?, best_score = ?, total_score = ?, last_attempt_at = ?, \
             can_retake_at = ? WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.profile_image_url)
        .bind(user.total_attempts)
        .bind(user.best_score)
        .bind(user.total_score)
        .bind(user.last_attempt_at)
        .bind(user.can_retake_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn get_attempt(&self, user_id: &str) -> Result<Option<Attempt>, StorageError> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM attempts WHERE user_id = ?",
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AttemptRow::into_attempt).transpose()
    }

    async fn create_attempt(&self, user_id: &str) -> Result<Attempt, StorageError> {
        let attempt = Attempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            status: AttemptStatus::InProgress,
            started_at: chrono::Utc::now(),
            completed_at: None,
            answers: HashMap::new(),
            current_question_index: 0,
            score: 0,
            accuracy: 0,
            time_taken_seconds: 0,
        };

        sqlx::query(
            "INSERT INTO attempts (id, user_id, status, started_at, completed_at, answers, \
             current_question_index, score, accuracy, time_taken_seconds) \
             VALUES (?, ?, ?, ?, NULL, '{}', 0, 0, 0, 0)",
        )
        .bind(&attempt.id)
        .bind(&attempt.user_id)
        .bind(attempt.status.as_str())
        .bind(attempt.started_at)
        .execute(&self.pool)
        .await?;

        Ok(attempt)
    }

    async fn merge_answer(
        &self,
        user_id: &str,
        question_id: &str,
        answer: &AnswerValue,
    ) -> Result<(), StorageError> {
        // Single-statement JSON1 update keeps the per-key write atomic
        // instead of read-modify-writing the whole map.
        let path = format!("$.\"{}\"", question_id);
        let value = serde_json::to_string(answer)?;
        let result = sqlx::query(
            "UPDATE attempts SET answers = json_set(answers, ?, json(?)) WHERE user_id = ?",
        )
        .bind(&path)
        .bind(&value)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Backend(format!(
                "no attempt for user {}",
                user_id
            )));
        }
        Ok(())
    }

    async fn save_progress(
        &self,
        user_id: &str,
        question_index: i64,
        answers: &HashMap<String, AnswerValue>,
    ) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(answers)?;
        let result = sqlx::query(
            "UPDATE attempts SET answers = ?, current_question_index = ? WHERE user_id = ?",
        )
        .bind(&serialized)
        .bind(question_index)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Backend(format!(
                "no attempt for user {}",
                user_id
            )));
        }
        Ok(())
    }

    async fn finish_attempt(
        &self,
        user_id: &str,
        completed_at: chrono::DateTime<chrono::Utc>,
        score: i64,
        accuracy: i64,
        time_taken_seconds: i64,
    ) -> Result<Attempt, StorageError> {
        let result = sqlx::query(
            "UPDATE attempts SET status = ?, completed_at = ?, score = ?, accuracy = ?, \
             time_taken_seconds = ? WHERE user_id = ?",
        )
        .bind(AttemptStatus::Completed.as_str())
        .bind(completed_at)
        .bind(score)
        .bind(accuracy)
        .bind(time_taken_seconds)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Backend(format!(
                "no attempt for user {}",
                user_id
            )));
        }

        self.get_attempt(user_id)
            .await?
            .ok_or_else(|| StorageError::Backend("attempt vanished after finish".to_string()))
    }

    async fn delete_attempt(&self, user_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM attempts WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_reattempt_log(&self, entry: &ReattemptLog) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO reattempt_logs (id, user_id, timestamp, reason, granted, ip_address, \
             user_agent) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.timestamp)
        .bind(&entry.reason)
        .bind(entry.granted)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_reattempt_logs(&self, user_id: &str) -> Result<Vec<ReattemptLog>, StorageError> {
        let rows = sqlx::query_as::<_, ReattemptLogRow>(
            "SELECT id, user_id, timestamp, reason, granted, ip_address, user_agent \
             FROM reattempt_logs WHERE user_id = ? ORDER BY timestamp",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ReattemptLog::from).collect())
    }
}
