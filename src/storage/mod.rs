// src/storage/mod.rs

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::models::attempt::{Attempt, ReattemptLog};
use crate::models::question::AnswerValue;
use crate::models::user::{Identity, User};

pub use memory::MemStorage;
pub use sqlite::SqliteStorage;

/// Failure inside a storage backend. Callers map this to a generic
/// Internal error; the detail only goes to the log.
#[derive(Debug)]
pub enum StorageError {
    Backend(String),
    Corrupt(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Backend(msg) => write!(f, "storage backend error: {}", msg),
            StorageError::Corrupt(msg) => write!(f, "corrupt stored record: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

/// Persistence contract for users, attempts and the reattempt audit
/// trail. Constructed once at startup and passed to handlers as
/// `Arc<dyn Storage>`; nothing reaches a backend through a global.
///
/// The store holds at most one attempt row per user, so attempt
/// operations are keyed by user id. Note the two distinct answer-write
/// paths: [`Storage::merge_answer`] updates a single key atomically,
/// [`Storage::save_progress`] replaces the whole map.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Creates the profile on first sight, otherwise returns the
    /// existing row untouched (aggregates included).
    async fn upsert_user(&self, identity: &Identity) -> Result<User, StorageError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError>;

    /// Overwrites the user's aggregate fields. Only the engine calls
    /// this, on completion or on a granted reattempt.
    async fn put_user(&self, user: &User) -> Result<(), StorageError>;

    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    async fn get_attempt(&self, user_id: &str) -> Result<Option<Attempt>, StorageError>;

    /// Inserts a fresh IN_PROGRESS attempt with empty answers.
    async fn create_attempt(&self, user_id: &str) -> Result<Attempt, StorageError>;

    /// Upserts one key of the answers map without touching the rest.
    async fn merge_answer(
        &self,
        user_id: &str,
        question_id: &str,
        answer: &AnswerValue,
    ) -> Result<(), StorageError>;

    /// Bulk-replaces the answers map and the current question index.
    async fn save_progress(
        &self,
        user_id: &str,
        question_index: i64,
        answers: &HashMap<String, AnswerValue>,
    ) -> Result<(), StorageError>;

    /// Stamps the terminal fields and flips the status to COMPLETED.
    async fn finish_attempt(
        &self,
        user_id: &str,
        completed_at: chrono::DateTime<chrono::Utc>,
        score: i64,
        accuracy: i64,
        time_taken_seconds: i64,
    ) -> Result<Attempt, StorageError>;

    /// Removes the user's attempt row if present. The only deletion
    /// path; restart and reattempt both go through here.
    async fn delete_attempt(&self, user_id: &str) -> Result<(), StorageError>;

    /// Appends to the write-only audit trail.
    async fn append_reattempt_log(&self, entry: &ReattemptLog) -> Result<(), StorageError>;

    async fn list_reattempt_logs(&self, user_id: &str) -> Result<Vec<ReattemptLog>, StorageError>;
}
