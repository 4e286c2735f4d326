// src/storage/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::attempt::{Attempt, AttemptStatus, ReattemptLog};
use crate::models::question::AnswerValue;
use crate::models::user::{Identity, User};
use crate::storage::{Storage, StorageError};

/// In-process store backed by `tokio::sync::RwLock` maps. Used when no
/// `DATABASE_URL` is configured, and by the test suite. Contents do
/// not survive a restart.
#[derive(Default)]
pub struct MemStorage {
    users: RwLock<HashMap<String, User>>,
    /// Keyed by user id; at most one attempt per user.
    attempts: RwLock<HashMap<String, Attempt>>,
    reattempt_logs: RwLock<Vec<ReattemptLog>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn upsert_user(&self, identity: &Identity) -> Result<User, StorageError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(&identity.id) {
            return Ok(existing.clone());
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
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        // Stable iteration order so derived views are deterministic.
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn get_attempt(&self, user_id: &str) -> Result<Option<Attempt>, StorageError> {
        Ok(self.attempts.read().await.get(user_id).cloned())
    }

    async fn create_attempt(&self, user_id: &str) -> Result<Attempt, StorageError> {
        let mut attempts = self.attempts.write().await;
        if attempts.contains_key(user_id) {
            return Err(StorageError::Backend(format!(
                "attempt row already exists for user {}",
                user_id
            )));
        }
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
        attempts.insert(user_id.to_string(), attempt.clone());
        Ok(attempt)
    }

    async fn merge_answer(
        &self,
        user_id: &str,
        question_id: &str,
        answer: &AnswerValue,
    ) -> Result<(), StorageError> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts
            .get_mut(user_id)
            .ok_or_else(|| StorageError::Backend(format!("no attempt for user {}", user_id)))?;
        attempt
            .answers
            .insert(question_id.to_string(), answer.clone());
        Ok(())
    }

    async fn save_progress(
        &self,
        user_id: &str,
        question_index: i64,
        answers: &HashMap<String, AnswerValue>,
    ) -> Result<(), StorageError> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts
            .get_mut(user_id)
            .ok_or_else(|| StorageError::Backend(format!("no attempt for user {}", user_id)))?;
        attempt.current_question_index = question_index;
        attempt.answers = answers.clone();
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
        let mut attempts = self.attempts.write().await;
        let attempt = attempts
            .get_mut(user_id)
            .ok_or_else(|| StorageError::Backend(format!("no attempt for user {}", user_id)))?;
        attempt.status = AttemptStatus::Completed;
        attempt.completed_at = Some(completed_at);
        attempt.score = score;
        attempt.accuracy = accuracy;
        attempt.time_taken_seconds = time_taken_seconds;
        Ok(attempt.clone())
    }

    async fn delete_attempt(&self, user_id: &str) -> Result<(), StorageError> {
        self.attempts.write().await.remove(user_id);
        Ok(())
    }

    async fn append_reattempt_log(&self, entry: &ReattemptLog) -> Result<(), StorageError> {
        self.reattempt_logs.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_reattempt_logs(&self, user_id: &str) -> Result<Vec<ReattemptLog>, StorageError> {
        Ok(self
            .reattempt_logs
            .read()
            .await
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect())
    }
}
