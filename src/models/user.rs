// src/models/user.rs

use serde::{Deserialize, Serialize};

/// A quiz participant, keyed by the opaque id the identity provider
/// assigns. Upserted on first authenticated sight, never deleted.
///
/// The aggregate fields are mutated only by the attempt lifecycle
/// engine: on completion, and on a granted reattempt override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Count of completed attempts.
    pub total_attempts: i64,
    /// Highest score ever achieved.
    pub best_score: i64,
    /// Sum of all completed-attempt scores.
    pub total_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Before this instant a new attempt is refused. Absent means no
    /// restriction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_retake_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    /// Display name for the leaderboard: full name, else email, else a
    /// generic placeholder.
    pub fn display_name(&self) -> String {
        match &self.first_name {
            Some(first) => match &self.last_name {
                Some(last) => format!("{} {}", first, last).trim().to_string(),
                None => first.clone(),
            },
            None => self
                .email
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string()),
        }
    }
}

/// Profile fields resolved from a verified bearer credential.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl Identity {
    /// Splits the provider's display name into first/last parts the way
    /// the profile stores them.
    pub fn name_parts(&self) -> (Option<String>, Option<String>) {
        match &self.name {
            Some(name) => {
                let mut parts = name.splitn(2, ' ');
                let first = parts.next().map(|s| s.to_string());
                let last = parts.next().map(|s| s.to_string());
                (first, last)
            }
            None => (None, None),
        }
    }
}
