// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for verifying bearer tokens.
    pub jwt_secret: String,
    /// Out-of-band admin secret gating the reattempt override.
    /// Distinct from user authentication.
    pub reattempt_password: String,
    /// SQLite database URL. When absent the service falls back to the
    /// volatile in-memory store.
    pub database_url: Option<String>,
    pub rust_log: String,
    /// Hours a user must wait after completing an attempt before
    /// starting another.
    pub retake_cooldown_hours: i64,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let reattempt_password =
            env::var("REATTEMPT_PASSWORD").expect("REATTEMPT_PASSWORD must be set");

        let database_url = env::var("DATABASE_URL").ok();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let retake_cooldown_hours = env::var("RETAKE_COOLDOWN_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            jwt_secret,
            reattempt_password,
            database_url,
            rust_log,
            retake_cooldown_hours,
            port,
        }
    }
}
