// src/handlers/leaderboard.rs

use axum::{Json, extract::State, response::IntoResponse};

use crate::{engine::Engine, error::AppError};

/// Returns the ranked leaderboard, recomputed on every read.
pub async fn get_leaderboard(State(engine): State<Engine>) -> Result<impl IntoResponse, AppError> {
    let entries = engine.leaderboard().await?;
    Ok(Json(entries))
}
