// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    engine::{Engine, ReattemptContext},
    error::AppError,
    models::attempt::{ReattemptRequest, SaveProgressRequest, SubmitAnswerRequest},
    utils::jwt::Claims,
};

/// `GET /api/quiz/status` — read-only view of the caller's attempt
/// state and retake eligibility.
pub async fn status(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let status = engine.status(&claims.sub).await?;
    Ok(Json(status))
}

/// `POST /api/quiz/start` — creates a new attempt or resumes the
/// active one. 201 either way; the question list never includes
/// answer keys.
pub async fn start(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let response = engine.start(&claims.identity()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/quiz/answer` — merges one answer into the active
/// attempt.
pub async fn submit_answer(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    engine
        .submit_answer(&claims.sub, &payload.question_id, &payload.answer)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/quiz/save-progress` — periodic autosave; replaces the
/// stored answers wholesale along with the current position.
pub async fn save_progress(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    engine
        .save_progress(&claims.sub, payload.question_index, &payload.answers)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/quiz/restore-progress` — hands back the saved position,
/// answers and question list for an interrupted session.
pub async fn restore_progress(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let restored = engine.restore_progress(&claims.sub).await?;
    Ok(Json(restored))
}

/// `POST /api/quiz/finish` — scores and finalizes the active attempt.
/// Also the target of the anti-cheat force-submission.
pub async fn finish(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = engine.finish(&claims.sub).await?;
    Ok(Json(attempt))
}

/// `POST /api/quiz/restart` — deletes the caller's attempt row. No
/// password check on this path; the reattempt override is the gated
/// one.
pub async fn restart(
    State(engine): State<Engine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    engine.restart(&claims.sub).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/quiz/reattempt` — admin-password-gated override that
/// clears the cooldown. Every request is audit-logged with the
/// caller's address and user agent; a wrong password gets 403.
pub async fn reattempt(
    State(engine): State<Engine>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(payload): Json<ReattemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }

    let granted = payload.password == config.reattempt_password;
    let ctx = ReattemptContext {
        reason: payload.reason,
        ip_address: client_ip(&headers),
        user_agent: header_value(&headers, "user-agent"),
    };

    engine.reattempt(&claims.sub, granted, ctx).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Reattempt granted. You can start the quiz now."
    })))
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
