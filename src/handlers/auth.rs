// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, storage::Storage, utils::jwt::Claims};

/// Returns the authenticated user's profile.
///
/// Side effect: the profile is upserted on first authenticated sight,
/// so a brand-new user gets a row with zeroed quiz aggregates.
pub async fn get_current_user(
    State(storage): State<Arc<dyn Storage>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = storage.upsert_user(&claims.identity()).await?;
    Ok(Json(user))
}
