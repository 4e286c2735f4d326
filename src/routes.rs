// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, leaderboard, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Quiz and auth routes sit behind the bearer-token middleware.
/// * The leaderboard is public.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new().route("/user", get(auth::get_current_user));

    let quiz_routes = Router::new()
        .route("/status", get(quiz::status))
        .route("/start", post(quiz::start))
        .route("/answer", post(quiz::submit_answer))
        .route("/save-progress", post(quiz::save_progress))
        .route("/restore-progress", post(quiz::restore_progress))
        .route("/finish", post(quiz::finish))
        .route("/restart", post(quiz::restart))
        .route("/reattempt", post(quiz::reattempt));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        // Everything above requires a verified bearer token.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
