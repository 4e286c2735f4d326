// tests/api_tests.rs

use std::sync::Arc;

use quizhub::config::Config;
use quizhub::engine::Engine;
use quizhub::models::user::Identity;
use quizhub::questions::QuestionBank;
use quizhub::routes;
use quizhub::state::AppState;
use quizhub::storage::{MemStorage, Storage};
use quizhub::utils::jwt::sign_token;
use serde_json::{Value, json};

const TEST_SECRET: &str = "test_secret_for_integration_tests";
const TEST_REATTEMPT_PASSWORD: &str = "override-secret";

/// Spawns the app with an in-memory store on a random port and
/// returns the base URL.
async fn spawn_app() -> String {
    let config = Config {
        jwt_secret: TEST_SECRET.to_string(),
        reattempt_password: TEST_REATTEMPT_PASSWORD.to_string(),
        database_url: None,
        rust_log: "error".to_string(),
        retake_cooldown_hours: 24,
        port: 0,
    };

    let storage: Arc<dyn Storage> = Arc::new(MemStorage::new());
    let bank = Arc::new(QuestionBank::builtin());
    let engine = Engine::new(storage.clone(), bank, config.retake_cooldown_hours);

    let state = AppState {
        storage,
        engine,
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn token_for(id: &str, name: &str) -> String {
    let identity = Identity {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        name: Some(name.to_string()),
        picture: None,
    };
    sign_token(&identity, TEST_SECRET, 600).expect("Failed to sign test token")
}

async fn get_json(
    client: &reqwest::Client,
    address: &str,
    path: &str,
    token: &str,
) -> (u16, Value) {
    let response = client
        .get(format!("{}{}", address, path))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(
    client: &reqwest::Client,
    address: &str,
    path: &str,
    token: &str,
    body: Option<Value>,
) -> (u16, Value) {
    let mut request = client
        .post(format!("{}{}", address, path))
        .bearer_auth(token);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.expect("Failed to execute request");
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Answers every question correctly (multi-choice deliberately out of
/// display order).
async fn answer_all_correct(client: &reqwest::Client, address: &str, token: &str) {
    let answers = [
        ("q1", json!("Float")),
        ("q2", json!("'number'")),
        ("q3", json!(["const", "var", "let"])),
        ("q4", json!("Performs side effects")),
        ("q5", json!("True")),
        ("q6", json!("O(1)")),
        ("q7", json!("pop()")),
        ("q8", json!("4")),
        ("q9", json!("418")),
        ("q10", json!("Moving declarations to the top")),
    ];
    for (question_id, answer) in answers {
        let (status, body) = post_json(
            client,
            address,
            "/api/quiz/answer",
            token,
            Some(json!({ "questionId": question_id, "answer": answer })),
        )
        .await;
        assert_eq!(status, 200, "answer submission failed: {}", body);
        assert_eq!(body["success"], json!(true));
    }
}

#[tokio::test]
async fn quiz_routes_require_authentication() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/quiz/status", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .post(format!("{}/api/quiz/start", address))
        .bearer_auth("not-a-valid-token")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn leaderboard_is_public_and_empty_at_first() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/leaderboard", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn auth_user_upserts_profile_on_first_sight() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    let (status, body) = get_json(&client, &address, "/api/auth/user", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], json!("user-1"));
    assert_eq!(body["firstName"], json!("Ada"));
    assert_eq!(body["lastName"], json!("Lovelace"));
    assert_eq!(body["totalAttempts"], json!(0));
    assert_eq!(body["bestScore"], json!(0));
}

#[tokio::test]
async fn status_before_any_attempt_allows_starting() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    let (status, body) = get_json(&client, &address, "/api/quiz/status", &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["canAttempt"], json!(true));
    assert!(body.get("activeAttempt").is_none());
    assert!(body.get("completedAttempt").is_none());
    assert!(body.get("nextRetakeAt").is_none());
}

#[tokio::test]
async fn start_returns_sanitized_questions() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    let (status, body) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    assert_eq!(status, 201);
    assert!(body["attemptId"].is_string());
    assert!(body["startTime"].is_string());

    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);
    for question in questions {
        assert!(question.get("correctAnswer").is_none());
        assert!(question.get("explanation").is_none());
        assert!(question["options"].is_array());
    }
    assert_eq!(questions[0]["id"], json!("q1"));
    assert_eq!(questions[2]["type"], json!("MCQ_MULTI"));
}

#[tokio::test]
async fn start_twice_resumes_the_same_attempt() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    let (_, first) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    let (status, second) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    assert_eq!(status, 201);
    assert_eq!(first["attemptId"], second["attemptId"]);
    assert_eq!(first["startTime"], second["startTime"]);

    let (_, quiz_status) = get_json(&client, &address, "/api/quiz/status", &token).await;
    assert_eq!(quiz_status["canAttempt"], json!(false));
    assert_eq!(
        quiz_status["activeAttempt"]["id"],
        first["attemptId"],
        "status must report the active attempt"
    );
}

#[tokio::test]
async fn finishing_with_no_answers_scores_zero() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    let (status, attempt) = post_json(&client, &address, "/api/quiz/finish", &token, None).await;
    assert_eq!(status, 200);
    assert_eq!(attempt["status"], json!("COMPLETED"));
    assert_eq!(attempt["score"], json!(0));
    assert_eq!(attempt["accuracy"], json!(0));
    assert!(attempt["completedAt"].is_string());
}

#[tokio::test]
async fn perfect_run_scores_full_marks() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    answer_all_correct(&client, &address, &token).await;

    let (status, attempt) = post_json(&client, &address, "/api/quiz/finish", &token, None).await;
    assert_eq!(status, 200);
    assert_eq!(attempt["score"], json!(100));
    assert_eq!(attempt["accuracy"], json!(100));

    let (_, profile) = get_json(&client, &address, "/api/auth/user", &token).await;
    assert_eq!(profile["totalAttempts"], json!(1));
    assert_eq!(profile["bestScore"], json!(100));
    assert_eq!(profile["totalScore"], json!(100));
}

#[tokio::test]
async fn finish_without_active_attempt_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    let (status, body) = post_json(&client, &address, "/api/quiz/finish", &token, None).await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("No active"));
}

#[tokio::test]
async fn answer_for_unknown_question_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    let (status, body) = post_json(
        &client,
        &address,
        "/api/quiz/answer",
        &token,
        Some(json!({ "questionId": "q99", "answer": "x" })),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("q99"));
}

#[tokio::test]
async fn malformed_answer_payload_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    let response = client
        .post(format!("{}/api/quiz/answer", address))
        .bearer_auth(&token)
        .json(&json!({ "answer": "x" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn save_and_restore_progress_round_trip() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    post_json(
        &client,
        &address,
        "/api/quiz/answer",
        &token,
        Some(json!({ "questionId": "q1", "answer": "Float" })),
    )
    .await;

    // Autosave replaces the whole map: q1 drops out, q2/q3 remain.
    let (status, _) = post_json(
        &client,
        &address,
        "/api/quiz/save-progress",
        &token,
        Some(json!({
            "questionIndex": 2,
            "answers": {
                "q2": "'number'",
                "q3": ["var", "let"]
            }
        })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, restored) = post_json(
        &client,
        &address,
        "/api/quiz/restore-progress",
        &token,
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(restored["success"], json!(true));
    assert_eq!(restored["currentQuestionIndex"], json!(2));
    assert_eq!(restored["answers"]["q2"], json!("'number'"));
    assert_eq!(restored["answers"]["q3"], json!(["var", "let"]));
    assert!(restored["answers"].get("q1").is_none());
    assert_eq!(restored["questions"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn completed_attempt_blocks_starting_until_cooldown() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    post_json(&client, &address, "/api/quiz/finish", &token, None).await;

    let (status, body) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    assert_eq!(status, 400);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("already attempted")
    );

    let (_, quiz_status) = get_json(&client, &address, "/api/quiz/status", &token).await;
    assert_eq!(quiz_status["canAttempt"], json!(false));
    assert!(quiz_status["completedAttempt"].is_object());
    assert!(quiz_status["nextRetakeAt"].is_string());
}

#[tokio::test]
async fn reattempt_with_wrong_password_is_forbidden_and_changes_nothing() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    post_json(&client, &address, "/api/quiz/finish", &token, None).await;

    let (status, body) = post_json(
        &client,
        &address,
        "/api/quiz/reattempt",
        &token,
        Some(json!({ "password": "wrong", "reason": "let me in" })),
    )
    .await;
    assert_eq!(status, 403);
    assert!(body["message"].as_str().unwrap().contains("password"));

    // Still locked.
    let (status, _) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn reattempt_with_correct_password_unlocks_immediately() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    post_json(&client, &address, "/api/quiz/finish", &token, None).await;

    let (status, body) = post_json(
        &client,
        &address,
        "/api/quiz/reattempt",
        &token,
        Some(json!({ "password": TEST_REATTEMPT_PASSWORD })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));

    let (status, fresh) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    assert_eq!(status, 201);
    assert!(fresh["attemptId"].is_string());
}

#[tokio::test]
async fn restart_deletes_the_attempt_without_a_password() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = token_for("user-1", "Ada Lovelace");

    post_json(&client, &address, "/api/quiz/start", &token, None).await;
    post_json(&client, &address, "/api/quiz/finish", &token, None).await;

    let (status, body) = post_json(&client, &address, "/api/quiz/restart", &token, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));

    // The row is gone, so starting works again right away.
    let (status, _) = post_json(&client, &address, "/api/quiz/start", &token, None).await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn leaderboard_ranks_by_score() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let low = token_for("user-low", "Lo Scorer");
    post_json(&client, &address, "/api/quiz/start", &low, None).await;
    post_json(
        &client,
        &address,
        "/api/quiz/answer",
        &low,
        Some(json!({ "questionId": "q1", "answer": "Float" })),
    )
    .await;
    post_json(&client, &address, "/api/quiz/finish", &low, None).await;

    let high = token_for("user-high", "Hi Scorer");
    post_json(&client, &address, "/api/quiz/start", &high, None).await;
    answer_all_correct(&client, &address, &high).await;
    post_json(&client, &address, "/api/quiz/finish", &high, None).await;

    let response = client
        .get(format!("{}/api/leaderboard", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let entries: Value = response.json().await.unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0]["rank"], json!(1));
    assert_eq!(entries[0]["username"], json!("Hi Scorer"));
    assert_eq!(entries[0]["bestScore"], json!(100));
    assert_eq!(entries[0]["accuracy"], json!(100));
    assert_eq!(entries[0]["attempts"], json!(1));

    assert_eq!(entries[1]["rank"], json!(2));
    assert_eq!(entries[1]["username"], json!("Lo Scorer"));
    assert_eq!(entries[1]["bestScore"], json!(10));

    // Time is serialized as "XmYs".
    let time = entries[0]["timeTaken"].as_str().unwrap();
    assert!(time.contains('m') && time.ends_with('s'));
}
