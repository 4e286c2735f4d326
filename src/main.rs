// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use quizhub::config::Config;
use quizhub::engine::Engine;
use quizhub::questions::QuestionBank;
use quizhub::routes;
use quizhub::state::AppState;
use quizhub::storage::{MemStorage, SqliteStorage, Storage};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Select the storage backend once; everything downstream gets it
    // by reference through the app state.
    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            let store = SqliteStorage::connect(url)
                .await
                .expect("Failed to open and migrate the database");
            tracing::info!("Database connected...");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the volatile in-memory store");
            Arc::new(MemStorage::new())
        }
    };

    // The question bank is fixed at startup.
    let bank = Arc::new(QuestionBank::builtin());
    tracing::info!("Loaded question bank with {} questions", bank.len());

    let engine = Engine::new(storage.clone(), bank, config.retake_cooldown_hours);

    // Create AppState
    let state = AppState {
        storage,
        engine,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    // Start the server
    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}
