pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use study_core::get_algorithm;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::SqliteRepository;
use crate::services::StudyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub study: Arc<StudyService>,
}

impl AppState {
    pub fn new(study: StudyService) -> Self {
        Self {
            study: Arc::new(study),
        }
    }
}

/// Build the full router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Library routes
        .route("/api/sources", post(routes::library::create_source))
        .route("/api/topics", post(routes::library::create_topic))
        // Card routes
        .route("/api/cards", post(routes::cards::create))
        .route("/api/cards/:id", get(routes::cards::get))
        .route("/api/cards/:id/reviews", get(routes::cards::reviews))
        .route("/api/cards/:id/suspend", put(routes::cards::suspend))
        // Session routes
        .route("/api/sessions", post(routes::sessions::start))
        .route("/api/sessions/:id", get(routes::sessions::get))
        .route("/api/sessions/:id/end", post(routes::sessions::end))
        .route("/api/sessions/:id/abandon", post(routes::sessions::abandon))
        // Study routes
        .route("/api/study/queue", get(routes::study::queue))
        .route("/api/study/due-counts", get(routes::study::due_counts))
        .route("/api/study/review", post(routes::study::review))
        // Stats routes
        .route("/api/stats", get(routes::stats::get))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    tracing::info!(path = %config.database_path.display(), "Opening database...");
    let repository = SqliteRepository::open(&config.database_path)?;

    let algorithm = get_algorithm(&config.algorithm)
        .with_context(|| format!("unknown scheduling algorithm {:?}", config.algorithm))?;
    tracing::info!(algorithm = algorithm.name(), queue_limit = config.queue_limit, "Scheduler ready");

    let state = AppState::new(StudyService::new(repository, algorithm, config.queue_limit));
    let app = build_router(state);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
