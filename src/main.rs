mod api;
mod config;
mod db;
mod error;
mod forms;
mod questions;
mod web_ui;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::Config;

/// How often expired sessions are swept from the database
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qa_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {:?}", path);
    }

    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let db_url = config.database_url();
    let db = db::init_database(&db_url).await?;
    tracing::info!("Database initialized");

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(db, config));

    spawn_session_cleanup(state.clone());

    let app = app(state);

    tracing::info!("Q&A server starting on http://{}", bind_addr);
    tracing::info!("  GET /questions         - Browse questions");
    tracing::info!("  GET /api/questions     - JSON listing");
    tracing::info!("  GET /health            - Health check");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full application router
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(web_ui::router())
        .merge(api::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Periodically drop expired sessions
fn spawn_session_cleanup(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match state.auth.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Removed {} expired sessions", n),
                Err(e) => tracing::warn!("Session cleanup failed: {}", e),
            }
        }
    });
}
