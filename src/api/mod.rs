pub mod auth;
pub mod handlers;

use std::sync::Arc;
use axum::{routing::get, Router};

pub use handlers::{health, list_questions, show_question, AppState};

/// Read-only JSON API and health probe
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/questions", get(list_questions))
        .route("/api/questions/:slug", get(show_question))
        .route("/health", get(health))
}
