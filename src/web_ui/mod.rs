//! Web UI Module
//!
//! Server-rendered pages for browsing, asking, and answering questions.

mod routes;
mod templates;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use tera::Context;

use crate::api::AppState;

/// Create the web UI router.
/// Mount this with `.merge(web_ui::router())` in main.rs
pub fn router() -> Router<Arc<AppState>> {
    routes::create_router()
}

/// Render the error page with the given status
pub fn render_error_page(status: StatusCode, message: &str) -> Response {
    let mut context = Context::new();
    context.insert("status", &status.as_u16());
    context.insert("message", message);

    match templates::render("error.html", &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}
