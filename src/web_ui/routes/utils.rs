//! Shared utilities and helper functions for web UI.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use tera::Context;

use crate::api::auth::{csrf_token_for, verify_csrf_token, SESSION_COOKIE};
use crate::api::AppState;
use crate::db::entities::user;
use crate::error::{Result, ServerError};
use crate::web_ui::templates;

/// The signed-in user and the session token that identified them
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub user: user::Model,
    pub token: String,
}

/// Helper to render a template
pub fn render_template(name: &str, context: &Context) -> Response {
    render_with_status(StatusCode::OK, name, context)
}

/// Render a template with a non-200 status, e.g. 422 for a rejected form
pub fn render_with_status(status: StatusCode, name: &str, context: &Context) -> Response {
    match templates::render(name, context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => ServerError::Template(e).into_response(),
    }
}

/// 303 redirect carrying a one-off notice in the query string
pub fn redirect_with(path: &str, key: &str, message: &str) -> Response {
    match serde_urlencoded::to_string([(key, message)]) {
        Ok(query) => Redirect::to(&format!("{}?{}", path, query)).into_response(),
        Err(_) => Redirect::to(path).into_response(),
    }
}

/// Extract the session token from the cookie header
pub fn get_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_prefix = format!("{}=", SESSION_COOKIE);
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = value.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            if let Some(token) = part.trim().strip_prefix(cookie_prefix.as_str()) {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

/// Current user from the session cookie
pub async fn get_current_user(state: &AppState, headers: &HeaderMap) -> Option<SignedIn> {
    let token = get_session_token(headers)?;
    match state.auth.user_for_token(&token).await {
        Ok(Some(user)) => Some(SignedIn { user, token }),
        Ok(None) => None,
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            None
        }
    }
}

/// Current user, or redirect to the login page
pub async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<SignedIn> {
    get_current_user(state, headers)
        .await
        .ok_or(ServerError::AuthRequired)
}

/// Reject a form whose CSRF token does not match the session
pub fn check_csrf(submitted: &str, signed_in: &SignedIn) -> Result<()> {
    if verify_csrf_token(submitted, Some(&signed_in.token)) {
        Ok(())
    } else {
        Err(ServerError::InvalidRequest(
            "Your session has expired. Please try again.".to_string(),
        ))
    }
}

/// Add current user and CSRF token to context if logged in
pub fn add_user_to_context(context: &mut Context, signed_in: Option<&SignedIn>) {
    if let Some(signed_in) = signed_in {
        context.insert("current_user", &signed_in.user.username);
        context.insert("csrf_token", &csrf_token_for(&signed_in.token));
    }
}

/// Parse a numeric route key; anything else cannot name a row
pub fn parse_id(key: &str, what: &str) -> Result<i32> {
    key.parse()
        .map_err(|_| ServerError::NotFound(what.to_string()))
}

/// First `limit` characters of `text`, with an ellipsis when cut
pub fn excerpt(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

/// Format seconds ago as human-readable string
pub fn format_time_ago(seconds: i64) -> String {
    if seconds < 0 {
        return "in the future".to_string();
    }
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} minute{} ago", minutes, if minutes == 1 { "" } else { "s" });
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" });
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{} day{} ago", days, if days == 1 { "" } else { "s" });
    }
    let months = days / 30;
    if months < 12 {
        return format!("{} month{} ago", months, if months == 1 { "" } else { "s" });
    }
    let years = months / 12;
    format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
}

/// Format a Unix timestamp as a relative time string
pub fn format_relative_time(timestamp: i64) -> String {
    format_time_ago(crate::db::unix_now() - timestamp)
}
