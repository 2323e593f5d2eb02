//! Authentication route handlers for login, registration, and logout.

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tera::Context;

use crate::api::auth::SESSION_COOKIE;
use crate::api::AppState;
use crate::db::unix_now;
use crate::error::{Result, ServerError};
use crate::forms::{FieldErrors, RegisterInput};
use super::utils::{check_csrf, get_current_user, render_template, render_with_status};

/// Login form data
#[derive(serde::Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data
#[derive(serde::Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

/// Logout form data
#[derive(serde::Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// Notices passed to the login page
#[derive(serde::Deserialize, Default)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Values echoed back into the registration form
#[derive(serde::Serialize, Default)]
struct RegisterOld {
    username: String,
    email: String,
}

/// Login page (GET)
pub async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    let mut context = Context::new();
    if let Some(error) = &query.error {
        context.insert("error", error);
    }
    if let Some(message) = &query.message {
        context.insert("message", message);
    }
    context.insert("username", "");
    render_template("login.html", &context)
}

/// Login submit (POST)
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(render_login_error(username, "Please enter your username and password."));
    }

    match state.auth.authenticate(username, &form.password).await {
        Ok(session) => {
            let max_age = (session.expires_at - unix_now()).max(0);
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
                SESSION_COOKIE, session.token, max_age
            );
            tracing::info!("User '{}' signed in", session.user.username);
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/questions")).into_response())
        }
        Err(ServerError::AuthFailed) => {
            tracing::debug!("Failed sign-in for '{}'", username);
            Ok(render_login_error(username, "Invalid username or password."))
        }
        Err(e) => Err(e),
    }
}

fn render_login_error(username: &str, error: &str) -> Response {
    let mut context = Context::new();
    context.insert("error", error);
    context.insert("username", username);
    render_with_status(StatusCode::UNPROCESSABLE_ENTITY, "login.html", &context)
}

/// Registration page (GET)
pub async fn register_page() -> Response {
    render_register_form(StatusCode::OK, &RegisterOld::default(), &FieldErrors::new())
}

/// Registration submit (POST)
pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let input = RegisterInput::new(
        &form.username,
        &form.email,
        &form.password,
        &form.password_confirmation,
    );
    let old = RegisterOld {
        username: input.username.clone(),
        email: input.email.clone(),
    };

    if let Err(errors) = input.check() {
        return Ok(render_register_form(StatusCode::UNPROCESSABLE_ENTITY, &old, &errors));
    }

    match state.auth.register(&input).await {
        Ok(_) => {
            Ok(Redirect::to("/login?message=Account+created.+Please+sign+in.").into_response())
        }
        Err(ServerError::Conflict(message)) => {
            let field = if message.contains("email") { "email" } else { "username" };
            let mut errors = FieldErrors::new();
            errors.insert(field.to_string(), format!("{}.", message));
            Ok(render_register_form(StatusCode::UNPROCESSABLE_ENTITY, &old, &errors))
        }
        Err(e) => Err(e),
    }
}

fn render_register_form(status: StatusCode, old: &RegisterOld, errors: &FieldErrors) -> Response {
    let mut context = Context::new();
    context.insert("old", old);
    context.insert("errors", errors);
    render_with_status(status, "register.html", &context)
}

/// Logout (POST)
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LogoutForm>,
) -> Result<Response> {
    if let Some(signed_in) = get_current_user(&state, &headers).await {
        check_csrf(&form.csrf_token, &signed_in)?;
        state.auth.logout(&signed_in.token).await?;
        tracing::info!("User '{}' signed out", signed_in.user.username);
    }

    let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/questions")).into_response())
}
