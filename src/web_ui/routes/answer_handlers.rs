//! Answer posting, acceptance, and removal.

use axum::{
    extract::{Form, Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::db::entities::{answer, question};
use crate::error::{Result, ServerError};
use crate::forms::AnswerInput;
use crate::questions::{authorize, AnswerPolicy};
use super::question_handlers::render_question_page;
use super::utils::{check_csrf, parse_id, redirect_with, require_user};

/// New answer form data
#[derive(serde::Deserialize)]
pub struct AnswerForm {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub csrf_token: String,
}

/// Accept/delete form data; `_method=DELETE` turns a POST into a delete
#[derive(serde::Deserialize)]
pub struct AnswerActionForm {
    #[serde(default)]
    pub csrf_token: String,
    #[serde(rename = "_method")]
    pub method: Option<String>,
}

/// Post an answer (POST /questions/:id/answers)
pub async fn store(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<AnswerForm>,
) -> Result<Response> {
    let signed_in = require_user(&state, &headers).await?;
    check_csrf(&form.csrf_token, &signed_in)?;

    let question = find_question(&state, parse_id(&key, "Question")?).await?;

    let input = AnswerInput::new(&form.body);
    if let Err(errors) = input.check() {
        return render_question_page(
            &state,
            Some(&signed_in),
            question,
            StatusCode::UNPROCESSABLE_ENTITY,
            &input,
            &errors,
            None,
        )
        .await;
    }

    state.questions.add_answer(&question, &signed_in.user, &input).await?;

    Ok(redirect_with(
        &format!("/questions/{}", question.slug),
        "success",
        "Your answer has been posted",
    ))
}

/// Mark an answer as the best one (POST /answers/:id/accept)
pub async fn accept(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<AnswerActionForm>,
) -> Result<Response> {
    let signed_in = require_user(&state, &headers).await?;
    check_csrf(&form.csrf_token, &signed_in)?;

    let answer = find_answer(&state, &key).await?;
    let question = find_question(&state, answer.question_id).await?;
    authorize(AnswerPolicy::accept(&signed_in.user, &question), &signed_in.user, "accept answer")?;

    let question = state.questions.accept_answer(question, &answer).await?;

    Ok(redirect_with(
        &format!("/questions/{}", question.slug),
        "success",
        "The answer has been marked as best",
    ))
}

/// Delete an answer (DELETE /answers/:id)
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<AnswerActionForm>,
) -> Result<Response> {
    destroy_answer(&state, &headers, &key, &form.csrf_token).await
}

/// POST /answers/:id with a `_method` override from an HTML form
pub async fn method_override(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<AnswerActionForm>,
) -> Result<Response> {
    match form.method.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("DELETE") => destroy_answer(&state, &headers, &key, &form.csrf_token).await,
        other => Err(ServerError::InvalidRequest(format!(
            "unsupported form method '{}'",
            other.unwrap_or("")
        ))),
    }
}

async fn destroy_answer(
    state: &AppState,
    headers: &HeaderMap,
    key: &str,
    csrf_token: &str,
) -> Result<Response> {
    let signed_in = require_user(state, headers).await?;
    check_csrf(csrf_token, &signed_in)?;

    let answer = find_answer(state, key).await?;
    authorize(AnswerPolicy::delete(&signed_in.user, &answer), &signed_in.user, "delete answer")?;

    let question = find_question(state, answer.question_id).await?;
    state.questions.delete_answer(&answer).await?;

    Ok(redirect_with(
        &format!("/questions/{}", question.slug),
        "success",
        "Your answer has been deleted",
    ))
}

async fn find_answer(state: &AppState, key: &str) -> Result<answer::Model> {
    let id = parse_id(key, "Answer")?;
    state
        .questions
        .find_answer(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Answer".to_string()))
}

async fn find_question(state: &AppState, id: i32) -> Result<question::Model> {
    state
        .questions
        .find(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Question".to_string()))
}
