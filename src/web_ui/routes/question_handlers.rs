//! Question pages: the seven resourceful actions.

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tera::Context;

use crate::api::AppState;
use crate::db::entities::question;
use crate::error::{Result, ServerError};
use crate::forms::{AnswerInput, FieldErrors, QuestionInput};
use crate::questions::{authorize, AnswerPolicy, QuestionPolicy, QuestionStatus};
use super::utils::{
    add_user_to_context, check_csrf, excerpt, format_relative_time, get_current_user,
    parse_id, redirect_with, render_template, render_with_status, require_user, SignedIn,
};

/// Characters of body shown in the listing
const EXCERPT_LEN: usize = 250;

/// Question row for the listing template
#[derive(serde::Serialize)]
struct QuestionRow {
    id: i32,
    title: String,
    slug: String,
    author: String,
    created: String,
    excerpt: String,
    votes: i32,
    views: i32,
    answer_count: u64,
    status: &'static str,
    can_update: bool,
    can_delete: bool,
}

/// Question for the detail template
#[derive(serde::Serialize)]
struct QuestionView {
    id: i32,
    title: String,
    body: String,
    author: String,
    created: String,
    votes: i32,
    views: i32,
    answer_count: u64,
    status: &'static str,
    can_update: bool,
    can_delete: bool,
}

/// Answer for the detail template
#[derive(serde::Serialize)]
struct AnswerView {
    id: i32,
    body: String,
    author: String,
    created: String,
    votes: i32,
    is_best: bool,
    can_accept: bool,
    can_delete: bool,
}

/// Query params for listing and detail pages
#[derive(serde::Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub success: Option<String>,
}

/// Question create/update form; `_method` lets a POST stand in for PUT, PATCH, or DELETE
#[derive(serde::Deserialize, Default)]
pub struct QuestionForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(rename = "_method")]
    pub method: Option<String>,
}

/// Form carrying only a CSRF token
#[derive(serde::Deserialize)]
pub struct CsrfForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// List questions (GET /questions)
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let signed_in = get_current_user(&state, &headers).await;
    let page = state
        .questions
        .latest_page(query.page.unwrap_or(1), state.config.page_size)
        .await?;

    let rows: Vec<QuestionRow> = page
        .items
        .iter()
        .map(|summary| {
            let q = &summary.question;
            let user = signed_in.as_ref().map(|s| &s.user);
            QuestionRow {
                id: q.id,
                title: q.title.clone(),
                slug: q.slug.clone(),
                author: summary
                    .author
                    .as_ref()
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                created: format_relative_time(q.created_at),
                excerpt: excerpt(&q.body, EXCERPT_LEN),
                votes: q.votes,
                views: q.views,
                answer_count: summary.answer_count,
                status: summary.status().as_str(),
                can_update: user.map_or(false, |u| QuestionPolicy::update(u, q)),
                can_delete: user.map_or(false, |u| {
                    QuestionPolicy::delete(u, q, summary.answer_count)
                }),
            }
        })
        .collect();

    let mut context = Context::new();
    context.insert("questions", &rows);
    context.insert("page", &page.page);
    context.insert("num_pages", &page.num_pages);
    context.insert("has_previous", &page.has_previous());
    context.insert("has_next", &page.has_next());
    if let Some(success) = &query.success {
        context.insert("success", success);
    }
    add_user_to_context(&mut context, signed_in.as_ref());

    Ok(render_template("questions.html", &context))
}

/// Ask-question form (GET /questions/create)
pub async fn create(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response> {
    let signed_in = require_user(&state, &headers).await?;
    Ok(render_question_form(
        StatusCode::OK,
        &signed_in,
        None,
        &QuestionInput::default(),
        &FieldErrors::new(),
    ))
}

/// Create a question (POST /questions)
pub async fn store(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<QuestionForm>,
) -> Result<Response> {
    let signed_in = require_user(&state, &headers).await?;
    check_csrf(&form.csrf_token, &signed_in)?;

    let input = QuestionInput::new(&form.title, &form.body);
    if let Err(errors) = input.check() {
        return Ok(render_question_form(
            StatusCode::UNPROCESSABLE_ENTITY,
            &signed_in,
            None,
            &input,
            &errors,
        ));
    }

    state.questions.create(&signed_in.user, &input).await?;

    Ok(redirect_with("/questions", "success", "Your question has been submitted"))
}

/// Show a question by slug (GET /questions/:slug)
pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response> {
    let signed_in = get_current_user(&state, &headers).await;

    let mut question = state
        .questions
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| ServerError::NotFound("Question".to_string()))?;

    state.questions.record_view(&question).await?;
    question.views += 1;

    render_question_page(
        &state,
        signed_in.as_ref(),
        question,
        StatusCode::OK,
        &AnswerInput::default(),
        &FieldErrors::new(),
        query.success.as_deref(),
    )
    .await
}

/// Edit form (GET /questions/:id/edit)
pub async fn edit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Response> {
    let signed_in = require_user(&state, &headers).await?;
    let question = find_question(&state, &key).await?;
    authorize(
        QuestionPolicy::update(&signed_in.user, &question),
        &signed_in.user,
        "update question",
    )?;

    let input = QuestionInput {
        title: question.title.clone(),
        body: question.body.clone(),
    };
    Ok(render_question_form(
        StatusCode::OK,
        &signed_in,
        Some(question.id),
        &input,
        &FieldErrors::new(),
    ))
}

/// Update a question (PUT/PATCH /questions/:id)
pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<QuestionForm>,
) -> Result<Response> {
    update_question(&state, &headers, &key, &form).await
}

/// Delete a question (DELETE /questions/:id)
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<CsrfForm>,
) -> Result<Response> {
    destroy_question(&state, &headers, &key, &form.csrf_token).await
}

/// POST /questions/:id with a `_method` override from an HTML form
pub async fn method_override(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<QuestionForm>,
) -> Result<Response> {
    let method = form.method.as_deref().unwrap_or("").to_ascii_uppercase();
    match method.as_str() {
        "PUT" | "PATCH" => update_question(&state, &headers, &key, &form).await,
        "DELETE" => destroy_question(&state, &headers, &key, &form.csrf_token).await,
        _ => Err(ServerError::InvalidRequest(format!(
            "unsupported form method '{}'",
            method
        ))),
    }
}

async fn update_question(
    state: &AppState,
    headers: &HeaderMap,
    key: &str,
    form: &QuestionForm,
) -> Result<Response> {
    let signed_in = require_user(state, headers).await?;
    check_csrf(&form.csrf_token, &signed_in)?;

    let question = find_question(state, key).await?;
    authorize(
        QuestionPolicy::update(&signed_in.user, &question),
        &signed_in.user,
        "update question",
    )?;

    let input = QuestionInput::new(&form.title, &form.body);
    if let Err(errors) = input.check() {
        return Ok(render_question_form(
            StatusCode::UNPROCESSABLE_ENTITY,
            &signed_in,
            Some(question.id),
            &input,
            &errors,
        ));
    }

    state.questions.update(question, &input).await?;

    Ok(redirect_with("/questions", "success", "Your question has been updated"))
}

async fn destroy_question(
    state: &AppState,
    headers: &HeaderMap,
    key: &str,
    csrf_token: &str,
) -> Result<Response> {
    let signed_in = require_user(state, headers).await?;
    check_csrf(csrf_token, &signed_in)?;

    let question = find_question(state, key).await?;
    let answer_count = state.questions.answer_count(question.id).await?;
    authorize(
        QuestionPolicy::delete(&signed_in.user, &question, answer_count),
        &signed_in.user,
        "delete question",
    )?;

    state.questions.delete(&question).await?;

    Ok(redirect_with("/questions", "success", "Your question has been deleted"))
}

/// Look up a question by the numeric id in the path
async fn find_question(state: &AppState, key: &str) -> Result<question::Model> {
    let id = parse_id(key, "Question")?;
    state
        .questions
        .find(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Question".to_string()))
}

/// Create form when `question_id` is `None`, edit form otherwise
fn render_question_form(
    status: StatusCode,
    signed_in: &SignedIn,
    question_id: Option<i32>,
    old: &QuestionInput,
    errors: &FieldErrors,
) -> Response {
    let mut context = Context::new();
    context.insert("old", old);
    context.insert("errors", errors);
    add_user_to_context(&mut context, Some(signed_in));

    match question_id {
        Some(id) => {
            context.insert("question_id", &id);
            context.insert("button_text", "Update Question");
            render_with_status(status, "edit_question.html", &context)
        }
        None => {
            context.insert("button_text", "Ask this question");
            render_with_status(status, "new_question.html", &context)
        }
    }
}

/// Detail page with answers; also used to redisplay a rejected answer
pub(super) async fn render_question_page(
    state: &AppState,
    signed_in: Option<&SignedIn>,
    question: question::Model,
    status: StatusCode,
    old_answer: &AnswerInput,
    errors: &FieldErrors,
    success: Option<&str>,
) -> Result<Response> {
    let author = state.questions.author_of(&question).await?;
    let answers = state.questions.answers_for(question.id).await?;
    let answer_count = answers.len() as u64;
    let user = signed_in.map(|s| &s.user);

    let answer_views: Vec<AnswerView> = answers
        .into_iter()
        .map(|(answer, answer_author)| AnswerView {
            is_best: question.best_answer_id == Some(answer.id),
            can_accept: question.best_answer_id != Some(answer.id)
                && user.map_or(false, |u| AnswerPolicy::accept(u, &question)),
            can_delete: user.map_or(false, |u| AnswerPolicy::delete(u, &answer)),
            id: answer.id,
            author: answer_author
                .map(|u| u.username)
                .unwrap_or_else(|| "unknown".to_string()),
            created: format_relative_time(answer.created_at),
            votes: answer.votes,
            body: answer.body,
        })
        .collect();

    let view = QuestionView {
        id: question.id,
        title: question.title.clone(),
        body: question.body.clone(),
        author: author
            .map(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string()),
        created: format_relative_time(question.created_at),
        votes: question.votes,
        views: question.views,
        answer_count,
        status: QuestionStatus::derive(answer_count, question.best_answer_id).as_str(),
        can_update: user.map_or(false, |u| QuestionPolicy::update(u, &question)),
        can_delete: user.map_or(false, |u| QuestionPolicy::delete(u, &question, answer_count)),
    };

    let mut context = Context::new();
    context.insert("question", &view);
    context.insert("answers", &answer_views);
    context.insert("old", old_answer);
    context.insert("errors", errors);
    if let Some(success) = success {
        context.insert("success", success);
    }
    add_user_to_context(&mut context, signed_in);

    Ok(render_with_status(status, "question.html", &context))
}
