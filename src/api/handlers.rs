use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::auth::AuthManager;
use crate::config::Config;
use crate::db::entities::{answer, question, user};
use crate::error::{Result, ServerError};
use crate::questions::{QuestionStatus, QuestionStore, QuestionSummary};

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub auth: AuthManager,
    pub questions: QuestionStore,
    pub config: Config,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let session_ttl = Duration::from_secs(config.session_ttl_hours * 60 * 60);
        Self {
            auth: AuthManager::new(db.clone(), session_ttl),
            questions: QuestionStore::new(db.clone()),
            db,
            config,
        }
    }
}

/// Query params for paged listings
#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Serialize)]
pub struct QuestionJson {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub author: Option<String>,
    pub views: i32,
    pub votes: i32,
    pub answer_count: u64,
    pub status: QuestionStatus,
    pub best_answer_id: Option<i32>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl QuestionJson {
    fn new(question: question::Model, author: Option<user::Model>, answer_count: u64) -> Self {
        Self {
            status: QuestionStatus::derive(answer_count, question.best_answer_id),
            id: question.id,
            title: question.title,
            slug: question.slug,
            body: question.body,
            author: author.map(|u| u.username),
            views: question.views,
            votes: question.votes,
            answer_count,
            best_answer_id: question.best_answer_id,
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }
}

impl From<QuestionSummary> for QuestionJson {
    fn from(summary: QuestionSummary) -> Self {
        Self::new(summary.question, summary.author, summary.answer_count)
    }
}

#[derive(Serialize)]
pub struct AnswerJson {
    pub id: i32,
    pub body: String,
    pub author: Option<String>,
    pub votes: i32,
    pub is_best: bool,
    pub created_at: i64,
}

#[derive(Serialize)]
pub struct QuestionPageJson {
    pub questions: Vec<QuestionJson>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub num_pages: u64,
}

#[derive(Serialize)]
pub struct QuestionDetailJson {
    #[serde(flatten)]
    pub question: QuestionJson,
    pub answers: Vec<AnswerJson>,
}

/// GET /api/questions
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<QuestionPageJson>> {
    let page = state
        .questions
        .latest_page(query.page.unwrap_or(1), state.config.page_size)
        .await?;

    Ok(Json(QuestionPageJson {
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        num_pages: page.num_pages,
        questions: page.items.into_iter().map(QuestionJson::from).collect(),
    }))
}

/// GET /api/questions/:slug
pub async fn show_question(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<QuestionDetailJson>> {
    let question = state
        .questions
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| ServerError::NotFound("Question".to_string()))?;

    let author = state.questions.author_of(&question).await?;
    let answers = state.questions.answers_for(question.id).await?;
    let best = question.best_answer_id;

    let answers: Vec<AnswerJson> = answers
        .into_iter()
        .map(|(a, author): (answer::Model, Option<user::Model>)| AnswerJson {
            is_best: best == Some(a.id),
            id: a.id,
            body: a.body,
            author: author.map(|u| u.username),
            votes: a.votes,
            created_at: a.created_at,
        })
        .collect();

    Ok(Json(QuestionDetailJson {
        question: QuestionJson::new(question, author, answers.len() as u64),
        answers,
    }))
}

/// Health check; reports 503 when the database is unreachable
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(serde_json::json!({ "status": "ok", "database": "ok" })).into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "error", "database": "unreachable" })),
            )
                .into_response()
        }
    }
}
