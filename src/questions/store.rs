//! Question and answer persistence.

use std::collections::HashMap;
use std::future::Future;

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use super::slug::{self, slugify};
use super::status::QuestionStatus;
use crate::db::entities::{answer, question, user};
use crate::db::unix_now;
use crate::error::{Result, ServerError};
use crate::forms::{AnswerInput, QuestionInput};

/// Times a write is retried after losing a slug to a concurrent writer
const SLUG_RETRIES: u32 = 5;

/// A question in a listing, with its author and answer count
#[derive(Clone, Debug)]
pub struct QuestionSummary {
    pub question: question::Model,
    pub author: Option<user::Model>,
    pub answer_count: u64,
}

impl QuestionSummary {
    pub fn status(&self) -> QuestionStatus {
        QuestionStatus::derive(self.answer_count, self.question.best_answer_id)
    }
}

/// One page of the most recent questions
#[derive(Clone, Debug)]
pub struct QuestionPage {
    pub items: Vec<QuestionSummary>,
    /// 1-based
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub num_pages: u64,
}

impl QuestionPage {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }
}

/// Database-backed store for questions and their answers
#[derive(Clone)]
pub struct QuestionStore {
    db: DatabaseConnection,
}

impl QuestionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Most recent questions first, authors joined in the same query.
    pub async fn latest_page(&self, page: u64, per_page: u64) -> Result<QuestionPage> {
        let page = page.max(1);
        let per_page = per_page.max(1);

        let paginator = question::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(question::Column::CreatedAt)
            .order_by_desc(question::Column::Id)
            .paginate(&self.db, per_page);

        let totals = paginator.num_items_and_pages().await?;
        // Past the end there is nothing to fetch, and the offset could overflow
        let rows = if page > totals.number_of_pages {
            Vec::new()
        } else {
            paginator.fetch_page(page - 1).await?
        };

        let ids: Vec<i32> = rows.iter().map(|(q, _)| q.id).collect();
        let counts = self.answer_counts(&ids).await?;

        let items = rows
            .into_iter()
            .map(|(question, author)| {
                let answer_count = counts.get(&question.id).copied().unwrap_or(0);
                QuestionSummary {
                    question,
                    author,
                    answer_count,
                }
            })
            .collect();

        Ok(QuestionPage {
            items,
            page,
            per_page,
            total: totals.number_of_items,
            num_pages: totals.number_of_pages,
        })
    }

    /// Answer counts for many questions in one grouped query
    async fn answer_counts(&self, question_ids: &[i32]) -> Result<HashMap<i32, u64>> {
        if question_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, i64)> = answer::Entity::find()
            .select_only()
            .column(answer::Column::QuestionId)
            .column_as(Expr::col(answer::Column::Id).count(), "answer_count")
            .filter(answer::Column::QuestionId.is_in(question_ids.iter().copied()))
            .group_by(answer::Column::QuestionId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }

    pub async fn find(&self, id: i32) -> Result<Option<question::Model>> {
        Ok(question::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<question::Model>> {
        Ok(question::Entity::find()
            .filter(question::Column::Slug.eq(slug))
            .one(&self.db)
            .await?)
    }

    pub async fn author_of(&self, question: &question::Model) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(question.user_id).one(&self.db).await?)
    }

    pub async fn create(
        &self,
        author: &user::Model,
        input: &QuestionInput,
    ) -> Result<question::Model> {
        let now = unix_now();
        let db = &self.db;

        let created = self
            .with_unique_slug(&input.title, None, |slug| {
                let new_question = question::ActiveModel {
                    user_id: Set(author.id),
                    title: Set(input.title.clone()),
                    slug: Set(slug),
                    body: Set(input.body.clone()),
                    views: Set(0),
                    votes: Set(0),
                    best_answer_id: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                async move { new_question.insert(db).await }
            })
            .await?;
        tracing::info!("Question {} created as '{}'", created.id, created.slug);
        Ok(created)
    }

    /// Save a new title and body; the slug follows the title.
    pub async fn update(
        &self,
        question: question::Model,
        input: &QuestionInput,
    ) -> Result<question::Model> {
        let now = unix_now();
        let db = &self.db;
        let id = question.id;

        let updated = self
            .with_unique_slug(&input.title, Some(id), |slug| {
                let mut active: question::ActiveModel = question.clone().into();
                active.title = Set(input.title.clone());
                active.slug = Set(slug);
                active.body = Set(input.body.clone());
                active.updated_at = Set(now);
                async move { active.update(db).await }
            })
            .await?;
        tracing::info!("Question {} updated", updated.id);
        Ok(updated)
    }

    pub async fn delete(&self, question: &question::Model) -> Result<()> {
        let res = question::Entity::delete_by_id(question.id)
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServerError::NotFound("Question".to_string()));
        }
        tracing::info!("Question {} deleted", question.id);
        Ok(())
    }

    pub async fn record_view(&self, question: &question::Model) -> Result<()> {
        question::Entity::update_many()
            .col_expr(
                question::Column::Views,
                Expr::col(question::Column::Views).add(1),
            )
            .filter(question::Column::Id.eq(question.id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn answer_count(&self, question_id: i32) -> Result<u64> {
        Ok(answer::Entity::find()
            .filter(answer::Column::QuestionId.eq(question_id))
            .count(&self.db)
            .await?)
    }

    /// Answers oldest first, each with its author
    pub async fn answers_for(
        &self,
        question_id: i32,
    ) -> Result<Vec<(answer::Model, Option<user::Model>)>> {
        Ok(answer::Entity::find()
            .find_also_related(user::Entity)
            .filter(answer::Column::QuestionId.eq(question_id))
            .order_by_asc(answer::Column::CreatedAt)
            .order_by_asc(answer::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn find_answer(&self, id: i32) -> Result<Option<answer::Model>> {
        Ok(answer::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn add_answer(
        &self,
        question: &question::Model,
        author: &user::Model,
        input: &AnswerInput,
    ) -> Result<answer::Model> {
        let now = unix_now();

        let new_answer = answer::ActiveModel {
            question_id: Set(question.id),
            user_id: Set(author.id),
            body: Set(input.body.clone()),
            votes: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = new_answer.insert(&self.db).await?;

        question::Entity::update_many()
            .col_expr(question::Column::UpdatedAt, Expr::value(now))
            .filter(question::Column::Id.eq(question.id))
            .exec(&self.db)
            .await?;

        Ok(created)
    }

    pub async fn accept_answer(
        &self,
        question: question::Model,
        answer: &answer::Model,
    ) -> Result<question::Model> {
        if answer.question_id != question.id {
            return Err(ServerError::InvalidRequest(
                "answer belongs to another question".to_string(),
            ));
        }

        let mut active: question::ActiveModel = question.into();
        active.best_answer_id = Set(Some(answer.id));
        active.updated_at = Set(unix_now());
        Ok(active.update(&self.db).await?)
    }

    /// Delete an answer, clearing it as best answer in the same transaction.
    pub async fn delete_answer(&self, answer: &answer::Model) -> Result<()> {
        let txn = self.db.begin().await?;

        answer::Entity::delete_by_id(answer.id).exec(&txn).await?;

        question::Entity::update_many()
            .col_expr(question::Column::BestAnswerId, Expr::value(Option::<i32>::None))
            .filter(question::Column::Id.eq(answer.question_id))
            .filter(question::Column::BestAnswerId.eq(answer.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Run `save` with the first free slug for `title`.
    ///
    /// Another writer can claim that slug between the lookup and the write;
    /// the unique index then rejects `save` and the next free slug is tried.
    async fn with_unique_slug<T, F, Fut>(
        &self,
        title: &str,
        exclude: Option<i32>,
        mut save: F,
    ) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, DbErr>>,
    {
        let mut retries = 0;
        loop {
            let slug = self.unique_slug(title, exclude).await?;
            match save(slug.clone()).await {
                Ok(saved) => return Ok(saved),
                Err(e) if is_unique_violation(&e) && retries < SLUG_RETRIES => {
                    tracing::debug!("Slug '{}' was taken concurrently, retrying", slug);
                    retries += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// First free slug for `title`, ignoring the question being renamed.
    async fn unique_slug(&self, title: &str, exclude: Option<i32>) -> Result<String> {
        let base = slugify(title);
        let mut attempt = 1;

        loop {
            let candidate = slug::candidate(&base, attempt);
            attempt += 1;
            if slug::is_reserved(&candidate) {
                continue;
            }

            let mut query = question::Entity::find()
                .filter(question::Column::Slug.eq(candidate.as_str()));
            if let Some(id) = exclude {
                query = query.filter(question::Column::Id.ne(id));
            }
            if query.count(&self.db).await? == 0 {
                return Ok(candidate);
            }
        }
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
