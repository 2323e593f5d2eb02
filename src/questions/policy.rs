//! Ownership rules for questions and answers.
//!
//! These predicates guard the mutating handlers and also decide which
//! edit/delete/accept controls the templates show.

use crate::db::entities::{answer, question, user};
use crate::error::{Result, ServerError};

pub struct QuestionPolicy;

impl QuestionPolicy {
    pub fn update(user: &user::Model, question: &question::Model) -> bool {
        user.id == question.user_id
    }

    /// Owners may delete a question only while nobody has answered it.
    pub fn delete(user: &user::Model, question: &question::Model, answer_count: u64) -> bool {
        user.id == question.user_id && answer_count == 0
    }
}

pub struct AnswerPolicy;

impl AnswerPolicy {
    /// Only the asker picks the best answer.
    pub fn accept(user: &user::Model, question: &question::Model) -> bool {
        user.id == question.user_id
    }

    pub fn delete(user: &user::Model, answer: &answer::Model) -> bool {
        user.id == answer.user_id
    }
}

/// Turn a policy decision into a 403.
pub fn authorize(allowed: bool, user: &user::Model, action: &str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        tracing::warn!("User '{}' denied: {}", user.username, action);
        Err(ServerError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32) -> user::Model {
        user::Model {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn question(owner: i32) -> question::Model {
        question::Model {
            id: 1,
            user_id: owner,
            title: "What is a trait object?".to_string(),
            slug: "what-is-a-trait-object".to_string(),
            body: "And when should I use one?".to_string(),
            views: 0,
            votes: 0,
            best_answer_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_update_requires_owner() {
        let q = question(1);
        assert!(QuestionPolicy::update(&user(1), &q));
        assert!(!QuestionPolicy::update(&user(2), &q));
    }

    #[test]
    fn test_delete_requires_owner_and_no_answers() {
        let q = question(1);
        assert!(QuestionPolicy::delete(&user(1), &q, 0));
        assert!(!QuestionPolicy::delete(&user(2), &q, 0));
        assert!(!QuestionPolicy::delete(&user(1), &q, 1));
        assert!(!QuestionPolicy::delete(&user(2), &q, 3));
    }

    #[test]
    fn test_answer_policies() {
        let q = question(1);
        let a = answer::Model {
            id: 9,
            question_id: q.id,
            user_id: 2,
            body: "Use dyn Trait behind a pointer.".to_string(),
            votes: 0,
            created_at: 0,
            updated_at: 0,
        };

        assert!(AnswerPolicy::accept(&user(1), &q));
        assert!(!AnswerPolicy::accept(&user(2), &q));
        assert!(AnswerPolicy::delete(&user(2), &a));
        assert!(!AnswerPolicy::delete(&user(1), &a));
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(true, &user(1), "update question").is_ok());
        assert!(matches!(
            authorize(false, &user(1), "delete question"),
            Err(ServerError::PermissionDenied)
        ));
    }
}
