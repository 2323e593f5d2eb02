//! Derived answer status of a question.

use serde::Serialize;

/// Whether a question has been answered, and whether an answer was accepted.
///
/// Never stored: it is recomputed from the answer count and `best_answer_id`
/// every time a question is displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    AnsweredAccepted,
}

impl QuestionStatus {
    pub fn derive(answer_count: u64, best_answer_id: Option<i32>) -> Self {
        if answer_count == 0 {
            return QuestionStatus::Unanswered;
        }
        match best_answer_id {
            Some(_) => QuestionStatus::AnsweredAccepted,
            None => QuestionStatus::Answered,
        }
    }

    /// Name used in templates and as the CSS class
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Unanswered => "unanswered",
            QuestionStatus::Answered => "answered",
            QuestionStatus::AnsweredAccepted => "answered-accepted",
        }
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
