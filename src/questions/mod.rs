//! Questions, their answers, and the rules around them.

pub mod policy;
pub mod slug;
pub mod status;
pub mod store;

pub use policy::{authorize, AnswerPolicy, QuestionPolicy};
pub use status::QuestionStatus;
pub use store::{QuestionStore, QuestionSummary};
