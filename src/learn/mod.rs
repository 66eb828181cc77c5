//! Learn mode
//!
//! Reading notes, working through flashcards and taking the quiz for one
//! capsule. Known cards and the best quiz score are written back through the
//! capsule store as they change.

mod quiz;
mod session;

pub use quiz::{percentage, AnswerFeedback, QuizResult, QuizRun};
pub use session::{FlashStatus, LearnSession};
